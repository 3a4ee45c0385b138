mod config;
mod vault;

use crate::app::AppContext;
use crate::cli;
use std::process::ExitCode;

pub fn dispatch(command: cli::Commands, ctx: &AppContext) -> ExitCode {
    match command {
        cli::Commands::Register(args) => vault::register(args, ctx),
        cli::Commands::List(args) => vault::list(args, ctx),
        cli::Commands::Get(args) => vault::get(args, ctx),
        cli::Commands::Add(args) => vault::add(args, ctx),
        cli::Commands::Rm(args) => vault::remove(args, ctx),
        cli::Commands::Passwd(args) => vault::passwd(args, ctx),
        cli::Commands::DeleteAccount(args) => vault::delete_account(args, ctx),
        cli::Commands::Config => config::run(ctx),
    }
}
