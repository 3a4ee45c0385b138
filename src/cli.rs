use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "pwvault",
    author,
    version,
    about = "A local, per-user encrypted password vault.",
    long_about = "A local, per-user encrypted password vault. Every account keeps its keys \
                  wrapped under the master password and one encrypted file per website."
)]
pub struct Cli {
    #[arg(long, global = true, help = "Emit JSON output.")]
    pub json: bool,

    #[arg(short, long, global = true, help = "Print bare values only.")]
    pub quiet: bool,

    #[arg(
        long,
        global = true,
        value_name = "DIR",
        help = "Vault directory (overrides PWVAULT_DIR and the config file)."
    )]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "Create a new account.")]
    Register(UserArgs),

    #[command(about = "List the websites stored for an account.")]
    List(UserArgs),

    #[command(about = "Print the password stored for a website.")]
    Get(WebsiteArgs),

    #[command(about = "Store or replace the password for a website.")]
    Add(AddArgs),

    #[command(about = "Remove the password stored for a website.")]
    Rm(WebsiteArgs),

    #[command(about = "Change an account's master password.")]
    Passwd(UserArgs),

    #[command(name = "delete-account", about = "Delete an account and every stored password.")]
    DeleteAccount(UserArgs),

    #[command(about = "Show the resolved configuration.")]
    Config,
}

#[derive(Debug, Args)]
pub struct UserArgs {
    #[arg(short, long, help = "Account name.")]
    pub user: String,
}

#[derive(Debug, Args)]
pub struct WebsiteArgs {
    #[command(flatten)]
    pub account: UserArgs,

    #[arg(help = "Website the password belongs to.")]
    pub website: String,
}

#[derive(Debug, Args)]
pub struct AddArgs {
    #[command(flatten)]
    pub target: WebsiteArgs,

    #[arg(
        long,
        help = "Password to store; prompted for when omitted (avoids shell history)."
    )]
    pub password: Option<String>,
}
