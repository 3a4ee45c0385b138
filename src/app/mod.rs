use crate::{cli, commands, exit_codes, output};
use clap::{ColorChoice, CommandFactory, FromArgMatches, error::ErrorKind as ClapErrorKind};
use pwvault::config::Settings;
use std::io::IsTerminal;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "PWVAULT_LOG";

pub(crate) struct AppContext {
    pub output_mode: output::OutputMode,
    pub settings: Settings,
}

pub fn run() -> ExitCode {
    let cli = match parse_cli() {
        Ok(cli) => cli,
        Err(code) => return code,
    };

    init_tracing();

    let output_mode = output::OutputMode {
        json: cli.json,
        quiet: cli.quiet,
    };

    let Some(command) = cli.command else {
        let mut cmd = configure_command_colors(cli::Cli::command());
        let _ = cmd.print_help();
        println!();
        return ExitCode::from(exit_codes::EXIT_USAGE);
    };

    let settings = match Settings::load(cli.dir.as_deref()) {
        Ok(settings) => settings,
        Err(error) => {
            eprintln!("Error: {error}");
            return exit_codes::exit_code_for_config_error(&error);
        }
    };
    tracing::debug!(
        vault_dir = %settings.vault_dir.display(),
        source = ?settings.vault_dir_source,
        iterations = settings.options.kdf.iterations,
        "settings resolved"
    );

    let ctx = AppContext {
        output_mode,
        settings,
    };

    commands::dispatch(command, &ctx)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    // Logs share stderr with the prompts, never stdout.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn parse_cli() -> Result<cli::Cli, ExitCode> {
    let cmd = configure_command_colors(cli::Cli::command());

    let matches = match cmd.try_get_matches() {
        Ok(matches) => matches,
        Err(err) => {
            let _ = err.print();
            if matches!(
                err.kind(),
                ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion
            ) {
                return Err(ExitCode::SUCCESS);
            }
            return Err(ExitCode::from(exit_codes::EXIT_USAGE));
        }
    };

    cli::Cli::from_arg_matches(&matches).map_err(|err| {
        let _ = err.print();
        ExitCode::from(exit_codes::EXIT_USAGE)
    })
}

fn configure_command_colors(mut cmd: clap::Command) -> clap::Command {
    let no_color = std::env::var_os("NO_COLOR").is_some();
    let stdout_is_tty = std::io::stdout().is_terminal();
    let stderr_is_tty = std::io::stderr().is_terminal();

    if no_color || !(stdout_is_tty && stderr_is_tty) {
        cmd = cmd.color(ColorChoice::Never);
    }

    cmd
}
