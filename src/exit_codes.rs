use pwvault::{config, vault};
use std::process::ExitCode;

pub const EXIT_USAGE: u8 = 64;
pub const EXIT_IO: u8 = 2;
pub const EXIT_SOFTWARE: u8 = 1;

pub fn exit_code_for_config_error(error: &config::ConfigError) -> ExitCode {
    use config::ConfigError::*;

    match error {
        ConfigDirUnavailable | VaultDirUnavailable | Io(_) => ExitCode::from(EXIT_IO),
        UnknownKdfAlgorithm(_) | InvalidIterations(_) => ExitCode::from(EXIT_USAGE),
        Parse(_) => ExitCode::from(EXIT_SOFTWARE),
    }
}

pub fn exit_code_for_prompt_error(error: &vault::PromptError) -> ExitCode {
    use vault::PromptError::*;

    match error {
        Io(_) => ExitCode::from(EXIT_IO),
        Empty | Mismatch => ExitCode::from(EXIT_USAGE),
    }
}

pub fn exit_code_for_vault_error(error: &vault::VaultError) -> ExitCode {
    use vault::VaultError::*;

    match error {
        InvalidUser(_)
        | InvalidWebsite
        | PasswordTooShort { .. }
        | AccountAlreadyExists(_)
        | AccountNotFound(_) => ExitCode::from(EXIT_USAGE),
        Storage { .. } | DeleteFailed { .. } => ExitCode::from(EXIT_IO),
        IntegrityViolation { .. }
        | EntryCorrupted { .. }
        | EntryMisplaced { .. }
        | MalformedFile { .. }
        | Crypto(_) => ExitCode::from(EXIT_SOFTWARE),
    }
}
