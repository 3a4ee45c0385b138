use crate::app::AppContext;
use crate::{cli, exit_codes, output};
use pwvault::vault::{self, AccountPaths, Removal, Vault, VaultError};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use std::process::ExitCode;

fn vault_failure(error: &VaultError) -> ExitCode {
    output::print_error(error);
    if let VaultError::DeleteFailed { failures } = error {
        for failure in failures {
            eprintln!("  {}: {}", failure.path.display(), failure.source);
        }
    }
    exit_codes::exit_code_for_vault_error(error)
}

fn prompt_failure(error: &vault::PromptError) -> ExitCode {
    output::print_error(error);
    exit_codes::exit_code_for_prompt_error(error)
}

fn resolve_account(user: &str, ctx: &AppContext) -> Result<AccountPaths, ExitCode> {
    vault::account(&ctx.settings.vault_dir, user).map_err(|error| vault_failure(&error))
}

/// Prompt for the master password and open the account.
fn open_vault(user: &str, ctx: &AppContext) -> Result<(Vault, SecretString), ExitCode> {
    let paths = resolve_account(user, ctx)?;
    let master_password = vault::prompt_master_password().map_err(|error| prompt_failure(&error))?;
    let vault = Vault::open(paths, &master_password).map_err(|error| vault_failure(&error))?;
    Ok((vault, master_password))
}

pub fn register(args: cli::UserArgs, ctx: &AppContext) -> ExitCode {
    let paths = match resolve_account(&args.user, ctx) {
        Ok(paths) => paths,
        Err(code) => return code,
    };

    let master_password = match vault::prompt_new_master_password() {
        Ok(pw) => pw,
        Err(error) => return prompt_failure(&error),
    };

    match vault::register(&paths, &master_password, &ctx.settings.options) {
        Ok(()) => {
            let meta = json!({
                "kind": "register",
                "user": &args.user,
                "vault_dir": ctx.settings.vault_dir.display().to_string(),
            });
            let value = if ctx.output_mode.quiet {
                args.user.clone()
            } else {
                format!("Registered {}", args.user)
            };
            output::print_value(value, meta, &ctx.output_mode)
        }
        Err(error) => vault_failure(&error),
    }
}

pub fn list(args: cli::UserArgs, ctx: &AppContext) -> ExitCode {
    let (vault, _) = match open_vault(&args.user, ctx) {
        Ok(opened) => opened,
        Err(code) => return code,
    };

    let websites = vault.list_websites();
    let value = if websites.is_empty() && !ctx.output_mode.quiet && !ctx.output_mode.json {
        "No passwords stored.".to_string()
    } else {
        websites.join("\n")
    };
    let meta = json!({
        "kind": "list",
        "user": &args.user,
        "count": websites.len(),
        "websites": websites,
    });

    output::print_value(value, meta, &ctx.output_mode)
}

pub fn get(args: cli::WebsiteArgs, ctx: &AppContext) -> ExitCode {
    let (vault, _) = match open_vault(&args.account.user, ctx) {
        Ok(opened) => opened,
        Err(code) => return code,
    };

    match vault.get_password(&args.website) {
        Some(password) => {
            let meta = json!({
                "kind": "get",
                "user": &args.account.user,
                "website": &args.website,
            });
            output::print_value(password.expose_secret().to_string(), meta, &ctx.output_mode)
        }
        None => {
            eprintln!("Error: no password stored for '{}'", args.website);
            ExitCode::from(exit_codes::EXIT_USAGE)
        }
    }
}

pub fn add(args: cli::AddArgs, ctx: &AppContext) -> ExitCode {
    let target = args.target;
    if !vault::naming::is_valid_website(&target.website) {
        return vault_failure(&VaultError::InvalidWebsite);
    }

    let (mut vault, _) = match open_vault(&target.account.user, ctx) {
        Ok(opened) => opened,
        Err(code) => return code,
    };

    let password = match args.password {
        Some(password) => SecretString::from(password),
        None => match vault::prompt_entry_password(&target.website) {
            Ok(password) => password,
            Err(error) => return prompt_failure(&error),
        },
    };

    let replaced = vault.get_password(&target.website).is_some();
    match vault.add_entry(&target.website, password) {
        Ok(()) => {
            let meta = json!({
                "kind": "add",
                "user": &target.account.user,
                "website": &target.website,
                "replaced": replaced,
            });
            let value = match (ctx.output_mode.quiet, replaced) {
                (true, _) => target.website.clone(),
                (false, true) => format!("Updated password for {}", target.website),
                (false, false) => format!("Stored password for {}", target.website),
            };
            output::print_value(value, meta, &ctx.output_mode)
        }
        Err(error) => vault_failure(&error),
    }
}

pub fn remove(args: cli::WebsiteArgs, ctx: &AppContext) -> ExitCode {
    let (mut vault, _) = match open_vault(&args.account.user, ctx) {
        Ok(opened) => opened,
        Err(code) => return code,
    };

    match vault.remove_entry(&args.website) {
        Ok(outcome) => {
            let removed = outcome == Removal::Deleted;
            let meta = json!({
                "kind": "rm",
                "user": &args.account.user,
                "website": &args.website,
                "removed": removed,
            });
            let value = match (ctx.output_mode.quiet, removed) {
                (true, _) => args.website.clone(),
                (false, true) => format!("Removed {}", args.website),
                (false, false) => format!("Nothing stored for {}", args.website),
            };
            output::print_value(value, meta, &ctx.output_mode)
        }
        Err(error) => vault_failure(&error),
    }
}

pub fn passwd(args: cli::UserArgs, ctx: &AppContext) -> ExitCode {
    let (vault, old_password) = match open_vault(&args.user, ctx) {
        Ok(opened) => opened,
        Err(code) => return code,
    };

    let new_password = match vault::prompt_new_master_password() {
        Ok(pw) => pw,
        Err(error) => return prompt_failure(&error),
    };

    match vault.change_master_password(&old_password, &new_password, &ctx.settings.options) {
        Ok(()) => {
            let meta = json!({
                "kind": "passwd",
                "user": &args.user,
                "iterations": ctx.settings.options.kdf.iterations,
            });
            let value = if ctx.output_mode.quiet {
                args.user.clone()
            } else {
                "Master password changed".to_string()
            };
            output::print_value(value, meta, &ctx.output_mode)
        }
        Err(error) => vault_failure(&error),
    }
}

pub fn delete_account(args: cli::UserArgs, ctx: &AppContext) -> ExitCode {
    let (vault, _) = match open_vault(&args.user, ctx) {
        Ok(opened) => opened,
        Err(code) => return code,
    };

    match vault.delete_account() {
        Ok(()) => {
            let meta = json!({
                "kind": "delete-account",
                "user": &args.user,
            });
            let value = if ctx.output_mode.quiet {
                args.user.clone()
            } else {
                format!("Deleted account {}", args.user)
            };
            output::print_value(value, meta, &ctx.output_mode)
        }
        Err(error) => vault_failure(&error),
    }
}
