use crate::app::AppContext;
use crate::output;
use serde_json::json;
use std::process::ExitCode;

pub fn run(ctx: &AppContext) -> ExitCode {
    let settings = &ctx.settings;
    let kdf = settings.options.kdf;

    let meta = json!({
        "kind": "config",
        "config_path": settings.config_path.display().to_string(),
        "vault_dir": settings.vault_dir.display().to_string(),
        "vault_dir_source": settings.vault_dir_source,
        "kdf": {
            "algorithm": kdf.algorithm.as_str(),
            "iterations": kdf.iterations,
        },
        "min_password_length": settings.options.min_password_length,
    });

    let value = if ctx.output_mode.quiet {
        settings.vault_dir.display().to_string()
    } else {
        let mut lines = vec![
            format!("config file: {}", settings.config_path.display()),
            format!(
                "vault dir: {} ({:?})",
                settings.vault_dir.display(),
                settings.vault_dir_source
            ),
            format!("kdf: {} with {} iterations", kdf.algorithm, kdf.iterations),
            format!("minimum password length: {}", settings.options.min_password_length),
        ];
        if settings.uses_legacy_iterations() {
            lines.push("warning: iteration count is at the legacy level".to_string());
        }
        lines.join("\n")
    };

    output::print_value(value, meta, &ctx.output_mode)
}
