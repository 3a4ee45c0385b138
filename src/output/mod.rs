use serde_json::json;
use std::error::Error;
use std::process::ExitCode;

pub struct OutputMode {
    pub json: bool,
    pub quiet: bool,
}

pub fn print_value(value: String, meta: serde_json::Value, output_mode: &OutputMode) -> ExitCode {
    if output_mode.json {
        let payload = json!({
            "value": value,
            "meta": meta,
        });
        println!("{payload}");
    } else if !value.is_empty() {
        println!("{value}");
    }

    ExitCode::SUCCESS
}

/// Print `error` and its source chain to stderr.
pub fn print_error(error: &dyn Error) {
    eprintln!("Error: {error}");
    let mut source = error.source();
    while let Some(cause) = source {
        eprintln!("  caused by: {cause}");
        source = cause.source();
    }
}
