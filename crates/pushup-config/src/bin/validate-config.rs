//! Config validation CLI tool
//!
//! Validates a pushupd configuration file and reports any errors.

use pushup_util::default_config_path;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a pushupd configuration file.");
            eprintln!();
            eprintln!("If no path is provided, uses: {}", default_path.display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match pushup_config::load_config(&config_path) {
        Ok(settings) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", pushup_config::CURRENT_CONFIG_VERSION);
            println!("  Command file:   {}", settings.handoff.command_file.display());
            println!("  Busy lock:      {}", settings.handoff.busy_lock.display());
            println!(
                "  Device:         {} @ {} baud (scan: {})",
                settings.device.preferred_port.display(),
                settings.device.baud_rate,
                settings.device.scan_prefixes.join(", ")
            );
            println!("  Database:       {}", settings.store.database.display());
            println!(
                "  Fallback:       {} reps, {}s rest",
                settings.store.default_repetitions, settings.store.default_rest_seconds
            );
            println!("  Payment:        {}", settings.payment.endpoint);
            println!(
                "  Session:        min {}s, manual-paid check every {} polls",
                settings.session.min_session.as_secs(),
                settings.session.manual_paid_check_every
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                pushup_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                pushup_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                pushup_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                pushup_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        pushup_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
