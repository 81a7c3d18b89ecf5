//! # RBAC Synth
//!
//! Loads configuration, assembles the Redis RBAC stack and writes its
//! template. Logs go to stderr; on failure an error report is printed to
//! stderr and the process exits with the error's exit code.

use rbac_config::ConfigLoader;
use rbac_core::telemetry::{init_telemetry, TelemetryConfig};
use rbac_core::{ErrorReport, RbacError, RbacResult};
use rbac_synth::app::AppBuilder;
use rbac_synth::startup::{print_startup_info, print_summary};
use tracing::{error, info};

fn main() {
    if let Err(e) = run() {
        error!(code = e.error_code(), "Synthesis failed: {}", e);
        report_error(&e);
        std::process::exit(e.exit_code());
    }
}

fn run() -> RbacResult<()> {
    let loader = match ConfigLoader::from_default_location() {
        Ok(loader) => loader,
        Err(e) => {
            // Logging is configured from the file that failed to load.
            if let Err(telemetry_error) = init_telemetry(&TelemetryConfig::default()) {
                eprintln!("Falling back to unstructured errors: {}", telemetry_error);
            }
            return Err(e);
        }
    };
    let config = loader.get();
    init_telemetry(&config.observability)?;

    info!("Starting rbac-synth {}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from {}", loader.config_dir().display());
    print_startup_info(&config);

    let report = AppBuilder::new().with_config(config).run()?;
    print_summary(&report);
    Ok(())
}

fn report_error(error: &RbacError) {
    let report = ErrorReport::from_error(error);
    match serde_json::to_string(&report) {
        Ok(json) => eprintln!("{}", json),
        Err(_) => eprintln!("{}", error),
    }
}
