//! Logging bootstrap.
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter` and either a
//! human-readable or a JSON formatting layer. `RUST_LOG` always wins over the
//! configured level.

#[cfg(feature = "telemetry")]
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::RbacResult;
use serde::{Deserialize, Serialize};

/// Output format of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line human readable output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Base log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log line format.
    #[serde(default)]
    pub log_format: LogFormat,

    /// Whether to include the event target in each line.
    #[serde(default = "default_with_target")]
    pub with_target: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_with_target() -> bool {
    true
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            with_target: default_with_target(),
        }
    }
}

impl TelemetryConfig {
    /// Returns the filter directive used when `RUST_LOG` is unset.
    ///
    /// Dependencies stay at `warn` so the configured level only raises
    /// verbosity for the synthesizer's own crates.
    #[must_use]
    pub fn filter_directive(&self) -> String {
        let level = self.log_level.to_lowercase();
        format!("warn,rbac_core={0},rbac_config={0},rbac_security={0},rbac_constructs={0},rbac_synth={0}", level)
    }
}

/// Initialize logging with the given configuration.
///
/// Logs go to stderr so a template written to stdout stays clean.
#[cfg(feature = "telemetry")]
pub fn init_telemetry(config: &TelemetryConfig) -> RbacResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter_directive()));

    let result = match config.log_format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(config.with_target),
            )
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(config.with_target),
            )
            .try_init(),
    };

    result.map_err(|e| crate::RbacError::Internal(format!("Failed to initialize logging: {}", e)))?;

    tracing::debug!(
        log_level = %config.log_level,
        log_format = ?config.log_format,
        "Telemetry initialized"
    );

    Ok(())
}

/// Placeholder for when the telemetry feature is disabled.
#[cfg(not(feature = "telemetry"))]
pub fn init_telemetry(_config: &TelemetryConfig) -> RbacResult<()> {
    Ok(())
}
