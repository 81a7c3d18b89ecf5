//! Startup and summary output.

use crate::app::{SynthesisReport, TemplateDestination};
use rbac_config::AppConfig;
use tracing::info;

/// Logs what is about to be synthesized.
pub fn print_startup_info(config: &AppConfig) {
    let separator = "=".repeat(60);
    info!("{}", separator);
    info!("Stack:        {}", config.stack.name);
    info!("Environment:  {}", config.app.environment);
    info!("Users:        {}", config.users.len());
    info!("Roles:        {}", config.roles.len());
    info!("Consumers:    {}", config.consumers.len());
    info!("Credentials:  {} profile", config.secrets.credential_profile);
    info!("{}", separator);
}

/// Logs the outcome of a run.
pub fn print_summary(report: &SynthesisReport) {
    let destination = match &report.destination {
        TemplateDestination::File(path) => path.display().to_string(),
        TemplateDestination::Stdout => "stdout".to_string(),
    };
    info!(
        "Synthesized {} resources and {} consumers for {} -> {}",
        report.resources, report.consumers, report.stack_name, destination
    );
}
