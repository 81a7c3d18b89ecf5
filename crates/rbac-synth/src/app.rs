//! Application builder.

use rbac_config::AppConfig;
use rbac_constructs::{assemble, Template};
use rbac_core::{RbacResult, SynthesisId};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

/// Where a synthesized template ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateDestination {
    File(PathBuf),
    Stdout,
}

/// Summary of one synthesis run.
#[derive(Debug, Clone)]
pub struct SynthesisReport {
    pub synthesis_id: SynthesisId,
    pub stack_name: String,
    pub resources: usize,
    pub consumers: usize,
    pub destination: TemplateDestination,
}

/// Application builder for one synthesis run.
pub struct AppBuilder {
    config: Option<AppConfig>,
}

impl AppBuilder {
    /// Creates a new application builder.
    pub fn new() -> Self {
        Self { config: None }
    }

    /// Sets the configuration.
    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Assembles the configured stack and renders it.
    pub fn synthesize(&self) -> RbacResult<(Template, SynthesisReport)> {
        let config = self.config.clone().unwrap_or_default();
        let assembled = assemble(&config)?;
        let template = assembled.synthesize()?;

        let destination = config
            .output
            .path
            .as_ref()
            .map_or(TemplateDestination::Stdout, |p| TemplateDestination::File(PathBuf::from(p)));

        let report = SynthesisReport {
            synthesis_id: assembled.stack.synthesis_id(),
            stack_name: assembled.stack.name().to_string(),
            resources: template.resources.len(),
            consumers: assembled.consumers.len(),
            destination,
        };
        Ok((template, report))
    }

    /// Synthesizes and writes the template to the configured file, or to `stdout`.
    pub fn run_with_writer<W: Write>(self, stdout: &mut W) -> RbacResult<SynthesisReport> {
        let pretty = self.config.as_ref().map_or(true, |c| c.output.pretty);
        let (template, report) = self.synthesize()?;

        match &report.destination {
            TemplateDestination::File(path) => template.write_to(path, pretty)?,
            TemplateDestination::Stdout => {
                writeln!(stdout, "{}", template.to_json_string(pretty)?)?;
                stdout.flush()?;
            }
        }

        info!(
            stack = %report.stack_name,
            synthesis_id = %report.synthesis_id,
            resources = report.resources,
            "Synthesis complete"
        );
        Ok(report)
    }

    /// Synthesizes and writes the template, using the process stdout.
    pub fn run(self) -> RbacResult<SynthesisReport> {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        self.run_with_writer(&mut handle)
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.network.subnet_ids = vec!["subnet-0a".to_string()];
        config
    }

    #[test]
    fn test_app_builder_new() {
        let builder = AppBuilder::new();
        assert!(builder.config.is_none());
    }

    #[test]
    fn test_app_builder_with_config() {
        let builder = AppBuilder::default().with_config(config());
        assert!(builder.config.is_some());
    }

    #[test]
    fn test_run_writes_to_stdout_writer() {
        let mut config = config();
        config.output.pretty = false;
        let mut out = Vec::new();

        let report = AppBuilder::new().with_config(config).run_with_writer(&mut out).unwrap();
        assert_eq!(report.destination, TemplateDestination::Stdout);
        assert_eq!(report.consumers, 3);

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 1);
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["Resources"].as_object().map(|r| r.len()), Some(report.resources));
    }

    #[test]
    fn test_run_writes_to_configured_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stack.template.json");
        let mut config = config();
        config.output.path = Some(path.display().to_string());

        let mut out = Vec::new();
        let report = AppBuilder::new().with_config(config).run_with_writer(&mut out).unwrap();

        assert_eq!(report.destination, TemplateDestination::File(path.clone()));
        assert!(out.is_empty());
        let parsed: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed["Description"], AppConfig::default().stack.description.as_str());
    }
}
