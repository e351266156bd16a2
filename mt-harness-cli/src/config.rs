//! Configuration loading and parsing

use anyhow::{bail, Context, Result};
use mt_harness::{HarnessConfig, TestCase};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration (loaded from a TOML file)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub ports: HarnessConfig,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
    #[serde(default)]
    pub visualization: VisualizationConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VisualizationConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_delay")]
    pub delay_ms: u64,
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            delay_ms: default_delay(),
        }
    }
}

fn default_delay() -> u64 {
    500
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub format: ReportFormat,
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub include_samples: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Txt,
    Json,
}

/// Load configuration from a TOML file
///
/// Relative test-case paths are resolved against the config file's directory.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config = parse_config(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    if let Some(base) = path.parent() {
        config.resolve_paths(base);
    }

    Ok(config)
}

/// Parse and validate configuration text
pub fn parse_config(content: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

impl AppConfig {
    fn validate(&self) -> Result<()> {
        self.ports.validate()?;

        let mut ids = HashSet::new();
        for case in &self.test_cases {
            if case.id.is_empty() {
                bail!("Test case ids must not be empty");
            }
            if !ids.insert(case.id.as_str()) {
                bail!("Duplicate test case id: {}", case.id);
            }
        }

        Ok(())
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };

        for case in &mut self.test_cases {
            resolve(&mut case.input_dir);
            resolve(&mut case.output_dir);
            if let Some(rules) = case.rules.as_mut() {
                resolve(rules);
            }
        }
        if let Some(output) = self.report.output.as_mut() {
            resolve(output);
        }
    }
}
