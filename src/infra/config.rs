//! Configuration loading from TOML files
//!
//! Every section is optional; a missing file or section falls back to
//! defaults suitable for a single ungated scanner.

use crate::domain::types::GateContext;
use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct GateSection {
    /// Physical gate identifier (e.g., "GATE_1"); empty for gate-agnostic
    #[serde(default)]
    pub gate_id: Option<String>,
    /// Human-readable location attached to commits
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScanSection {
    /// Suppression window after a successful check-in (re-presenting the
    /// same ticket is ignored for this long)
    #[serde(default = "default_success_suppress_ms")]
    pub success_suppress_ms: u64,
    /// Suppression window after a failed attempt
    #[serde(default = "default_failure_suppress_ms")]
    pub failure_suppress_ms: u64,
    /// Command channel capacity (bounded for backpressure)
    #[serde(default = "default_command_buffer")]
    pub command_buffer: usize,
}

fn default_success_suppress_ms() -> u64 {
    15_000
}

fn default_failure_suppress_ms() -> u64 {
    3_000
}

fn default_command_buffer() -> usize {
    64
}

impl Default for ScanSection {
    fn default() -> Self {
        Self {
            success_suppress_ms: default_success_suppress_ms(),
            failure_suppress_ms: default_failure_suppress_ms(),
            command_buffer: default_command_buffer(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisplaySection {
    /// How long a success result stays on screen
    #[serde(default = "default_display_success_ms")]
    pub success_ms: u64,
    /// How long a failure result stays on screen (longer so staff can
    /// read the reason)
    #[serde(default = "default_display_failure_ms")]
    pub failure_ms: u64,
}

fn default_display_success_ms() -> u64 {
    2_000
}

fn default_display_failure_ms() -> u64 {
    3_000
}

impl Default for DisplaySection {
    fn default() -> Self {
        Self {
            success_ms: default_display_success_ms(),
            failure_ms: default_display_failure_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RosterSection {
    /// JSON ticket roster used by the development gateway
    #[serde(default = "default_roster_file")]
    pub file: String,
}

fn default_roster_file() -> String {
    "config/roster.json".to_string()
}

impl Default for RosterSection {
    fn default() -> Self {
        Self { file: default_roster_file() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EgressSection {
    /// File path for session egress (JSONL format)
    #[serde(default = "default_egress_file")]
    pub file: String,
}

fn default_egress_file() -> String {
    "sessions.jsonl".to_string()
}

impl Default for EgressSection {
    fn default() -> Self {
        Self { file: default_egress_file() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSection {
    #[serde(default = "default_metrics_interval")]
    pub interval_secs: u64,
}

fn default_metrics_interval() -> u64 {
    10
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval() }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub gate: GateSection,
    #[serde(default)]
    pub scan: ScanSection,
    #[serde(default)]
    pub display: DisplaySection,
    #[serde(default)]
    pub roster: RosterSection,
    #[serde(default)]
    pub egress: EgressSection,
    #[serde(default)]
    pub metrics: MetricsSection,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    gate_id: Option<String>,
    location: Option<String>,
    success_suppress_ms: u64,
    failure_suppress_ms: u64,
    command_buffer: usize,
    display_success_ms: u64,
    display_failure_ms: u64,
    roster_file: String,
    egress_file: String,
    metrics_interval_secs: u64,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gate_id: None,
            location: None,
            success_suppress_ms: default_success_suppress_ms(),
            failure_suppress_ms: default_failure_suppress_ms(),
            command_buffer: default_command_buffer(),
            display_success_ms: default_display_success_ms(),
            display_failure_ms: default_display_failure_ms(),
            roster_file: default_roster_file(),
            egress_file: default_egress_file(),
            metrics_interval_secs: default_metrics_interval(),
            config_file: "default".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self {
            gate_id: toml_config.gate.gate_id,
            location: toml_config.gate.location,
            success_suppress_ms: toml_config.scan.success_suppress_ms,
            failure_suppress_ms: toml_config.scan.failure_suppress_ms,
            command_buffer: toml_config.scan.command_buffer,
            display_success_ms: toml_config.display.success_ms,
            display_failure_ms: toml_config.display.failure_ms,
            roster_file: toml_config.roster.file,
            egress_file: toml_config.egress.file,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            config_file: path.display().to_string(),
        })
    }

    /// Load configuration - tries the TOML file first, falls back to defaults
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        match Self::from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {}. Using defaults.", e);
                Self::default()
            }
        }
    }

    /// Gate context attached to every commit call
    pub fn gate_context(&self) -> GateContext {
        GateContext::new(self.gate_id.clone(), self.location.clone())
    }

    // Getters for all config fields
    pub fn gate_id(&self) -> Option<&str> {
        self.gate_id.as_deref()
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn success_suppress_ms(&self) -> u64 {
        self.success_suppress_ms
    }

    pub fn failure_suppress_ms(&self) -> u64 {
        self.failure_suppress_ms
    }

    pub fn command_buffer(&self) -> usize {
        self.command_buffer
    }

    pub fn display_success_ms(&self) -> u64 {
        self.display_success_ms
    }

    pub fn display_failure_ms(&self) -> u64 {
        self.display_failure_ms
    }

    pub fn roster_file(&self) -> &str {
        &self.roster_file
    }

    pub fn egress_file(&self) -> &str {
        &self.egress_file
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method for tests to set the egress file
    #[cfg(test)]
    pub fn with_egress_file(mut self, path: &str) -> Self {
        self.egress_file = path.to_string();
        self
    }

    /// Builder method for tests to set suppression windows
    #[cfg(test)]
    pub fn with_suppress_windows(mut self, success_ms: u64, failure_ms: u64) -> Self {
        self.success_suppress_ms = success_ms;
        self.failure_suppress_ms = failure_ms;
        self
    }

    /// Builder method for tests to set the gate context
    #[cfg(test)]
    pub fn with_gate(mut self, gate_id: &str) -> Self {
        self.gate_id = Some(gate_id.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.gate_id(), None);
        assert_eq!(config.success_suppress_ms(), 15_000);
        assert_eq!(config.failure_suppress_ms(), 3_000);
        assert_eq!(config.display_success_ms(), 2_000);
        assert_eq!(config.display_failure_ms(), 3_000);
        assert_eq!(config.command_buffer(), 64);
        assert_eq!(config.egress_file(), "sessions.jsonl");
        assert_eq!(config.metrics_interval_secs(), 10);
    }

    #[test]
    fn test_failure_display_outlasts_success() {
        let config = Config::default();
        assert!(config.display_failure_ms() > config.display_success_ms());
    }

    #[test]
    fn test_success_suppress_outlasts_failure_suppress() {
        let config = Config::default();
        assert!(config.success_suppress_ms() > config.failure_suppress_ms());
    }

    #[test]
    fn test_gate_context_from_config() {
        let config = Config::default().with_gate("GATE_2");
        let ctx = config.gate_context();
        assert_eq!(ctx.gate_id.as_deref(), Some("GATE_2"));
        assert!(ctx.location.is_none());
    }

    #[test]
    fn test_partial_toml_falls_back_per_section() {
        let toml_config: TomlConfig = toml::from_str(
            r#"
[gate]
gate_id = "GATE_7"

[display]
success_ms = 1500
"#,
        )
        .unwrap();

        assert_eq!(toml_config.gate.gate_id.as_deref(), Some("GATE_7"));
        assert_eq!(toml_config.display.success_ms, 1500);
        // Untouched sections keep their defaults
        assert_eq!(toml_config.display.failure_ms, 3_000);
        assert_eq!(toml_config.scan.success_suppress_ms, 15_000);
        assert_eq!(toml_config.egress.file, "sessions.jsonl");
    }

    #[test]
    fn test_empty_toml_is_valid() {
        let toml_config: TomlConfig = toml::from_str("").unwrap();
        assert_eq!(toml_config.scan.command_buffer, 64);
        assert!(toml_config.gate.gate_id.is_none());
    }
}
