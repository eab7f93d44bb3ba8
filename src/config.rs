//! Configuration file management for lscerts.
//!
//! Settings are layered: defaults first, then an optional TOML file given
//! with `--config`, then command-line arguments. Each layer only overrides
//! the values it actually sets.
//!
//! # Example Configuration File
//!
//! ```toml
//! urls = ["https://example.com", "https://example.com:8443/health"]
//! output = "csv"
//! no_header = false
//! timeout = 5
//! jobs = 4
//! exit_code = 1
//!
//! [prometheus]
//! enabled = true
//! address = "http://localhost:9091"
//! ```

use crate::fetch::DEFAULT_CONNECT_TIMEOUT;
use crate::output::OutputFormat;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Main configuration structure for lscerts.
///
/// All fields are optional to support partial configuration and merging.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// URLs to audit when no input file is given
    pub urls: Option<Vec<String>>,
    /// Output format: csv, json, table
    pub output: Option<String>,
    /// Do not write the report header
    pub no_header: Option<bool>,
    /// Connect timeout in seconds
    pub timeout: Option<u64>,
    /// Number of endpoints fetched concurrently
    pub jobs: Option<usize>,
    /// Exit code to use when at least one URL failed
    pub exit_code: Option<i32>,
    /// Prometheus configuration
    pub prometheus: Option<PrometheusConfig>,
}

/// Prometheus Push Gateway settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PrometheusConfig {
    /// Push expiry metrics after the audit
    pub enabled: Option<bool>,
    /// Push gateway address (e.g., "http://localhost:9091")
    pub address: Option<String>,
}

impl Default for Config {
    /// Defaults: CSV output with a header, 5 second connect timeout, one job,
    /// exit code 0 and Prometheus disabled.
    fn default() -> Self {
        Config {
            urls: None,
            output: Some(OutputFormat::default().to_string()),
            no_header: Some(false),
            timeout: Some(DEFAULT_CONNECT_TIMEOUT.as_secs()),
            jobs: Some(1),
            exit_code: Some(0),
            prometheus: Some(PrometheusConfig {
                enabled: Some(false),
                address: Some("http://localhost:9091".to_string()),
            }),
        }
    }
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// * `ConfigError::Io` - file could not be read
    /// * `ConfigError::Parse` - file is not valid TOML or has unknown keys
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Merges this configuration with another, prioritizing the other's values.
    pub fn merge_with(mut self, other: Config) -> Self {
        if other.urls.is_some() {
            self.urls = other.urls;
        }
        if other.output.is_some() {
            self.output = other.output;
        }
        if other.no_header.is_some() {
            self.no_header = other.no_header;
        }
        if other.timeout.is_some() {
            self.timeout = other.timeout;
        }
        if other.jobs.is_some() {
            self.jobs = other.jobs;
        }
        if other.exit_code.is_some() {
            self.exit_code = other.exit_code;
        }
        if let Some(other_prom) = other.prometheus {
            if let Some(ref mut self_prom) = self.prometheus {
                if other_prom.enabled.is_some() {
                    self_prom.enabled = other_prom.enabled;
                }
                if other_prom.address.is_some() {
                    self_prom.address = other_prom.address;
                }
            } else {
                self.prometheus = Some(other_prom);
            }
        }
        self
    }

    /// Creates a Config from command-line arguments for merging.
    ///
    /// Flags that were not given stay `None` so they do not override the
    /// file or the defaults.
    pub fn from_cli_args(
        output: Option<String>,
        no_header: bool,
        timeout: Option<u64>,
        jobs: Option<usize>,
        exit_code: Option<i32>,
        prometheus: bool,
        prometheus_address: Option<String>,
    ) -> Self {
        Config {
            urls: None,
            output,
            no_header: no_header.then_some(true),
            timeout,
            jobs,
            exit_code,
            prometheus: Some(PrometheusConfig {
                enabled: prometheus.then_some(true),
                address: prometheus_address,
            }),
        }
    }

    /// Checks that every value set is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(output) = &self.output {
            OutputFormat::from_str(output).map_err(|_| {
                ConfigError::Validation(format!(
                    "unknown output format '{}', expected csv, json or table",
                    output
                ))
            })?;
        }
        if self.timeout == Some(0) {
            return Err(ConfigError::Validation(
                "timeout must be at least 1 second".to_string(),
            ));
        }
        if self.jobs == Some(0) {
            return Err(ConfigError::Validation(
                "jobs must be at least 1".to_string(),
            ));
        }
        if self.prometheus_enabled() && self.prometheus_address().is_none() {
            return Err(ConfigError::Validation(
                "prometheus is enabled but has no address".to_string(),
            ));
        }
        Ok(())
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output
            .as_deref()
            .and_then(|output| OutputFormat::from_str(output).ok())
            .unwrap_or_default()
    }

    pub fn header(&self) -> bool {
        !self.no_header.unwrap_or(false)
    }

    pub fn connect_timeout(&self) -> Duration {
        self.timeout
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT)
    }

    pub fn jobs(&self) -> usize {
        self.jobs.unwrap_or(1).max(1)
    }

    pub fn failure_exit_code(&self) -> i32 {
        self.exit_code.unwrap_or(0)
    }

    pub fn prometheus_enabled(&self) -> bool {
        self.prometheus
            .as_ref()
            .and_then(|p| p.enabled)
            .unwrap_or(false)
    }

    pub fn prometheus_address(&self) -> Option<&str> {
        self.prometheus.as_ref().and_then(|p| p.address.as_deref())
    }

    /// Generates an example configuration file in TOML format.
    pub fn example_toml() -> String {
        let example = Config {
            urls: Some(vec![
                "https://example.com".to_string(),
                "https://example.com:8443/health".to_string(),
                "https://expired.badssl.com/".to_string(),
            ]),
            output: Some("csv".to_string()),
            no_header: Some(false),
            timeout: Some(5),
            jobs: Some(4),
            exit_code: Some(1),
            prometheus: Some(PrometheusConfig {
                enabled: Some(false),
                address: Some("http://localhost:9091".to_string()),
            }),
        };

        toml::to_string_pretty(&example)
            .unwrap_or_else(|_| "# Error generating example".to_string())
    }
}

/// Errors that can occur during configuration loading and parsing.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error (file not found, permission denied, etc.)
    #[error("IO Error: {0}")]
    Io(String),
    /// TOML parsing error (invalid syntax, type mismatch, etc.)
    #[error("Parse Error: {0}")]
    Parse(String),
    /// A value is set but unusable
    #[error("Validation Error: {0}")]
    Validation(String),
}
