//! Configuration management for firegen.
//!
//! The YAML file describes the shape of the generated load:
//!
//! ```yaml
//! metrics: 10
//! interval: 15
//! services: 4
//! attributes:
//!   - name: zone
//!     cardinality: 3
//!   - name: pod
//!     cardinality: 20
//! ```
//!
//! Every count is clamped to at least 1 while parsing, so a zero or negative
//! value never reaches the generator.

use crate::core::types::{deserialize_at_least_one, AttributeDefinition};
use crate::core::{FiregenError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Default config file looked up when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "firegen.yaml";

/// Longest accepted tick interval, one year.
pub const MAX_INTERVAL_SECS: u64 = 365 * 24 * 60 * 60;

/// Complete load shape, read once at startup and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of metric names per service
    #[serde(deserialize_with = "deserialize_at_least_one")]
    pub metrics: usize,
    /// Tick interval in whole seconds
    #[serde(deserialize_with = "deserialize_at_least_one")]
    pub interval: u64,
    /// Number of simulated services
    #[serde(deserialize_with = "deserialize_at_least_one")]
    pub services: usize,
    /// Attribute dimensions, most significant first
    pub attributes: Vec<AttributeDefinition>,
    /// Share of the interval granted to a single export
    pub export_timeout_fraction: f64,
    /// Lower bound for the export deadline
    #[serde(with = "humantime_serde")]
    pub min_export_timeout: Duration,
    /// How long shutdown waits for workers before aborting them
    #[serde(with = "humantime_serde")]
    pub shutdown_grace: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            metrics: 1,
            interval: 1,
            services: 1,
            attributes: Vec::new(),
            export_timeout_fraction: 0.25,
            min_export_timeout: Duration::from_secs(1),
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

impl Config {
    /// Load, clamp and validate a config file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            FiregenError::config(format!("Failed to open {}: {}", path.display(), e))
        })?;

        let config = ConfigBuilder::new()
            .from_yaml(&content)
            .map_err(|e| FiregenError::config(format!("Failed to parse {}: {}", path.display(), e)))?
            .build()?;

        tracing::info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.interval > MAX_INTERVAL_SECS {
            return Err(FiregenError::config(format!(
                "interval must be at most {MAX_INTERVAL_SECS} seconds, got {}",
                self.interval
            )));
        }

        if !(self.export_timeout_fraction > 0.0 && self.export_timeout_fraction <= 1.0) {
            return Err(FiregenError::config(format!(
                "export_timeout_fraction must be in (0, 1], got {}",
                self.export_timeout_fraction
            )));
        }

        let mut seen = HashSet::new();
        for attribute in &self.attributes {
            if attribute.name.is_empty() {
                return Err(FiregenError::config("attribute names cannot be empty"));
            }
            if !seen.insert(attribute.name.as_str()) {
                return Err(FiregenError::config(format!(
                    "duplicate attribute name '{}'",
                    attribute.name
                )));
            }
        }

        self.checked_total_series().ok_or_else(|| {
            FiregenError::config("total series count overflows; reduce metrics, services or cardinality")
        })?;

        Ok(())
    }

    /// Clamp every count to at least 1.
    pub fn clamp(&mut self) {
        self.metrics = self.metrics.max(1);
        self.interval = self.interval.max(1);
        self.services = self.services.max(1);
        for attribute in &mut self.attributes {
            attribute.cardinality = attribute.cardinality.max(1);
        }
    }

    /// Tick interval as a duration
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    /// Deadline for one export: a fraction of the interval, floored at
    /// `min_export_timeout` and never longer than the interval itself.
    pub fn export_timeout(&self) -> Duration {
        let interval = self.interval();
        interval
            .mul_f64(self.export_timeout_fraction)
            .max(self.min_export_timeout)
            .min(interval)
    }

    /// Grace period granted to workers on shutdown
    pub fn shutdown_grace(&self) -> Duration {
        self.shutdown_grace
    }

    fn checked_total_series(&self) -> Option<usize> {
        self.attributes
            .iter()
            .try_fold(1usize, |acc, attribute| acc.checked_mul(attribute.cardinality))?
            .checked_mul(self.metrics)?
            .checked_mul(self.services)
    }
}

/// Configuration builder for programmatic construction
pub struct ConfigBuilder {
    config: Config,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        ConfigBuilder {
            config: Config::default(),
        }
    }

    /// Load configuration from YAML string
    pub fn from_yaml(mut self, yaml: &str) -> Result<Self> {
        self.config = serde_yaml::from_str(yaml)?;
        Ok(self)
    }

    /// Set number of metrics
    pub fn metrics(mut self, metrics: usize) -> Self {
        self.config.metrics = metrics;
        self
    }

    /// Set number of services
    pub fn services(mut self, services: usize) -> Self {
        self.config.services = services;
        self
    }

    /// Set tick interval in seconds
    pub fn interval_secs(mut self, secs: u64) -> Self {
        self.config.interval = secs;
        self
    }

    /// Append an attribute dimension
    pub fn attribute(mut self, name: impl Into<String>, cardinality: usize) -> Self {
        self.config
            .attributes
            .push(AttributeDefinition::new(name, cardinality));
        self
    }

    /// Set export deadline fraction
    pub fn export_timeout_fraction(mut self, fraction: f64) -> Self {
        self.config.export_timeout_fraction = fraction;
        self
    }

    /// Set export deadline floor
    pub fn min_export_timeout(mut self, timeout: Duration) -> Self {
        self.config.min_export_timeout = timeout;
        self
    }

    /// Set shutdown grace period
    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.config.shutdown_grace = grace;
        self
    }

    /// Clamp, validate and return the configuration
    pub fn build(mut self) -> Result<Config> {
        self.config.clamp();
        self.config.validate()?;
        Ok(self.config)
    }
}
