//! Metric names and attribute combinations shared by every service.

use crate::core::{AttributeCombination, AttributeDefinition, Config};
use crate::generator::attributes::{combinations, total_cardinality};

/// Name of the metric at `index`, e.g. `metric-0007`.
pub fn metric_name(index: usize) -> String {
    format!("metric-{index:04}")
}

/// Everything a service needs to know about which series to emit.
///
/// Built once at startup and shared read-only between workers.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesCatalog {
    metric_names: Vec<String>,
    attribute_names: Vec<String>,
    combinations: Vec<AttributeCombination>,
    attribute_cardinality: usize,
}

impl SeriesCatalog {
    /// Build the catalog for `metrics` metric names over `attributes`.
    pub fn new(metrics: usize, attributes: &[AttributeDefinition]) -> Self {
        let metric_names = (0..metrics).map(metric_name).collect();

        let mut all: Vec<AttributeCombination> = combinations(attributes).collect();
        if all.is_empty() {
            all.push(AttributeCombination::empty());
        }

        Self {
            metric_names,
            attribute_names: attributes.iter().map(|def| def.name.clone()).collect(),
            combinations: all,
            attribute_cardinality: total_cardinality(attributes),
        }
    }

    /// Build the catalog described by `config`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.metrics, &config.attributes)
    }

    pub fn metric_names(&self) -> &[String] {
        &self.metric_names
    }

    pub fn attribute_names(&self) -> &[String] {
        &self.attribute_names
    }

    pub fn combinations(&self) -> &[AttributeCombination] {
        &self.combinations
    }

    /// Product of all attribute cardinalities.
    pub fn attribute_cardinality(&self) -> usize {
        self.attribute_cardinality
    }

    /// Series emitted by one service on every tick.
    pub fn series_per_service(&self) -> usize {
        self.metric_names.len() * self.combinations.len()
    }

    /// Series emitted across `services` services.
    pub fn total_series(&self, services: usize) -> usize {
        self.series_per_service() * services
    }

    /// Log the load summary shown at startup.
    pub fn log_summary(&self, config: &Config) {
        tracing::info!(
            "Generating {} services, {} metrics, {} attributes",
            config.services,
            self.metric_names.len(),
            self.attribute_names.len()
        );
        tracing::info!(
            "Interval {:?}, export timeout {:?}",
            config.interval(),
            config.export_timeout()
        );
        tracing::info!("Attribute cardinality per metric {}", self.attribute_cardinality);
        tracing::info!("Series per service {}", self.series_per_service());
        tracing::info!("Total series {}", self.total_series(config.services));
    }
}
