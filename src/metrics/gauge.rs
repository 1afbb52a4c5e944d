//! Last-value gauge instruments for a single simulated service.

use crate::core::{AttributeCombination, FiregenError, Result, ServiceName};
use crate::generator::catalog::SeriesCatalog;
use crate::metrics::MetricBatch;
use opentelemetry_proto::tonic::{
    collector::metrics::v1::ExportMetricsServiceRequest,
    common::v1::{any_value::Value, AnyValue, InstrumentationScope, KeyValue},
    metrics::v1::{
        metric::Data, number_data_point::Value as PointValue, Gauge, Metric, NumberDataPoint,
        ResourceMetrics, ScopeMetrics,
    },
    resource::v1::Resource,
};
use opentelemetry_semantic_conventions::resource::SERVICE_NAME;

/// One float gauge per metric name, holding the last recorded value of every
/// attribute combination.
///
/// Slots are laid out metric-major: `metric * combinations + combination`.
#[derive(Debug)]
pub struct GaugeRecorder {
    service: ServiceName,
    resource: Resource,
    scope: InstrumentationScope,
    metric_names: Vec<String>,
    attributes: Vec<Vec<KeyValue>>,
    values: Vec<Option<f64>>,
    start_time_unix_nano: u64,
}

impl GaugeRecorder {
    /// Create the instrument set for `service`.
    ///
    /// Fails when the service name is unusable or the catalog has no metrics;
    /// both are setup defects.
    pub fn new(service: &ServiceName, catalog: &SeriesCatalog) -> Result<Self> {
        if service.as_str().is_empty() {
            return Err(FiregenError::setup("cannot build a resource without a service name"));
        }
        if catalog.metric_names().is_empty() {
            return Err(FiregenError::setup(format!(
                "no metrics to register for {service}"
            )));
        }

        let attributes: Vec<Vec<KeyValue>> = catalog
            .combinations()
            .iter()
            .map(to_key_values)
            .collect();
        let slots = catalog.metric_names().len() * attributes.len();

        Ok(Self {
            service: service.clone(),
            resource: Resource {
                attributes: vec![string_attribute(SERVICE_NAME, service.as_str())],
                ..Default::default()
            },
            scope: InstrumentationScope {
                name: format!("firegen-{service}"),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            metric_names: catalog.metric_names().to_vec(),
            attributes,
            values: vec![None; slots],
            start_time_unix_nano: unix_nanos_now(),
        })
    }

    pub fn service(&self) -> &ServiceName {
        &self.service
    }

    pub fn metric_count(&self) -> usize {
        self.metric_names.len()
    }

    pub fn combination_count(&self) -> usize {
        self.attributes.len()
    }

    /// Record the latest value of one series.
    ///
    /// Returns `false` when either index is outside the catalog.
    pub fn record(&mut self, metric: usize, combination: usize, value: f64) -> bool {
        if metric >= self.metric_names.len() || combination >= self.attributes.len() {
            return false;
        }
        let slot = metric * self.attributes.len() + combination;
        self.values[slot] = Some(value);
        true
    }

    /// Snapshot every recorded series into an owned batch.
    ///
    /// Later recordings do not affect a batch already collected.
    pub fn collect(&self) -> MetricBatch {
        let now = unix_nanos_now();
        let combinations = self.attributes.len();

        let metrics = self
            .metric_names
            .iter()
            .enumerate()
            .filter_map(|(m, name)| {
                let slots = &self.values[m * combinations..(m + 1) * combinations];
                let data_points: Vec<NumberDataPoint> = slots
                    .iter()
                    .zip(&self.attributes)
                    .filter_map(|(value, attributes)| {
                        value.map(|v| NumberDataPoint {
                            attributes: attributes.clone(),
                            start_time_unix_nano: self.start_time_unix_nano,
                            time_unix_nano: now,
                            value: Some(PointValue::AsDouble(v)),
                            ..Default::default()
                        })
                    })
                    .collect();

                if data_points.is_empty() {
                    return None;
                }

                Some(Metric {
                    name: name.clone(),
                    data: Some(Data::Gauge(Gauge { data_points })),
                    ..Default::default()
                })
            })
            .collect();

        MetricBatch::new(ExportMetricsServiceRequest {
            resource_metrics: vec![ResourceMetrics {
                resource: Some(self.resource.clone()),
                scope_metrics: vec![ScopeMetrics {
                    scope: Some(self.scope.clone()),
                    metrics,
                    ..Default::default()
                }],
                ..Default::default()
            }],
        })
    }
}

fn to_key_values(combination: &AttributeCombination) -> Vec<KeyValue> {
    combination
        .pairs()
        .iter()
        .map(|pair| string_attribute(&pair.name, &pair.value))
        .collect()
}

fn string_attribute(key: &str, value: &str) -> KeyValue {
    KeyValue {
        key: key.to_string(),
        value: Some(AnyValue {
            value: Some(Value::StringValue(value.to_string())),
        }),
    }
}

fn unix_nanos_now() -> u64 {
    chrono::Utc::now()
        .timestamp_nanos_opt()
        .and_then(|nanos| u64::try_from(nanos).ok())
        .unwrap_or_default()
}
