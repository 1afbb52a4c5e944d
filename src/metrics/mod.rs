//! In-process metric instruments and the snapshots they produce.
//!
//! Each simulated service owns one [`GaugeRecorder`]. A tick records a value
//! for every series and then collects a [`MetricBatch`], an owned OTLP request
//! that is handed to the sink and dropped afterwards.

pub mod gauge;

pub use gauge::GaugeRecorder;

use opentelemetry_proto::tonic::collector::metrics::v1::ExportMetricsServiceRequest;
use opentelemetry_proto::tonic::metrics::v1::metric::Data;

/// Point-in-time snapshot of one service's instruments.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetricBatch {
    request: ExportMetricsServiceRequest,
    points: usize,
}

impl MetricBatch {
    /// Wrap an OTLP request, counting the data points it carries.
    pub fn new(request: ExportMetricsServiceRequest) -> Self {
        let points = count_points(&request);
        Self { request, points }
    }

    /// Number of data points across all metrics.
    pub fn point_count(&self) -> usize {
        self.points
    }

    /// Number of distinct metrics in the batch.
    pub fn metric_count(&self) -> usize {
        self.request
            .resource_metrics
            .iter()
            .flat_map(|rm| &rm.scope_metrics)
            .map(|sm| sm.metrics.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.points == 0
    }

    pub fn request(&self) -> &ExportMetricsServiceRequest {
        &self.request
    }

    pub fn into_request(self) -> ExportMetricsServiceRequest {
        self.request
    }
}

fn count_points(request: &ExportMetricsServiceRequest) -> usize {
    request
        .resource_metrics
        .iter()
        .flat_map(|rm| &rm.scope_metrics)
        .flat_map(|sm| &sm.metrics)
        .filter_map(|metric| metric.data.as_ref())
        .map(|data| match data {
            Data::Gauge(gauge) => gauge.data_points.len(),
            Data::Sum(sum) => sum.data_points.len(),
            Data::Histogram(histogram) => histogram.data_points.len(),
            Data::ExponentialHistogram(histogram) => histogram.data_points.len(),
            Data::Summary(summary) => summary.data_points.len(),
        })
        .sum()
}
