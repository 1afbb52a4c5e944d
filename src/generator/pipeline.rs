//! One service's record, collect and export cycle.

use crate::core::{FiregenError, Result, ServiceName};
use crate::export::MetricSink;
use crate::generator::catalog::SeriesCatalog;
use crate::metrics::GaugeRecorder;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Result of a single tick.
#[derive(Debug)]
pub enum TickOutcome {
    /// The sink accepted the batch
    Exported { points: usize, elapsed: Duration },
    /// The export did not finish within the deadline
    TimedOut { deadline: Duration },
    /// The sink reported an error
    Failed(FiregenError),
    /// Shutdown was signalled before or during the tick
    Cancelled,
}

impl TickOutcome {
    pub fn is_exported(&self) -> bool {
        matches!(self, TickOutcome::Exported { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, TickOutcome::Cancelled)
    }
}

/// Record, collect and export for one simulated service.
///
/// Owns its recorder and sink exclusively; only the catalog is shared.
pub struct ExportPipeline {
    service: ServiceName,
    catalog: Arc<SeriesCatalog>,
    recorder: GaugeRecorder,
    sink: Box<dyn MetricSink>,
    export_timeout: Duration,
    rng: StdRng,
}

impl ExportPipeline {
    pub fn new(
        service: ServiceName,
        catalog: Arc<SeriesCatalog>,
        recorder: GaugeRecorder,
        sink: Box<dyn MetricSink>,
        export_timeout: Duration,
    ) -> Self {
        Self {
            service,
            catalog,
            recorder,
            sink,
            export_timeout,
            rng: StdRng::from_entropy(),
        }
    }

    /// Use a seeded generator for reproducible sample values.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn service(&self) -> &ServiceName {
        &self.service
    }

    pub fn export_timeout(&self) -> Duration {
        self.export_timeout
    }

    /// Run one tick: record every series, snapshot, then export under the
    /// deadline. Never fails; problems are reported and returned as outcomes.
    pub async fn tick(&mut self, cancel: &CancellationToken) -> TickOutcome {
        if cancel.is_cancelled() {
            return TickOutcome::Cancelled;
        }

        self.record();
        let batch = self.recorder.collect();
        let points = batch.point_count();

        let deadline = self.export_timeout;
        let started = Instant::now();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return TickOutcome::Cancelled,
            result = tokio::time::timeout(deadline, self.sink.export(batch, deadline)) => result,
        };

        let outcome = match result {
            Err(_) => TickOutcome::TimedOut { deadline },
            Ok(_) if cancel.is_cancelled() => return TickOutcome::Cancelled,
            Ok(Ok(())) => TickOutcome::Exported {
                points,
                elapsed: started.elapsed(),
            },
            Ok(Err(err)) if err.is_timeout() => TickOutcome::TimedOut { deadline },
            Ok(Err(err)) => TickOutcome::Failed(err),
        };

        self.report(&outcome);
        outcome
    }

    /// Release the sink. Consumes the pipeline so it happens at most once.
    pub async fn shutdown(self) -> Result<()> {
        self.sink.shutdown().await
    }

    /// Write one uniformly drawn sample for every metric and combination.
    fn record(&mut self) -> usize {
        let metrics = self.catalog.metric_names().len();
        let combinations = self.catalog.combinations().len();

        for metric in 0..metrics {
            for combination in 0..combinations {
                let value: f64 = self.rng.gen();
                self.recorder.record(metric, combination, value);
            }
        }
        metrics * combinations
    }

    fn report(&self, outcome: &TickOutcome) {
        match outcome {
            TickOutcome::Exported { points, elapsed } => tracing::info!(
                service = %self.service,
                points,
                elapsed_ms = millis(*elapsed),
                "Exported {} measurements for {} in {}ms",
                points,
                self.service,
                millis(*elapsed)
            ),
            TickOutcome::TimedOut { deadline } => tracing::warn!(
                service = %self.service,
                timeout_ms = millis(*deadline),
                "Timeout after {:?} exporting metrics for {}",
                deadline,
                self.service
            ),
            TickOutcome::Failed(err) => tracing::warn!(
                service = %self.service,
                category = err.category(),
                "Failed to export metrics for {}: {}",
                self.service,
                err
            ),
            TickOutcome::Cancelled => {},
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AttributeDefinition;
    use crate::metrics::MetricBatch;
    use async_trait::async_trait;
    use opentelemetry_proto::tonic::metrics::v1::{metric::Data, number_data_point::Value};
    use std::sync::Mutex;

    /// Sink that remembers every batch and can be told to stall or fail.
    #[derive(Default)]
    struct ScriptedSink {
        batches: Arc<Mutex<Vec<MetricBatch>>>,
        delay: Option<Duration>,
        fail: bool,
    }

    #[async_trait]
    impl MetricSink for ScriptedSink {
        async fn export(&self, batch: MetricBatch, _deadline: Duration) -> Result<()> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(FiregenError::Grpc(tonic::Status::unavailable("collector down")));
            }
            self.batches.lock().unwrap().push(batch);
            Ok(())
        }

        async fn shutdown(&self) -> Result<()> {
            Ok(())
        }
    }

    fn pipeline(sink: ScriptedSink) -> ExportPipeline {
        let catalog = Arc::new(SeriesCatalog::new(
            2,
            &[AttributeDefinition::new("a", 2), AttributeDefinition::new("b", 3)],
        ));
        let service = ServiceName::for_index(0);
        let recorder = GaugeRecorder::new(&service, &catalog).unwrap();
        ExportPipeline::new(service, catalog, recorder, Box::new(sink), Duration::from_secs(1))
            .with_seed(7)
    }

    #[tokio::test]
    async fn test_tick_exports_full_cross_product() {
        let batches = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = pipeline(ScriptedSink {
            batches: Arc::clone(&batches),
            ..Default::default()
        });

        let outcome = pipeline.tick(&CancellationToken::new()).await;
        match outcome {
            TickOutcome::Exported { points, .. } => assert_eq!(points, 12),
            other => panic!("unexpected outcome {other:?}"),
        }

        let batches = batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].point_count(), 12);
        assert_eq!(batches[0].metric_count(), 2);
    }

    #[tokio::test]
    async fn test_samples_are_in_unit_interval() {
        let mut pipeline = pipeline(ScriptedSink::default());
        pipeline.record();
        let batch = pipeline.recorder.collect();

        for metric in &batch.request().resource_metrics[0].scope_metrics[0].metrics {
            let Some(Data::Gauge(gauge)) = &metric.data else {
                panic!("expected gauge");
            };
            for point in &gauge.data_points {
                let Some(Value::AsDouble(v)) = point.value else {
                    panic!("expected double");
                };
                assert!((0.0..1.0).contains(&v));
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_export_times_out() {
        let mut pipeline = pipeline(ScriptedSink {
            delay: Some(Duration::from_secs(10)),
            ..Default::default()
        });

        let outcome = pipeline.tick(&CancellationToken::new()).await;
        assert!(matches!(
            outcome,
            TickOutcome::TimedOut { deadline } if deadline == Duration::from_secs(1)
        ));
    }

    #[tokio::test]
    async fn test_transport_error_is_reported() {
        let mut pipeline = pipeline(ScriptedSink {
            fail: true,
            ..Default::default()
        });

        let outcome = pipeline.tick(&CancellationToken::new()).await;
        match outcome {
            TickOutcome::Failed(err) => {
                assert_eq!(err.category(), "network");
                assert!(!err.is_timeout());
            },
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancelled_before_tick() {
        let batches = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = pipeline(ScriptedSink {
            batches: Arc::clone(&batches),
            ..Default::default()
        });

        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(pipeline.tick(&cancel).await.is_cancelled());
        assert!(batches.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_mid_export() {
        let batches = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = pipeline(ScriptedSink {
            batches: Arc::clone(&batches),
            delay: Some(Duration::from_millis(500)),
            ..Default::default()
        });

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        assert!(pipeline.tick(&cancel).await.is_cancelled());
        assert!(started.elapsed() < Duration::from_millis(500));
        assert!(batches.lock().unwrap().is_empty());
    }
}
