//! Load generation: series enumeration, per-service pipelines and scheduling.
//!
//! - `attributes`: expands attribute definitions into combinations
//! - `catalog`: metric names and combinations shared by every service
//! - `pipeline`: record, collect and export for one service
//! - `scheduler`: staggered timer loop around a pipeline
//!
//! [`Orchestrator`] wires these together, one worker task per service.

pub mod attributes;
pub mod catalog;
pub mod pipeline;
pub mod scheduler;

pub use catalog::SeriesCatalog;
pub use pipeline::{ExportPipeline, TickOutcome};
pub use scheduler::{stagger_offset, SchedulerState, ServiceScheduler, TickStats};

use crate::core::{Config, Result, ServiceName};
use crate::export::SinkFactory;
use crate::metrics::GaugeRecorder;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Starts one scheduler per simulated service and owns the shutdown signal.
pub struct Orchestrator {
    config: Config,
    catalog: Arc<SeriesCatalog>,
    cancel: CancellationToken,
    workers: JoinSet<TickStats>,
}

impl Orchestrator {
    /// Build the shared catalog for `config`.
    pub fn new(config: Config) -> Self {
        let catalog = Arc::new(SeriesCatalog::from_config(&config));
        Self {
            config,
            catalog,
            cancel: CancellationToken::new(),
            workers: JoinSet::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<SeriesCatalog> {
        &self.catalog
    }

    /// Handle to the process-wide cancellation signal.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Number of workers that have not finished yet.
    pub fn running(&self) -> usize {
        self.workers.len()
    }

    /// Build every service's recorder, sink and scheduler, then spawn them.
    ///
    /// Nothing is spawned unless every service could be set up.
    pub async fn start(&mut self, sinks: &dyn SinkFactory) -> Result<()> {
        let schedulers = self.build_schedulers(sinks).await?;
        for scheduler in schedulers {
            self.workers.spawn(scheduler.run(self.cancel.clone()));
        }
        tracing::debug!(workers = self.workers.len(), "all services started");
        Ok(())
    }

    /// Construct the schedulers without spawning them.
    ///
    /// On failure, sinks already built for earlier services are shut down
    /// before the error is returned.
    pub async fn build_schedulers(&self, sinks: &dyn SinkFactory) -> Result<Vec<ServiceScheduler>> {
        let services = self.config.services;
        let interval = self.config.interval();

        let mut pipelines = Vec::with_capacity(services);
        for index in 0..services {
            match self.build_pipeline(ServiceName::for_index(index), sinks).await {
                Ok(pipeline) => pipelines.push(pipeline),
                Err(e) => {
                    for pipeline in pipelines {
                        let service = pipeline.service().clone();
                        if let Err(err) = pipeline.shutdown().await {
                            tracing::warn!(service = %service, "Failed to shut down exporter: {}", err);
                        }
                    }
                    return Err(e);
                },
            }
        }

        Ok(pipelines
            .into_iter()
            .enumerate()
            .map(|(index, pipeline)| {
                let offset = stagger_offset(index, services, interval);
                ServiceScheduler::new(pipeline, offset, interval)
            })
            .collect())
    }

    async fn build_pipeline(
        &self,
        service: ServiceName,
        sinks: &dyn SinkFactory,
    ) -> Result<ExportPipeline> {
        let recorder = GaugeRecorder::new(&service, &self.catalog)?;
        let sink = sinks.build(&service).await?;
        Ok(ExportPipeline::new(
            service,
            Arc::clone(&self.catalog),
            recorder,
            sink,
            self.config.export_timeout(),
        ))
    }

    /// Raise the cancellation signal for every worker.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Wait for workers to stop, aborting any still running after `grace`.
    pub async fn join(mut self, grace: Duration) -> Vec<TickStats> {
        let mut finished = Vec::with_capacity(self.workers.len());
        let deadline = tokio::time::sleep(grace);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                next = self.workers.join_next() => match next {
                    Some(Ok(stats)) => {
                        tracing::debug!(
                            service = %stats.service,
                            ticks = stats.ticks,
                            exported = stats.exported,
                            timed_out = stats.timed_out,
                            failed = stats.failed,
                            "worker stopped"
                        );
                        finished.push(stats);
                    },
                    Some(Err(e)) => tracing::error!("Worker task failed: {}", e),
                    None => break,
                },
                _ = &mut deadline => {
                    tracing::warn!(
                        remaining = self.workers.len(),
                        "Workers still running after {:?}, aborting",
                        grace
                    );
                    self.workers.shutdown().await;
                    break;
                }
            }
        }
        finished
    }
}
