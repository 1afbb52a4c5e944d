//! Per-service timer loop.
//!
//! ```text
//! Idle -> Offsetting -> Ticking -> Stopped
//!            |                        ^
//!            +------ cancelled -------+
//! ```

use crate::core::ServiceName;
use crate::generator::pipeline::{ExportPipeline, TickOutcome};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Lifecycle of one service worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Offsetting,
    Ticking,
    Stopped,
}

/// Delay before the first tick of service `index` out of `count`.
///
/// Spreads first ticks evenly across one interval: `interval * index / count`.
pub fn stagger_offset(index: usize, count: usize, interval: Duration) -> Duration {
    if count == 0 || index == 0 {
        return Duration::ZERO;
    }
    #[allow(clippy::cast_precision_loss)]
    let share = index.min(count - 1) as f64 / count as f64;
    interval.mul_f64(share)
}

/// Per-worker counters returned when the loop stops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickStats {
    pub service: ServiceName,
    pub ticks: u64,
    pub exported: u64,
    pub timed_out: u64,
    pub failed: u64,
}

impl TickStats {
    fn new(service: ServiceName) -> Self {
        Self {
            service,
            ticks: 0,
            exported: 0,
            timed_out: 0,
            failed: 0,
        }
    }

    fn observe(&mut self, outcome: &TickOutcome) {
        match outcome {
            TickOutcome::Exported { .. } => self.exported += 1,
            TickOutcome::TimedOut { .. } => self.timed_out += 1,
            TickOutcome::Failed(_) => self.failed += 1,
            TickOutcome::Cancelled => return,
        }
        self.ticks += 1;
    }
}

/// Drives one pipeline: stagger sleep, an immediate tick, then a tick every
/// interval until cancelled. Ticks never overlap.
pub struct ServiceScheduler {
    pipeline: ExportPipeline,
    offset: Duration,
    interval: Duration,
    state: watch::Sender<SchedulerState>,
}

impl ServiceScheduler {
    pub fn new(pipeline: ExportPipeline, offset: Duration, interval: Duration) -> Self {
        let (state, _) = watch::channel(SchedulerState::Idle);
        Self {
            pipeline,
            offset,
            interval,
            state,
        }
    }

    pub fn service(&self) -> &ServiceName {
        self.pipeline.service()
    }

    pub fn offset(&self) -> Duration {
        self.offset
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    /// Run until `cancel` fires, then release the sink.
    pub async fn run(self, cancel: CancellationToken) -> TickStats {
        let Self {
            mut pipeline,
            offset,
            interval,
            state,
        } = self;
        let mut stats = TickStats::new(pipeline.service().clone());

        transition(&state, &stats.service, SchedulerState::Offsetting);
        if wait_offset(offset, &cancel).await {
            transition(&state, &stats.service, SchedulerState::Ticking);
            tick_loop(&mut pipeline, interval, &cancel, &mut stats).await;
        }
        transition(&state, &stats.service, SchedulerState::Stopped);

        if let Err(e) = pipeline.shutdown().await {
            tracing::warn!(service = %stats.service, "Failed to shut down exporter: {}", e);
        }
        stats
    }
}

/// Sleep for the stagger offset. Returns `false` if cancelled first.
async fn wait_offset(offset: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(offset) => true,
    }
}

async fn tick_loop(
    pipeline: &mut ExportPipeline,
    interval: Duration,
    cancel: &CancellationToken,
    stats: &mut TickStats,
) {
    let outcome = pipeline.tick(cancel).await;
    stats.observe(&outcome);

    // Armed after the first tick returns; slow ticks skip missed firings.
    let Some(start) = Instant::now().checked_add(interval) else {
        tracing::warn!(
            service = %stats.service,
            "Interval {:?} is out of range, no further ticks",
            interval
        );
        cancel.cancelled().await;
        return;
    };
    let mut timer = interval_at(start, interval);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = timer.tick() => {
                if cancel.is_cancelled() {
                    break;
                }
                let outcome = pipeline.tick(cancel).await;
                stats.observe(&outcome);
            }
        }
    }
}

fn transition(state: &watch::Sender<SchedulerState>, service: &ServiceName, next: SchedulerState) {
    let previous = state.send_replace(next);
    tracing::debug!(service = %service, "scheduler {:?} -> {:?}", previous, next);
}
