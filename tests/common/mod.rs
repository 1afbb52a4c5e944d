//! Common test utilities and fixtures.

#![allow(dead_code)]

use async_trait::async_trait;
use firegen::core::{FiregenError, Result, ServiceName};
use firegen::export::{MetricSink, SinkFactory};
use firegen::metrics::MetricBatch;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// What a sink saw, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    ExportStarted { service: String, at: Instant },
    ExportFinished { service: String, points: usize, at: Instant },
    Shutdown { service: String },
}

/// Shared journal of sink events across all services.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<SinkEvent>>>);

impl Journal {
    pub fn push(&self, event: SinkEvent) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.0.lock().unwrap().clone()
    }

    pub fn finished_for(&self, service: &str) -> Vec<(usize, Instant)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SinkEvent::ExportFinished { service: s, points, at } if s == service => {
                    Some((points, at))
                },
                _ => None,
            })
            .collect()
    }

    pub fn started_for(&self, service: &str) -> Vec<Instant> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SinkEvent::ExportStarted { service: s, at } if s == service => Some(at),
                _ => None,
            })
            .collect()
    }

    pub fn shutdowns(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SinkEvent::Shutdown { service } => Some(service),
                _ => None,
            })
            .collect()
    }
}

/// How a [`TestSink`] behaves on export.
#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    Accept,
    Stall(Duration),
    Fail,
}

/// Sink that journals every call.
pub struct TestSink {
    service: String,
    journal: Journal,
    behavior: Behavior,
}

impl TestSink {
    pub fn new(service: &ServiceName, journal: Journal, behavior: Behavior) -> Self {
        Self {
            service: service.to_string(),
            journal,
            behavior,
        }
    }
}

#[async_trait]
impl MetricSink for TestSink {
    async fn export(&self, batch: MetricBatch, _deadline: Duration) -> Result<()> {
        self.journal.push(SinkEvent::ExportStarted {
            service: self.service.clone(),
            at: Instant::now(),
        });

        match self.behavior {
            Behavior::Accept => {},
            Behavior::Stall(delay) => tokio::time::sleep(delay).await,
            Behavior::Fail => {
                return Err(FiregenError::Grpc(tonic::Status::unavailable("collector down")))
            },
        }

        self.journal.push(SinkEvent::ExportFinished {
            service: self.service.clone(),
            points: batch.point_count(),
            at: Instant::now(),
        });
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        self.journal.push(SinkEvent::Shutdown {
            service: self.service.clone(),
        });
        Ok(())
    }
}

/// Factory handing every service a [`TestSink`] with the same behavior.
pub struct TestSinkFactory {
    pub journal: Journal,
    pub behavior: Behavior,
    pub fail_for: Option<String>,
}

impl TestSinkFactory {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            journal: Journal::default(),
            behavior,
            fail_for: None,
        }
    }

    pub fn failing_for(mut self, service: &str) -> Self {
        self.fail_for = Some(service.to_string());
        self
    }
}

#[async_trait]
impl SinkFactory for TestSinkFactory {
    async fn build(&self, service: &ServiceName) -> Result<Box<dyn MetricSink>> {
        if self.fail_for.as_deref() == Some(service.as_str()) {
            return Err(FiregenError::setup(format!(
                "Failed to create OTLP exporter for service {service}"
            )));
        }
        Ok(Box::new(TestSink::new(service, self.journal.clone(), self.behavior)))
    }
}
