//! firegen - synthetic OTLP metrics load generator.
//!
//! firegen fabricates a configurable number of gauge time series across a
//! configurable number of simulated services and pushes them to an OTLP
//! collector on a fixed cadence. The series count is exact and deterministic,
//! which makes it useful for stress-testing collection pipelines under a
//! known cardinality.
//!
//! # Architecture
//!
//! - `core`: configuration, domain types and errors
//! - `generator`: attribute enumeration, series catalog, per-service
//!   pipelines and schedulers, and the orchestrator
//! - `metrics`: in-process gauge instruments and batch snapshots
//! - `export`: OTLP/gRPC and OTLP/HTTP sinks
//! - `cli`: command-line interface
//!
//! # Example
//!
//! ```no_run
//! use firegen::core::ConfigBuilder;
//! use firegen::export::ExporterOptions;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigBuilder::new()
//!         .services(4)
//!         .metrics(10)
//!         .attribute("zone", 3)
//!         .build()?;
//!     let options = ExporterOptions {
//!         plaintext: true,
//!         ..Default::default()
//!     };
//!     firegen::cli::run(config, &options).await?;
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod cli;
pub mod core;
pub mod export;
pub mod generator;
pub mod metrics;

// Re-export core types for convenience
pub use crate::core::{Config, FiregenError, Result};
