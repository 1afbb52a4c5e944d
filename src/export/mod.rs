//! Sinks that ship metric batches to an OTLP collector.
//!
//! The generator only sees the [`MetricSink`] trait. Concrete transports are
//! OTLP/gRPC ([`grpc::GrpcSink`]) and OTLP/HTTP with protobuf bodies
//! ([`http::HttpSink`]), both built from [`ExporterOptions`].

pub mod grpc;
pub mod http;

use crate::core::{FiregenError, Result, ServiceName};
use crate::metrics::MetricBatch;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::time::Duration;

/// Default collector address, OTLP/gRPC port.
pub const DEFAULT_ENDPOINT: &str = "localhost:4317";

/// Destination for collected batches.
#[async_trait]
pub trait MetricSink: Send + Sync {
    /// Ship one batch. `deadline` is advisory for the transport; callers also
    /// bound the call themselves.
    async fn export(&self, batch: MetricBatch, deadline: Duration) -> Result<()>;

    /// Release transport resources. Called once per service at teardown.
    async fn shutdown(&self) -> Result<()>;
}

/// Builds one sink per simulated service.
#[async_trait]
pub trait SinkFactory: Send + Sync {
    async fn build(&self, service: &ServiceName) -> Result<Box<dyn MetricSink>>;
}

/// OTLP transport flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    #[default]
    Grpc,
    Http,
}

/// Credentials attached to every export
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Auth {
    #[default]
    None,
    Bearer(String),
    Basic { username: String, password: String },
}

impl Auth {
    /// Pick credentials: a token wins, then a complete username/password pair.
    pub fn from_parts(token: Option<&str>, username: Option<&str>, password: Option<&str>) -> Self {
        match (token, username, password) {
            (Some(token), _, _) if !token.is_empty() => Auth::Bearer(token.to_string()),
            (_, Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Auth::Basic {
                    username: username.to_string(),
                    password: password.to_string(),
                }
            },
            _ => Auth::None,
        }
    }

    /// Value of the `authorization` header, if any.
    pub fn header_value(&self) -> Option<String> {
        match self {
            Auth::None => None,
            Auth::Bearer(token) => Some(format!("Bearer {token}")),
            Auth::Basic { username, password } => {
                Some(format!("Basic {}", STANDARD.encode(format!("{username}:{password}"))))
            },
        }
    }
}

/// Everything needed to reach the collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExporterOptions {
    /// `host:port` or a full URL
    pub endpoint: String,
    /// Use plaintext instead of TLS
    pub plaintext: bool,
    /// Transport flavor
    pub protocol: Protocol,
    /// Credentials
    pub auth: Auth,
}

impl Default for ExporterOptions {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            plaintext: false,
            protocol: Protocol::Grpc,
            auth: Auth::None,
        }
    }
}

impl ExporterOptions {
    /// Endpoint as a URL, adding a scheme when the endpoint has none.
    pub fn base_url(&self) -> Result<String> {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            return Err(FiregenError::invalid_endpoint("endpoint cannot be empty"));
        }

        if let Some((scheme, rest)) = endpoint.split_once("://") {
            if !matches!(scheme, "http" | "https") || rest.is_empty() {
                return Err(FiregenError::invalid_endpoint(format!(
                    "unsupported endpoint '{endpoint}'"
                )));
            }
            return Ok(endpoint.trim_end_matches('/').to_string());
        }

        let scheme = if self.plaintext { "http" } else { "https" };
        Ok(format!("{scheme}://{}", endpoint.trim_end_matches('/')))
    }

    /// Create a sink for the configured protocol.
    pub async fn build_sink(&self) -> Result<Box<dyn MetricSink>> {
        match self.protocol {
            Protocol::Grpc => Ok(Box::new(grpc::GrpcSink::connect(self).await?)),
            Protocol::Http => Ok(Box::new(http::HttpSink::new(self)?)),
        }
    }
}

#[async_trait]
impl SinkFactory for ExporterOptions {
    async fn build(&self, service: &ServiceName) -> Result<Box<dyn MetricSink>> {
        let sink = self.build_sink().await.map_err(|e| {
            FiregenError::setup(format!("Failed to create OTLP exporter for service {service}: {e}"))
        })?;
        tracing::debug!(service = %service, protocol = ?self.protocol, "exporter ready");
        Ok(sink)
    }
}
