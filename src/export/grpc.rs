//! OTLP/gRPC metrics sink.

use super::{ExporterOptions, MetricSink};
use crate::core::{FiregenError, Result};
use crate::metrics::MetricBatch;
use async_trait::async_trait;
use opentelemetry_proto::tonic::collector::metrics::v1::metrics_service_client::MetricsServiceClient;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tonic::metadata::{Ascii, MetadataValue};
use tonic::transport::{Channel, ClientTlsConfig, Endpoint};

/// How long startup waits for the collector to accept a connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Sends batches through the OTLP `MetricsService/Export` RPC.
pub struct GrpcSink {
    client: MetricsServiceClient<Channel>,
    authorization: Option<MetadataValue<Ascii>>,
    closed: AtomicBool,
}

impl GrpcSink {
    /// Connect eagerly so an unreachable collector fails at startup.
    pub async fn connect(options: &ExporterOptions) -> Result<Self> {
        let endpoint = Self::endpoint(options)?;
        let channel = endpoint.connect().await?;
        Self::with_channel(channel, options)
    }

    /// Build a sink over an existing channel.
    pub fn with_channel(channel: Channel, options: &ExporterOptions) -> Result<Self> {
        let authorization = options
            .auth
            .header_value()
            .map(|value| {
                value.parse::<MetadataValue<Ascii>>().map_err(|_| {
                    FiregenError::config("credentials contain characters not allowed in metadata")
                })
            })
            .transpose()?;

        Ok(Self {
            client: MetricsServiceClient::new(channel),
            authorization,
            closed: AtomicBool::new(false),
        })
    }

    fn endpoint(options: &ExporterOptions) -> Result<Endpoint> {
        let url = options.base_url()?;
        let mut endpoint = Endpoint::from_shared(url.clone())
            .map_err(|e| FiregenError::invalid_endpoint(format!("{url}: {e}")))?
            .connect_timeout(CONNECT_TIMEOUT);

        if url.starts_with("https://") {
            endpoint = endpoint.tls_config(ClientTlsConfig::new().with_native_roots())?;
        }
        Ok(endpoint)
    }
}

#[async_trait]
impl MetricSink for GrpcSink {
    async fn export(&self, batch: MetricBatch, deadline: Duration) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(FiregenError::SinkClosed);
        }

        let mut request = tonic::Request::new(batch.into_request());
        request.set_timeout(deadline);
        if let Some(authorization) = &self.authorization {
            request
                .metadata_mut()
                .insert("authorization", authorization.clone());
        }

        // tonic clients are cheap handles over the shared channel
        let mut client = self.client.clone();
        let response = client.export(request).await?.into_inner();

        if let Some(partial) = response.partial_success {
            if partial.rejected_data_points > 0 {
                tracing::warn!(
                    rejected = partial.rejected_data_points,
                    "Collector rejected data points: {}",
                    partial.error_message
                );
            }
        }
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(FiregenError::SinkClosed);
        }
        Ok(())
    }
}
