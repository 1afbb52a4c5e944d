//! OTLP/HTTP metrics sink.
//!
//! Posts protobuf-encoded `ExportMetricsServiceRequest` bodies to
//! `<endpoint>/v1/metrics`.

use super::{ExporterOptions, MetricSink};
use crate::core::{FiregenError, Result};
use crate::metrics::MetricBatch;
use async_trait::async_trait;
use prost::Message;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Url};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// OTLP/HTTP metrics path
pub const METRICS_PATH: &str = "/v1/metrics";

/// Longest response body kept in an error message.
const MAX_ERROR_BODY: usize = 256;

/// Sends batches as protobuf over HTTP.
pub struct HttpSink {
    client: Client,
    url: Url,
    authorization: Option<String>,
    closed: AtomicBool,
}

impl HttpSink {
    /// Build the client and validate the URL.
    pub fn new(options: &ExporterOptions) -> Result<Self> {
        let base = options.base_url()?;
        let url = Url::parse(&format!("{base}{METRICS_PATH}"))
            .map_err(|e| FiregenError::invalid_endpoint(format!("{base}: {e}")))?;
        if url.host_str().is_none() {
            return Err(FiregenError::invalid_endpoint(format!("{base}: missing host")));
        }

        let client = Client::builder()
            .user_agent(concat!("firegen/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            url,
            authorization: options.auth.header_value(),
            closed: AtomicBool::new(false),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl MetricSink for HttpSink {
    async fn export(&self, batch: MetricBatch, deadline: Duration) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(FiregenError::SinkClosed);
        }

        let body = batch.into_request().encode_to_vec();
        let mut request = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/x-protobuf")
            .timeout(deadline)
            .body(body);
        if let Some(authorization) = &self.authorization {
            request = request.header(AUTHORIZATION, authorization);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        Err(FiregenError::HttpStatus {
            status: status.as_u16(),
            body,
        })
    }

    async fn shutdown(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(FiregenError::SinkClosed);
        }
        Ok(())
    }
}
