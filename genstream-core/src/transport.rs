//! Seam between the stream lifecycle and the HTTP layer.
//!
//! The aggregation loop only needs "open one streaming request, hand me the
//! body chunks"; putting that behind a trait lets tests script exact chunk
//! sequences (boundary splits, mid-body errors, stalls) without a server.

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::http_client::HttpClient;
use crate::stream::ChunkStream;

#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// Open one streaming request. Connection failures and non-success
    /// statuses are `Err`; the stream itself carries mid-body read errors.
    async fn open(&self, path: &str, body: serde_json::Value) -> CoreResult<ChunkStream>;
}

/// reqwest-backed transport against a dashboard backend.
pub struct HttpTransport {
    http: HttpClient,
    base: String,
    headers: Vec<(String, String)>,
}

impl HttpTransport {
    pub fn new(http: HttpClient, base: impl Into<String>, headers: Vec<(String, String)>) -> Self {
        Self {
            http,
            base: base.into(),
            headers,
        }
    }
}

#[async_trait]
impl StreamTransport for HttpTransport {
    async fn open(&self, path: &str, body: serde_json::Value) -> CoreResult<ChunkStream> {
        let url = format!("{}{}", self.base, path);
        let hdrs: Vec<(&str, &str)> = self
            .headers
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        self.http.post_stream(&url, &body, &hdrs).await
    }
}
