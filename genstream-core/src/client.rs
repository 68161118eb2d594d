//! High-level client for the model-dashboard backend.
//!
//! Streaming endpoints (`/models/prompt/`, `/chatbot/ask`) go through the
//! frame decoder and reducer; one `StreamHandle` per request/response cycle.
//! The plain CRUD endpoints (`/models/`, `/models/load`) are simple JSON
//! calls with no internal state machine.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tokio_util::sync::CancellationToken;

use crate::aggregate::{Aggregated, TerminalStatus};
use crate::config::Config;
use crate::error::{CoreResult, GenStreamError};
use crate::http_client::HttpClient;
use crate::model::{ChatbotRequest, LoadRequest, ModelInfo, PromptRequest};
use crate::normalizer;
use crate::stream::{self, StreamHandle, TRANSPORT_ERROR};
use crate::transport::{HttpTransport, StreamTransport};

const PROMPT_PATH: &str = "/models/prompt/";
const ASK_PATH: &str = "/chatbot/ask";

#[derive(Clone)]
pub struct DashboardClient {
    http: HttpClient,
    base: String,
    auth: Option<SecretString>,
    transport: Arc<dyn StreamTransport>,
}

impl DashboardClient {
    pub fn new(http: HttpClient, base: impl Into<String>, auth: Option<SecretString>) -> Self {
        let base = base.into();
        let transport = Arc::new(HttpTransport::new(
            http.clone(),
            base.clone(),
            auth_headers(&auth),
        ));
        Self {
            http,
            base,
            auth,
            transport,
        }
    }

    /// Build from config; the bearer token, if configured, is read from the
    /// named environment variable.
    pub fn from_config(cfg: &Config) -> CoreResult<Self> {
        let http = HttpClient::from_cfg(&cfg.http)?;
        let auth = match &cfg.auth {
            Some(a) => match std::env::var(&a.token_env) {
                Ok(tok) => Some(SecretString::new(tok.into())),
                Err(_) => {
                    return Err(GenStreamError::Validation(format!(
                        "auth token env var '{}' is not set",
                        a.token_env
                    )));
                }
            },
            None => None,
        };
        Ok(Self::new(http, cfg.base_url.trim_end_matches('/'), auth))
    }

    /// Swap the streaming transport; the seam tests and embedders use to
    /// inject scripted chunk sequences.
    pub fn with_transport(mut self, transport: Arc<dyn StreamTransport>) -> Self {
        self.transport = transport;
        self
    }

    fn headers(&self) -> Vec<(String, String)> {
        auth_headers(&self.auth)
    }

    fn header_pairs(owned: &[(String, String)]) -> Vec<(&str, &str)> {
        owned
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    /// `GET {base}/models/`
    pub async fn list_models(&self) -> CoreResult<Vec<ModelInfo>> {
        let url = format!("{}/models/", self.base);
        let owned = self.headers();
        self.http.get_json(&url, &Self::header_pairs(&owned)).await
    }

    /// `POST {base}/models/load`; the backend's status payload is opaque.
    pub async fn load_model(&self, req: LoadRequest) -> CoreResult<serde_json::Value> {
        let url = format!("{}/models/load", self.base);
        let owned = self.headers();
        self.http
            .post_json(&url, &req, &Self::header_pairs(&owned))
            .await
    }

    /// Start a prompt stream against `/models/prompt/`.
    ///
    /// `on_update` fires once per decoded frame with the full accumulated
    /// text (or the server's error message as terminal content); `on_done`
    /// fires exactly once. Validation problems are reported synchronously.
    pub fn start_prompt<F, G>(
        &self,
        req: PromptRequest,
        on_update: F,
        on_done: G,
    ) -> CoreResult<StreamHandle>
    where
        F: FnMut(&str) + Send + 'static,
        G: FnOnce(TerminalStatus) + Send + 'static,
    {
        let req = normalizer::normalize_prompt(req)?;
        let body = serde_json::to_value(&req).map_err(|e| GenStreamError::Other(e.into()))?;
        Ok(self.spawn_stream(PROMPT_PATH, body, on_update, on_done))
    }

    /// Start a chatbot stream against `/chatbot/ask`.
    pub fn start_ask<F, G>(
        &self,
        question: impl Into<String>,
        on_update: F,
        on_done: G,
    ) -> CoreResult<StreamHandle>
    where
        F: FnMut(&str) + Send + 'static,
        G: FnOnce(TerminalStatus) + Send + 'static,
    {
        let req = normalizer::normalize_question(ChatbotRequest {
            question: question.into(),
        })?;
        let body = serde_json::to_value(&req).map_err(|e| GenStreamError::Other(e.into()))?;
        Ok(self.spawn_stream(ASK_PATH, body, on_update, on_done))
    }

    fn spawn_stream<F, G>(
        &self,
        path: &'static str,
        body: serde_json::Value,
        mut on_update: F,
        on_done: G,
    ) -> StreamHandle
    where
        F: FnMut(&str) + Send + 'static,
        G: FnOnce(TerminalStatus) + Send + 'static,
    {
        let transport = Arc::clone(&self.transport);
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            // the open itself must be abandonable, not just the body reads
            let opened = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                opened = transport.open(path, body) => Some(opened),
            };
            let result = match opened {
                None => Aggregated {
                    text: String::new(),
                    status: TerminalStatus::Cancelled,
                },
                Some(Ok(chunks)) => stream::aggregate(chunks, &token, &mut on_update).await,
                Some(Err(e)) => {
                    tracing::warn!(error = %e, path, "stream open failed");
                    Aggregated {
                        text: String::new(),
                        status: TerminalStatus::Failed(TRANSPORT_ERROR.into()),
                    }
                }
            };
            on_done(result.status.clone());
            result
        });
        StreamHandle::new(cancel, task)
    }
}

fn auth_headers(auth: &Option<SecretString>) -> Vec<(String, String)> {
    let mut h = vec![("Content-Type".to_string(), "application/json".to_string())];
    if let Some(tok) = auth {
        h.push((
            "Authorization".to_string(),
            format!("Bearer {}", tok.expose_secret()),
        ));
    }
    h
}
