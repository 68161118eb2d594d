use std::time::Duration;

use futures_util::StreamExt;
use reqwest::{Client, StatusCode};
use serde::{Serialize, de::DeserializeOwned};

use crate::config::HttpCfg;
use crate::error::{CoreResult, GenStreamError};
use crate::stream::ChunkStream;

/// Thin wrapper around reqwest::Client with defaults and helpers.
///
/// The request timeout is applied per call on the plain JSON verbs only; a
/// streaming body may legitimately outlive any fixed deadline, so
/// `post_stream` relies on the connect timeout alone.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
    user_agent: String,
    request_timeout: Duration,
}

impl HttpClient {
    pub fn new_default() -> CoreResult<Self> {
        Self::from_cfg(&HttpCfg::default())
    }

    pub fn from_cfg(cfg: &HttpCfg) -> CoreResult<Self> {
        let mut builder =
            Client::builder().connect_timeout(Duration::from_millis(cfg.connect_timeout_ms));
        if let Some(n) = cfg.pool_max_idle_per_host {
            builder = builder.pool_max_idle_per_host(n);
        }
        let inner = builder
            .build()
            .map_err(|e| GenStreamError::Other(anyhow::anyhow!("http client build failed: {e}")))?;
        Ok(Self {
            inner,
            user_agent: "genstream/0.1".to_string(),
            request_timeout: Duration::from_millis(cfg.request_timeout_ms),
        })
    }

    pub async fn post_json<T: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        url: &str,
        body: &T,
        headers: &[(&str, &str)],
    ) -> CoreResult<R> {
        let mut req = self
            .inner
            .post(url)
            .json(body)
            .timeout(self.request_timeout)
            .header("User-Agent", &self.user_agent);
        for (k, v) in headers {
            req = req.header(*k, *v);
        }

        let resp = req.send().await.map_err(|e| {
            tracing::warn!(error = %e, url, "request failed to send");
            GenStreamError::Unreachable
        })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(map_http_error(status, &text));
        }

        resp.json::<R>().await.map_err(|e| GenStreamError::Http {
            status: status.as_u16(),
            message: format!("json decode error: {e}"),
        })
    }

    pub async fn get_json<R: DeserializeOwned>(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> CoreResult<R> {
        let mut req = self
            .inner
            .get(url)
            .timeout(self.request_timeout)
            .header("User-Agent", &self.user_agent);
        for (k, v) in headers {
            req = req.header(*k, *v);
        }

        let resp = req.send().await.map_err(|e| {
            tracing::warn!(error = %e, url, "request failed to send");
            GenStreamError::Unreachable
        })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(map_http_error(status, &text));
        }

        resp.json::<R>().await.map_err(|e| GenStreamError::Http {
            status: status.as_u16(),
            message: format!("json decode error: {e}"),
        })
    }

    /// POST JSON and return the response body as a raw chunk stream.
    ///
    /// Chunk boundaries are whatever the transport delivers; no delimiter
    /// alignment is guaranteed. Line reassembly belongs to the frame decoder.
    pub async fn post_stream<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
        headers: &[(&str, &str)],
    ) -> CoreResult<ChunkStream> {
        let mut req = self
            .inner
            .post(url)
            .json(body)
            .header("User-Agent", &self.user_agent)
            .header("Accept", "application/x-ndjson");
        for (k, v) in headers {
            req = req.header(*k, *v);
        }

        let resp = req.send().await.map_err(|e| {
            tracing::warn!(error = %e, url, "request failed to send");
            GenStreamError::Unreachable
        })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(map_http_error(status, &text));
        }

        let chunks = resp.bytes_stream().map(|item| {
            item.map_err(|e| {
                tracing::debug!(error = %e, "body read failed");
                GenStreamError::Interrupted
            })
        });
        Ok(Box::pin(chunks))
    }
}

fn map_http_error(status: StatusCode, body: &str) -> GenStreamError {
    GenStreamError::Http {
        status: status.as_u16(),
        message: truncate(body, 300),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    let mut t = s[..cut].to_string();
    t.push_str("...");
    t
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use httpmock::Method::{GET, POST};
    use httpmock::MockServer;
    use serde_json::json;

    #[tokio::test]
    async fn post_json_success() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(POST)
                .path("/models/load")
                .header("Authorization", "Bearer tok");
            then.status(200).json_body(json!({"ok": true}));
        });

        #[derive(serde::Deserialize)]
        struct Resp {
            ok: bool,
        }

        let client = HttpClient::new_default().unwrap();
        let resp: Resp = client
            .post_json(
                &format!("{}/models/load", server.base_url()),
                &json!({"model_name":"m"}),
                &[("Authorization", "Bearer tok")],
            )
            .await
            .unwrap();
        assert!(resp.ok);
        m.assert();
    }

    #[tokio::test]
    async fn get_json_success() {
        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(GET).path("/models/");
            then.status(200).json_body(json!([{"name":"granite"}]));
        });
        let client = HttpClient::new_default().unwrap();
        let models: Vec<serde_json::Value> = client
            .get_json(&format!("{}/models/", server.base_url()), &[])
            .await
            .unwrap();
        assert_eq!(models.len(), 1);
    }

    #[tokio::test]
    async fn non_success_status_maps_to_http_error() {
        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(POST).path("/models/load");
            then.status(503).body("down");
        });
        let client = HttpClient::new_default().unwrap();
        let err = client
            .post_json::<_, serde_json::Value>(
                &format!("{}/models/load", server.base_url()),
                &json!({}),
                &[],
            )
            .await
            .unwrap_err();
        match err {
            GenStreamError::Http { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "down");
            }
            other => panic!("expected Http, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn long_error_body_is_truncated() {
        let server = MockServer::start();
        let big = "x".repeat(1000);
        let _m = server.mock(|when, then| {
            when.method(POST).path("/models/load");
            then.status(400).body(big);
        });
        let client = HttpClient::new_default().unwrap();
        let err = client
            .post_json::<_, serde_json::Value>(
                &format!("{}/models/load", server.base_url()),
                &json!({}),
                &[],
            )
            .await
            .unwrap_err();
        match err {
            GenStreamError::Http { message, .. } => {
                assert!(message.ends_with("..."));
                assert!(message.len() <= 303);
            }
            other => panic!("expected Http, got: {other:?}"),
        }
    }

    #[test]
    fn truncate_backs_off_to_a_char_boundary() {
        // byte 300 of this body falls inside an é
        let body = format!("a{}", "é".repeat(200));
        let t = truncate(&body, 300);
        assert!(t.ends_with("..."));
        assert!(t.len() <= 303);
        assert!(t.chars().all(|c| c == 'a' || c == 'é' || c == '.'));
    }

    #[tokio::test]
    async fn bad_json_maps_to_http_error_with_status() {
        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(GET).path("/models/");
            then.status(200).body("not-json");
        });
        let client = HttpClient::new_default().unwrap();
        let err = client
            .get_json::<serde_json::Value>(&format!("{}/models/", server.base_url()), &[])
            .await
            .unwrap_err();
        match err {
            GenStreamError::Http { status, message } => {
                assert_eq!(status, 200);
                assert!(message.starts_with("json decode error"));
            }
            other => panic!("expected Http, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn network_error_maps_to_unreachable() {
        // port 9 (discard) is typically closed
        let client = HttpClient::new_default().unwrap();
        let err = client
            .post_json::<_, serde_json::Value>("http://127.0.0.1:9/models/load", &json!({}), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, GenStreamError::Unreachable));
    }

    #[tokio::test]
    async fn post_stream_yields_body_bytes() {
        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(POST).path("/models/prompt/");
            then.status(200)
                .header("content-type", "application/x-ndjson")
                .body("{\"response\":\"a\"}\n{\"response\":\"b\"}\n");
        });
        let client = HttpClient::new_default().unwrap();
        let mut chunks = client
            .post_stream(
                &format!("{}/models/prompt/", server.base_url()),
                &json!({"model_name":"m","prompt_text":"p"}),
                &[],
            )
            .await
            .unwrap();
        let mut collected = Vec::new();
        while let Some(item) = chunks.next().await {
            collected.extend_from_slice(&item.unwrap());
        }
        assert_eq!(
            collected,
            b"{\"response\":\"a\"}\n{\"response\":\"b\"}\n".to_vec()
        );
    }

    #[tokio::test]
    async fn post_stream_non_success_is_err_before_streaming() {
        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(POST).path("/models/prompt/");
            then.status(500).body("boom");
        });
        let client = HttpClient::new_default().unwrap();
        let err = match client
            .post_stream(
                &format!("{}/models/prompt/", server.base_url()),
                &json!({}),
                &[],
            )
            .await
        {
            Ok(_) => panic!("expected an http error"),
            Err(e) => e,
        };
        assert!(matches!(err, GenStreamError::Http { status: 500, .. }));
    }
}
