//! Transports carry one encoded request to a dispatcher and bring back the reply.

use crate::config::{ProtocolConfig, RpcClientConfig};
use crate::error::{Result, RpcError};
use crate::rpc::{CallContext, Dispatcher};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use std::sync::Arc;
use tracing::debug;

/// Moves wire text to the server and returns the response text.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, body: String) -> Result<String>;
}

/// HTTP POST to a fixed endpoint.
pub struct HttpTransport {
    client: Client,
    url: String,
}

impl HttpTransport {
    /// Build a transport for `config.base_url` with the configured headers.
    ///
    /// The per-attempt deadline is enforced by the client, not by reqwest.
    pub fn new(config: &RpcClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static(ProtocolConfig::CONTENT_TYPE),
        );
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                RpcError::invalid_arguments(format!("Invalid header name '{}': {}", name, e))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                RpcError::invalid_arguments(format!("Invalid header value: {}", e))
            })?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .user_agent(ProtocolConfig::USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| {
                RpcError::connection_failed(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            url: config.base_url.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, body: String) -> Result<String> {
        let response = self
            .client
            .post(&self.url)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RpcError::timeout("Request timeout")
                } else {
                    RpcError::connection_failed(format!("Network error: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            debug!("POST {} returned {}", self.url, status);
            return Err(RpcError::network(format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            ))
            .with_status(status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| RpcError::connection_failed(format!("Network error: {}", e)))
    }
}

/// In-process transport that hands requests straight to a dispatcher.
///
/// Useful for tests and for embedding a server and its callers in one process.
pub struct LocalTransport {
    dispatcher: Arc<Dispatcher>,
    ctx: CallContext,
}

impl LocalTransport {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            ctx: CallContext::default(),
        }
    }

    pub fn with_context(mut self, ctx: CallContext) -> Self {
        self.ctx = ctx;
        self
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn send(&self, body: String) -> Result<String> {
        Ok(self.dispatcher.handle(&body, &self.ctx).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_transport_rejects_bad_header() {
        let config = RpcClientConfig::new().with_header("bad header", "x");
        let err = HttpTransport::new(&config).err().unwrap();
        assert_eq!(err.kind, crate::error::ErrorKind::InvalidArguments);
    }

    #[tokio::test]
    async fn test_connection_refused_is_connection_failed() {
        // Port 9 (discard) is closed on test machines.
        let config = RpcClientConfig::new().with_base_url("http://127.0.0.1:9/api/rpc");
        let transport = HttpTransport::new(&config).unwrap();
        let err = transport.send("{}".into()).await.unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::ConnectionFailed);
        assert_eq!(err.status_code, 0);
        assert!(err.message.starts_with("Network error:"));
    }
}
