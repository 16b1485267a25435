//! RPC client.
//!
//! A call builds one request envelope, encodes it once, and sends it through the
//! configured [`Transport`] under a per-attempt timeout. Transport failures
//! (`NETWORK_ERROR`, `TIMEOUT`, `CONNECTION_FAILED`) are retried with exponential
//! backoff; every other error is returned as soon as it is seen.
//!
//! All attempts of one call share the same request id, so a server can observe
//! the same id more than once. Handlers for non-idempotent operations must treat
//! delivery as at-least-once.

use super::protocol::{RequestEnvelope, ResponseEnvelope};
use crate::config::RpcClientConfig;
use crate::error::{Result, RpcError};
use crate::network::{retry_async, HttpTransport, RetryConfig, Transport};
use crate::value::{from_value, validate_serializable, Value};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

/// Client for one RPC endpoint.
#[derive(Clone)]
pub struct RpcClient {
    transport: Arc<dyn Transport>,
    config: RpcClientConfig,
}

impl RpcClient {
    pub fn new(transport: Arc<dyn Transport>, config: RpcClientConfig) -> Self {
        Self { transport, config }
    }

    /// Client over HTTP to `config.base_url`.
    pub fn http(config: RpcClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::new(Arc::new(transport), config))
    }

    pub fn config(&self) -> &RpcClientConfig {
        &self.config
    }

    /// Invoke `method` with positional `params` and return its result.
    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value> {
        if let Some(index) = params.iter().position(|p| !validate_serializable(p)) {
            return Err(RpcError::unsupported_type(format!(
                "Parameter {} of {} is not serializable",
                index, method
            ))
            .with_context("parameterIndex", index));
        }

        let request = RequestEnvelope::new(method, params);
        let body = request.encode()?;
        let policy = RetryConfig::from_client(&self.config);

        debug!("RPC call {} (request {})", method, request.id);

        let request_id = request.id.as_str();
        let (result, stats) = retry_async(&policy, |attempt| {
            let body = body.clone();
            async move {
                if attempt > 0 {
                    debug!("Retrying {} (attempt {})", request_id, attempt + 1);
                }
                self.attempt(body).await
            }
        })
        .await;

        if stats.attempts > 1 {
            debug!(
                "RPC call {} finished after {} attempts ({:?} backoff)",
                method, stats.attempts, stats.total_delay
            );
        }
        result
    }

    /// Invoke `method` and deserialize the result into `T`.
    pub async fn call_typed<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T> {
        let value = self.call(method, params).await?;
        from_value(value).map_err(|e| {
            RpcError::deserialization(format!(
                "Result of {} does not match the declared type: {}",
                method, e.message
            ))
        })
    }

    async fn attempt(&self, body: String) -> Result<Value> {
        let text = tokio::time::timeout(self.config.timeout, self.transport.send(body))
            .await
            .map_err(|_| RpcError::timeout("Request timeout"))??;

        ResponseEnvelope::decode(&text)?.into_result()
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("config", &self.config)
            .finish()
    }
}
