//! Server-side dispatcher.
//!
//! One request text in, one response text out. Each request walks
//!
//! ```text
//! RECEIVED -> DECODED -> VALIDATED -> RESOLVED -> EXECUTING -> SUCCEEDED | FAILED -> ENCODED
//! ```
//!
//! and every path ends in exactly one encoded [`ResponseEnvelope`]. Nothing the
//! invoked function does (errors, panics, bad return values) escapes `handle`.

use super::protocol::{RequestEnvelope, ResponseEnvelope};
use super::registry::{CallContext, FunctionRegistry, Params};
use crate::codec;
use crate::config::{ProtocolConfig, ServerConfig};
use crate::error::RpcError;
use crate::value::validate_serializable;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Last-resort response when even the error envelope cannot be encoded.
const FALLBACK_RESPONSE: &str = r#"{"id":"unknown","error":{"code":"SERIALIZATION_ERROR","message":"Failed to encode response","statusCode":500},"timestamp":0}"#;

/// What happened to one request, for hosts that log or meter calls.
#[derive(Debug, Clone)]
pub struct DispatchReport {
    /// Method named by the request, when the envelope got that far.
    pub method: Option<String>,
    pub response: ResponseEnvelope,
    pub elapsed: Duration,
}

/// Resolves requests against a [`FunctionRegistry`].
pub struct Dispatcher {
    registry: Arc<FunctionRegistry>,
    config: ServerConfig,
}

impl Dispatcher {
    pub fn new(registry: Arc<FunctionRegistry>, config: ServerConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &Arc<FunctionRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Process one request text and return the encoded response. Never fails.
    pub async fn handle(&self, text: &str, ctx: &CallContext) -> String {
        let report = self.dispatch(text, ctx).await;
        self.encode_response(&report.response)
    }

    /// Process one request text, returning the response envelope unencoded.
    pub async fn dispatch(&self, text: &str, ctx: &CallContext) -> DispatchReport {
        let started = Instant::now();
        let mut method = None;
        let response = self.run(text, ctx, &mut method).await;
        DispatchReport {
            method,
            response,
            elapsed: started.elapsed(),
        }
    }

    /// Encode a response envelope, degrading to a serialization error envelope
    /// and finally to a fixed text if encoding keeps failing.
    pub fn encode_response(&self, response: &ResponseEnvelope) -> String {
        match response.encode() {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to encode response {}: {}", response.id, e);
                let fallback = ResponseEnvelope::failure(
                    response.id.clone(),
                    &RpcError::serialization("Failed to encode response"),
                    false,
                );
                fallback
                    .encode()
                    .unwrap_or_else(|_| FALLBACK_RESPONSE.to_string())
            }
        }
    }

    async fn run(
        &self,
        text: &str,
        ctx: &CallContext,
        method_out: &mut Option<String>,
    ) -> ResponseEnvelope {
        // RECEIVED -> DECODED
        let decoded = match codec::decode(text) {
            Ok(value) => value,
            Err(e) => {
                debug!("Request decode failed: {}", e.message);
                let err = RpcError::deserialization("Invalid request format")
                    .with_diagnostic(e.message)
                    .with_context("json", codec::error_prefix(text));
                return self.fail(ProtocolConfig::UNKNOWN_REQUEST_ID, &err);
            }
        };

        // DECODED -> VALIDATED
        let request = match RequestEnvelope::from_value(decoded) {
            Ok(request) => request,
            Err(id) => {
                let id = id.unwrap_or_else(|| ProtocolConfig::UNKNOWN_REQUEST_ID.to_string());
                debug!("Request {} has an invalid envelope shape", id);
                return self.fail(id, &RpcError::invalid_arguments("Invalid request structure"));
            }
        };
        *method_out = Some(request.method.clone());

        // VALIDATED -> RESOLVED
        let Some(function) = self.registry.get(&request.method) else {
            debug!("Request {}: no function {}", request.id, request.method);
            return self.fail(request.id, &RpcError::not_found(&request.method));
        };

        // RESOLVED -> EXECUTING
        if let Some(index) = request.params.iter().position(|p| !validate_serializable(p)) {
            debug!(
                "Request {}: parameter {} of {} is not serializable",
                request.id, index, request.method
            );
            let err = RpcError::unsupported_type("Invalid parameter types")
                .with_context("parameterIndex", index);
            return self.fail(request.id, &err);
        }

        debug!("Request {}: invoking {}", request.id, request.method);
        let call = function.call(ctx.clone(), Params::new(request.params));
        let outcome = AssertUnwindSafe(call).catch_unwind().await;

        match outcome {
            // EXECUTING -> SUCCEEDED
            Ok(Ok(result)) => {
                if !validate_serializable(&result) {
                    warn!(
                        "Request {}: {} returned a non-serializable value",
                        request.id, request.method
                    );
                    let err = RpcError::serialization("Function returned non-serializable value");
                    return self.fail(request.id, &err);
                }
                debug!("Request {}: {} succeeded", request.id, request.method);
                ResponseEnvelope::success(request.id, result)
            }
            // EXECUTING -> FAILED
            Ok(Err(e)) => {
                let err = classify(e);
                debug!("Request {}: {} failed: {}", request.id, request.method, err);
                self.fail(request.id, &err)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("Request {}: {} panicked: {}", request.id, request.method, message);
                let err = RpcError::internal(message.clone())
                    .with_diagnostic(format!("panic in {}: {}", request.method, message));
                self.fail(request.id, &err)
            }
        }
    }

    fn fail(&self, id: impl Into<String>, err: &RpcError) -> ResponseEnvelope {
        ResponseEnvelope::failure(id, err, self.config.expose_diagnostics)
    }
}

/// Structured errors anywhere in the chain pass through; anything else is internal.
fn classify(error: anyhow::Error) -> RpcError {
    if let Some(rpc) = error
        .chain()
        .find_map(|cause| cause.downcast_ref::<RpcError>())
    {
        return rpc.clone();
    }
    RpcError::internal(error.to_string()).with_diagnostic(format!("{:?}", error))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Function panicked".to_string()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish()
    }
}
