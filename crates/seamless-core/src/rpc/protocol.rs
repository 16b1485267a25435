//! Request and response envelopes.
//!
//! ```text
//! request:  {"id": string, "method": string, "params": [..], "timestamp": number}
//! response: {"id": string, "result": value, "timestamp": number}
//!        or {"id": string, "error": {"code", "message", "statusCode", "serverStack"?, "context"?}, "timestamp": number}
//! ```
//!
//! Envelopes are converted to and from [`Value`] so that they go through the same
//! codec as the payloads they carry.

use crate::codec;
use crate::config::ProtocolConfig;
use crate::error::{ErrorKind, Result, RpcError};
use crate::value::{Map, Value};
use chrono::Utc;

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Fresh opaque request id.
pub fn generate_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// One call, as sent by the client.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestEnvelope {
    pub id: String,
    pub method: String,
    pub params: Vec<Value>,
    pub timestamp: i64,
}

impl RequestEnvelope {
    /// Create a request with a fresh id and the current time.
    pub fn new(method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            id: generate_request_id(),
            method: method.into(),
            params,
            timestamp: now_millis(),
        }
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("id".into(), Value::from(self.id.as_str()));
        map.insert("method".into(), Value::from(self.method.as_str()));
        map.insert("params".into(), Value::Array(self.params.clone()));
        map.insert("timestamp".into(), Value::from(self.timestamp));
        Value::Object(map)
    }

    /// Structural check of a decoded value.
    ///
    /// On failure returns the request id if one was recoverable.
    pub fn from_value(value: Value) -> std::result::Result<Self, Option<String>> {
        let Value::Object(mut map) = value else {
            return Err(None);
        };

        let id = match map.remove("id") {
            Some(Value::String(id)) => Some(id),
            _ => None,
        };
        let method = map.remove("method");
        let params = map.remove("params");
        let timestamp = map.remove("timestamp");

        match (id, method, params, timestamp) {
            (
                Some(id),
                Some(Value::String(method)),
                Some(Value::Array(params)),
                Some(Value::Number(timestamp)),
            ) => Ok(Self {
                id,
                method,
                params,
                timestamp: timestamp as i64,
            }),
            (id, ..) => Err(id),
        }
    }

    pub fn encode(&self) -> Result<String> {
        codec::encode(&self.to_value())
    }
}

/// Wire form of an error.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorPayload {
    pub code: ErrorKind,
    pub message: String,
    pub status_code: u16,
    pub server_stack: Option<String>,
    pub context: Option<Map>,
}

impl ErrorPayload {
    /// Build the wire form, dropping the diagnostic unless it may be exposed.
    pub fn from_error(error: &RpcError, expose_diagnostics: bool) -> Self {
        Self {
            code: error.kind,
            message: error.message.clone(),
            status_code: error.status_code,
            server_stack: if expose_diagnostics {
                error.server_diagnostic.clone()
            } else {
                None
            },
            context: error.context.clone(),
        }
    }

    pub fn into_error(self) -> RpcError {
        RpcError {
            kind: self.code,
            message: self.message,
            status_code: self.status_code,
            server_diagnostic: self.server_stack,
            context: self.context,
        }
    }

    fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("code".into(), Value::from(self.code.as_str()));
        map.insert("message".into(), Value::from(self.message.as_str()));
        map.insert("statusCode".into(), Value::from(self.status_code));
        if let Some(stack) = &self.server_stack {
            map.insert("serverStack".into(), Value::from(stack.as_str()));
        }
        if let Some(context) = &self.context {
            map.insert("context".into(), Value::Object(context.clone()));
        }
        Value::Object(map)
    }

    fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut map) = value else {
            return Err(malformed("error is not an object"));
        };

        let code = match map.remove("code") {
            Some(Value::String(code)) => ErrorKind::from_code(&code)
                .ok_or_else(|| malformed(&format!("unknown error code '{}'", code)))?,
            _ => return Err(malformed("error.code missing")),
        };
        let message = match map.remove("message") {
            Some(Value::String(message)) => message,
            _ => return Err(malformed("error.message missing")),
        };
        let status_code = match map.remove("statusCode") {
            Some(Value::Number(n)) if (0.0..=f64::from(u16::MAX)).contains(&n) => n as u16,
            _ => code.default_status(),
        };
        let server_stack = match map.remove("serverStack") {
            Some(Value::String(stack)) => Some(stack),
            _ => None,
        };
        let context = match map.remove("context") {
            Some(Value::Object(context)) => Some(context),
            _ => None,
        };

        Ok(Self {
            code,
            message,
            status_code,
            server_stack,
            context,
        })
    }
}

/// Exactly one of result or error; the envelope cannot hold both or neither.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Result(Value),
    Error(ErrorPayload),
}

/// The reply to one request.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEnvelope {
    pub id: String,
    pub outcome: Outcome,
    pub timestamp: i64,
}

impl ResponseEnvelope {
    pub fn success(id: impl Into<String>, result: Value) -> Self {
        Self {
            id: id.into(),
            outcome: Outcome::Result(result),
            timestamp: now_millis(),
        }
    }

    pub fn failure(id: impl Into<String>, error: &RpcError, expose_diagnostics: bool) -> Self {
        Self {
            id: id.into(),
            outcome: Outcome::Error(ErrorPayload::from_error(error, expose_diagnostics)),
            timestamp: now_millis(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Result(_))
    }

    /// Turn the envelope into the caller-facing result.
    pub fn into_result(self) -> Result<Value> {
        match self.outcome {
            Outcome::Result(value) => Ok(value),
            Outcome::Error(payload) => Err(payload.into_error()),
        }
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("id".into(), Value::from(self.id.as_str()));
        match &self.outcome {
            Outcome::Result(value) => {
                map.insert("result".into(), value.clone());
            }
            Outcome::Error(payload) => {
                map.insert("error".into(), payload.to_value());
            }
        }
        map.insert("timestamp".into(), Value::from(self.timestamp));
        Value::Object(map)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut map) = value else {
            return Err(malformed("response is not an object"));
        };

        let id = match map.remove("id") {
            Some(Value::String(id)) => id,
            _ => return Err(malformed("response id missing")),
        };
        let timestamp = match map.remove("timestamp") {
            Some(Value::Number(n)) => n as i64,
            _ => 0,
        };
        let outcome = match (map.remove("result"), map.remove("error")) {
            (Some(result), None) => Outcome::Result(result),
            (None, Some(error)) => Outcome::Error(ErrorPayload::from_value(error)?),
            (Some(_), Some(_)) => return Err(malformed("response has both result and error")),
            (None, None) => return Err(malformed("response has neither result nor error")),
        };

        Ok(Self {
            id,
            outcome,
            timestamp,
        })
    }

    pub fn encode(&self) -> Result<String> {
        codec::encode(&self.to_value())
    }

    pub fn decode(text: &str) -> Result<Self> {
        let value = codec::decode(text)?;
        Self::from_value(value).map_err(|e| e.with_context("json", codec::error_prefix(text)))
    }
}

fn malformed(reason: &str) -> RpcError {
    RpcError::deserialization(format!("Malformed response envelope: {}", reason))
}

impl Default for ResponseEnvelope {
    fn default() -> Self {
        Self::failure(
            ProtocolConfig::UNKNOWN_REQUEST_ID,
            &RpcError::internal("Unknown error occurred"),
            false,
        )
    }
}
