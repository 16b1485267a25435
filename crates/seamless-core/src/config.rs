//! Centralized configuration for the RPC runtime.
//!
//! Protocol constants live on [`ProtocolConfig`]; per-instance settings are plain
//! option structs built by the caller and handed to the component that uses them.

use std::collections::BTreeMap;
use std::time::Duration;

/// Wire protocol constants.
pub struct ProtocolConfig;

impl ProtocolConfig {
    pub const RPC_ENDPOINT: &'static str = "/api/rpc";
    pub const CONTENT_TYPE: &'static str = "application/json";
    pub const USER_AGENT: &'static str = "seamless-rpc/0.6";
    /// Id used in responses when no request id could be recovered.
    pub const UNKNOWN_REQUEST_ID: &'static str = "unknown";
    /// Tag key and value of the timestamp envelope `{"__type": "Date", "value": ...}`.
    pub const TYPE_TAG_KEY: &'static str = "__type";
    pub const DATE_TYPE_TAG: &'static str = "Date";
    pub const TYPE_VALUE_KEY: &'static str = "value";
    /// Characters of offending wire text kept in a decode error's context.
    pub const MAX_ERROR_CONTEXT_CHARS: usize = 100;
    /// Deepest nesting a value may have before it is rejected.
    pub const MAX_VALUE_DEPTH: usize = 64;
}

/// RPC client configuration.
#[derive(Debug, Clone)]
pub struct RpcClientConfig {
    /// Absolute URL of the RPC endpoint (used by the HTTP transport).
    pub base_url: String,
    /// Per-attempt timeout.
    pub timeout: Duration,
    /// Additional attempts after the first one for retryable failures.
    pub retry_attempts: u32,
    /// Base backoff delay; attempt `n` waits `retry_delay * 2^n`.
    pub retry_delay: Duration,
    /// Extra headers sent with every request.
    pub headers: BTreeMap<String, String>,
}

impl Default for RpcClientConfig {
    fn default() -> Self {
        Self {
            base_url: format!("http://127.0.0.1:3000{}", ProtocolConfig::RPC_ENDPOINT),
            timeout: Duration::from_secs(30),
            retry_attempts: 3,
            retry_delay: Duration::from_millis(1000),
            headers: BTreeMap::new(),
        }
    }
}

impl RpcClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Dispatcher configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    /// Put server diagnostics (error chains, panic messages) on the wire.
    pub expose_diagnostics: bool,
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_diagnostics(mut self, enabled: bool) -> Self {
        self.expose_diagnostics = enabled;
        self
    }
}
