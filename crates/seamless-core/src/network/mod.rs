//! Transports and retry policy used by the client.

mod retry;
mod transport;

pub use retry::{retry_async, RetryConfig, RetryStats};
pub use transport::{HttpTransport, LocalTransport, Transport};
