//! Seamless Core - runtime for calling server functions as if they were local.
//!
//! The crate holds everything the generated bindings call into:
//!
//! - [`Value`]: the grammar of values allowed on the wire
//! - [`codec`]: JSON encoding with a tagged envelope for timestamps
//! - [`RpcError`] / [`ErrorKind`]: the closed error taxonomy
//! - [`FunctionRegistry`] and [`Dispatcher`]: the server side
//! - [`RpcClient`] and the [`Transport`] implementations: the client side
//!
//! # Example
//!
//! ```rust,ignore
//! use seamless_core::{handler_fn, Dispatcher, FunctionRegistry, LocalTransport, RpcClient};
//! use std::sync::Arc;
//!
//! let registry = Arc::new(FunctionRegistry::new());
//! registry.register("api/math.double", handler_fn(|_ctx, params| async move {
//!     let n: f64 = params.arg(0, "n")?;
//!     Ok((n * 2.0).into())
//! }));
//!
//! let dispatcher = Arc::new(Dispatcher::new(registry, Default::default()));
//! let client = RpcClient::new(Arc::new(LocalTransport::new(dispatcher)), Default::default());
//! let four: f64 = client.call_typed("api/math.double", vec![2.into()]).await?;
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod network;
pub mod rpc;
pub mod value;

pub use config::{ProtocolConfig, RpcClientConfig, ServerConfig};
pub use error::{ErrorCategory, ErrorKind, Result, RpcError};
pub use network::{HttpTransport, LocalTransport, RetryConfig, Transport};
pub use rpc::{
    handler_fn, CallContext, DispatchReport, Dispatcher, FunctionRegistry, Params,
    RequestEnvelope, ResponseEnvelope, RpcClient, RpcFunction,
};
pub use value::{from_value, to_value, validate_serializable, Map, Timestamp, Value};

// Generated bindings name these through the core crate.
pub use anyhow;
pub use futures::future::BoxFuture;
