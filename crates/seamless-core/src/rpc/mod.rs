//! Request/response protocol, function registry, dispatcher and client.

mod client;
mod protocol;
mod registry;
mod server;

pub use client::RpcClient;
pub use protocol::{
    generate_request_id, now_millis, ErrorPayload, Outcome, RequestEnvelope, ResponseEnvelope,
};
pub use registry::{handler_fn, CallContext, FnHandler, FunctionRegistry, Params, RpcFunction};
pub use server::{DispatchReport, Dispatcher};
