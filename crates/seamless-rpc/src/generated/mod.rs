//! Checked-in bindings produced by `seamless-rpc generate`.
//!
//! Regenerate with:
//!
//! ```text
//! seamless-rpc generate --root crates/seamless-rpc/src --include api \
//!     --shared-types crate::api::models --out crates/seamless-rpc/src/generated
//! ```
//!
//! The server registrations back `serve`. The client stubs and type contracts
//! are compiled here so a generator change that breaks them fails the build.

#[allow(dead_code)]
pub mod client_stubs;
#[allow(dead_code)]
pub mod rpc_types;
pub mod server_routes;
