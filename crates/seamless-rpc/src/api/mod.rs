//! Sample application functions exposed over RPC.

pub mod models;
pub mod posts;
pub mod users;
