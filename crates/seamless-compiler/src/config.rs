//! Compiler constants.

use std::time::Duration;

/// File names, markers and timing used by the discover/generate pipeline.
pub struct CompilerConfig;

impl CompilerConfig {
    /// Doc-comment marker that introduces a function's wire schema.
    pub const SCHEMA_MARKER: &'static str = "@rpc";
    /// Type of the optional leading per-call context parameter.
    pub const CONTEXT_TYPE: &'static str = "CallContext";
    /// Deepest nesting of parenthesised and record tags in one schema.
    pub const MAX_SCHEMA_DEPTH: usize = 32;
    /// First line of every generated artifact.
    pub const GENERATED_MARKER: &'static str = "@generated by seamless-compiler. Do not edit.";

    pub const CLIENT_STUBS_FILE: &'static str = "client_stubs.rs";
    pub const SERVER_ROUTES_FILE: &'static str = "server_routes.rs";
    pub const TYPE_CONTRACTS_FILE: &'static str = "rpc_types.rs";
    pub const MANIFEST_FILE: &'static str = "rpc_manifest.json";

    /// Quiet period after the last source change before regenerating.
    pub const WATCH_DEBOUNCE: Duration = Duration::from_millis(1000);
    /// Crate path used for runtime items in generated code.
    pub const DEFAULT_CORE_CRATE: &'static str = "seamless_core";
    /// Rust path of the scan root, as seen from the crate that includes the routes.
    pub const DEFAULT_SERVER_MODULE_ROOT: &'static str = "crate";
}
