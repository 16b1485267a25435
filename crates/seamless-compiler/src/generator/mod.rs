//! Binding generator.
//!
//! A pure function from descriptors to four text artifacts:
//!
//! - `client_stubs.rs`: one async fn per function forwarding to `RpcClient::call_typed`
//! - `server_routes.rs`: `register_functions(&FunctionRegistry)` binding every identity
//! - `rpc_types.rs`: one `fn` pointer type alias per function contract
//! - `rpc_manifest.json`: identity -> name, location, parameters, return tag
//!
//! Output depends only on the descriptor list and the options, so regenerating
//! from the same input yields byte-identical text.

mod client;
mod manifest;
mod server;
mod types;

use crate::analyzer::schema::TypeTag;
use crate::analyzer::MethodDescriptor;
use crate::config::CompilerConfig;
use crate::error::Result;
use heck::{ToSnakeCase, ToUpperCamelCase};
use std::collections::{BTreeMap, BTreeSet};

/// Paths used in generated code.
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    /// Crate name under which the runtime is reachable.
    pub core_crate: String,
    /// Rust path of the scanned source root (`crate`, `crate::server`, ...).
    pub server_module_root: String,
    /// Module that exports every named shape used by the contracts. When unset,
    /// named types are referenced unqualified and must be in scope where the
    /// client stubs and type contracts are included.
    pub shared_types_path: Option<String>,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            core_crate: CompilerConfig::DEFAULT_CORE_CRATE.to_string(),
            server_module_root: CompilerConfig::DEFAULT_SERVER_MODULE_ROOT.to_string(),
            shared_types_path: None,
        }
    }
}

impl GeneratorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_core_crate(mut self, name: impl Into<String>) -> Self {
        self.core_crate = name.into();
        self
    }

    pub fn with_server_module_root(mut self, path: impl Into<String>) -> Self {
        self.server_module_root = path.into();
        self
    }

    pub fn with_shared_types_path(mut self, path: impl Into<String>) -> Self {
        self.shared_types_path = Some(path.into());
        self
    }
}

/// The four generated artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedBindings {
    pub client_stubs: String,
    pub server_routes: String,
    pub type_contracts: String,
    pub manifest: String,
}

impl GeneratedBindings {
    /// `(file name, contents)` pairs in a fixed order.
    pub fn files(&self) -> [(&'static str, &str); 4] {
        [
            (CompilerConfig::CLIENT_STUBS_FILE, &self.client_stubs),
            (CompilerConfig::SERVER_ROUTES_FILE, &self.server_routes),
            (CompilerConfig::TYPE_CONTRACTS_FILE, &self.type_contracts),
            (CompilerConfig::MANIFEST_FILE, &self.manifest),
        ]
    }
}

/// Generate all artifacts. Ineligible descriptors are skipped.
pub fn generate(
    functions: &[MethodDescriptor],
    options: &GeneratorOptions,
) -> Result<GeneratedBindings> {
    let eligible: Vec<&MethodDescriptor> = functions.iter().filter(|f| f.is_eligible).collect();
    let aliases = ModuleAliases::new(&eligible);
    let names = StubNames::new(&eligible, &aliases);

    Ok(GeneratedBindings {
        client_stubs: client::render(&eligible, &names, options),
        server_routes: server::render(&eligible, &aliases, options),
        type_contracts: types::render(&eligible, &names, options),
        manifest: manifest::render(&eligible)?,
    })
}

/// Rust names for stubs and contracts. A function name shared by several modules
/// is prefixed with its module alias; any name still taken gets a numeric suffix.
pub(crate) struct StubNames {
    stubs: BTreeMap<String, String>,
    contracts: BTreeMap<String, String>,
}

impl StubNames {
    fn new(functions: &[&MethodDescriptor], aliases: &ModuleAliases) -> Self {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for f in functions {
            *counts.entry(f.name.as_str()).or_default() += 1;
        }

        let mut stubs = BTreeMap::new();
        let mut contracts = BTreeMap::new();
        let mut taken_stubs = BTreeSet::new();
        let mut taken_contracts = BTreeSet::new();
        for f in functions {
            let base = if counts[f.name.as_str()] > 1 {
                format!("{}_{}", aliases.alias(&f.module_path), f.name.to_snake_case())
            } else {
                f.name.to_snake_case()
            };
            let stub = claim(&mut taken_stubs, &base, "_");
            let contract = claim(
                &mut taken_contracts,
                &format!("{}Function", stub.to_upper_camel_case()),
                "",
            );
            stubs.insert(f.identity(), stub);
            contracts.insert(f.identity(), contract);
        }
        Self { stubs, contracts }
    }

    pub(crate) fn stub(&self, f: &MethodDescriptor) -> String {
        self.stubs
            .get(&f.identity())
            .cloned()
            .unwrap_or_else(|| f.name.to_snake_case())
    }

    pub(crate) fn contract(&self, f: &MethodDescriptor) -> String {
        self.contracts
            .get(&f.identity())
            .cloned()
            .unwrap_or_else(|| format!("{}Function", f.name.to_upper_camel_case()))
    }
}

/// Import aliases for source modules, unique per module path.
///
/// `api/users` and `api_users` both flatten to `api_users`; the later module
/// gets `api_users_2`.
pub(crate) struct ModuleAliases {
    by_module: BTreeMap<String, String>,
}

impl ModuleAliases {
    /// Names generated code imports from the runtime; no alias may shadow them.
    const RESERVED: [&'static str; 4] = ["FunctionRegistry", "Value", "handler_fn", "to_value"];

    pub(crate) fn new(functions: &[&MethodDescriptor]) -> Self {
        let mut taken: BTreeSet<String> = Self::RESERVED.iter().map(|s| s.to_string()).collect();
        let mut by_module = BTreeMap::new();
        for f in functions {
            if by_module.contains_key(&f.module_path) {
                continue;
            }
            let alias = claim(&mut taken, &module_alias(&f.module_path), "_");
            by_module.insert(f.module_path.clone(), alias);
        }
        Self { by_module }
    }

    pub(crate) fn alias(&self, module_path: &str) -> String {
        self.by_module
            .get(module_path)
            .cloned()
            .unwrap_or_else(|| module_alias(module_path))
    }

    /// `(alias, module path)` pairs ordered by alias.
    pub(crate) fn imports(&self) -> BTreeMap<&str, &str> {
        self.by_module
            .iter()
            .map(|(module, alias)| (alias.as_str(), module.as_str()))
            .collect()
    }
}

/// Reserve `base`, or the first free `{base}{sep}{n}` for n >= 2.
fn claim(taken: &mut BTreeSet<String>, base: &str, sep: &str) -> String {
    let mut name = base.to_string();
    let mut n = 2;
    while taken.contains(&name) {
        name = format!("{}{}{}", base, sep, n);
        n += 1;
    }
    taken.insert(name.clone());
    name
}

/// Local alias for a module path: `api/users` -> `api_users`.
pub(crate) fn module_alias(module_path: &str) -> String {
    module_path
        .split('/')
        .map(|segment| segment.to_snake_case())
        .collect::<Vec<_>>()
        .join("_")
}

/// Rust path of a module: `api/users` under `crate` -> `crate::api::users`.
pub(crate) fn module_rust_path(root: &str, module_path: &str) -> String {
    let mut path = root.to_string();
    for segment in module_path.split('/').filter(|s| !s.is_empty()) {
        path.push_str("::");
        path.push_str(&segment.to_snake_case());
    }
    path
}

/// Runtime items a rendered type needs imported.
#[derive(Default)]
pub(crate) struct Imports {
    pub core: BTreeSet<&'static str>,
    pub named: BTreeSet<String>,
}

/// Rust type for a tag.
pub(crate) fn rust_type(tag: &TypeTag, imports: &mut Imports) -> String {
    match tag {
        TypeTag::String => "String".to_string(),
        TypeTag::Number => "f64".to_string(),
        TypeTag::Boolean => "bool".to_string(),
        TypeTag::Null => "()".to_string(),
        TypeTag::Date => {
            imports.core.insert("Timestamp");
            "Timestamp".to_string()
        }
        TypeTag::Any | TypeTag::Object | TypeTag::Record(_) => {
            imports.core.insert("Value");
            "Value".to_string()
        }
        TypeTag::Array(inner) => format!("Vec<{}>", rust_type(inner, imports)),
        TypeTag::Nullable(inner) => format!("Option<{}>", rust_type(inner, imports)),
        TypeTag::Named(name) => {
            imports.named.insert(name.clone());
            name.clone()
        }
    }
}

/// Whether values of this tag convert with `Value::from` rather than through serde.
///
/// Timestamps must take this path: serde would flatten them to plain strings.
pub(crate) fn converts_with_from(tag: &TypeTag) -> bool {
    match tag {
        TypeTag::String | TypeTag::Number | TypeTag::Boolean | TypeTag::Null | TypeTag::Date => {
            true
        }
        TypeTag::Array(inner) | TypeTag::Nullable(inner) => converts_with_from(inner),
        TypeTag::Any | TypeTag::Object | TypeTag::Record(_) | TypeTag::Named(_) => false,
    }
}

/// Rust type for a parameter, honouring `optional`.
pub(crate) fn param_type(tag: &TypeTag, optional: bool, imports: &mut Imports) -> String {
    let ty = rust_type(tag, imports);
    if optional && !matches!(tag, TypeTag::Nullable(_)) {
        format!("Option<{}>", ty)
    } else {
        ty
    }
}

pub(crate) fn header(comment: &str) -> String {
    format!("{} {}\n", comment, CompilerConfig::GENERATED_MARKER)
}

pub(crate) fn use_line(krate: &str, items: &BTreeSet<&'static str>) -> String {
    let list: Vec<&str> = items.iter().copied().collect();
    match list.as_slice() {
        [] => String::new(),
        [one] => format!("use {}::{};\n", krate, one),
        many => format!("use {}::{{{}}};\n", krate, many.join(", ")),
    }
}

pub(crate) fn named_use_line(options: &GeneratorOptions, named: &BTreeSet<String>) -> String {
    match &options.shared_types_path {
        Some(path) if !named.is_empty() => {
            let list: Vec<&str> = named.iter().map(String::as_str).collect();
            if list.len() == 1 {
                format!("use {}::{};\n", path, list[0])
            } else {
                format!("use {}::{{{}}};\n", path, list.join(", "))
            }
        }
        _ => String::new(),
    }
}
