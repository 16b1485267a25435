//! Function discovery.
//!
//! Walks a source root, parses every Rust module with `syn`, and turns each
//! eligible `pub async fn` into a [`MethodDescriptor`]. A function is eligible
//! when its doc comment carries an `@rpc` schema whose parameter names match the
//! Rust signature and whose tags all resolve (see [`schema`]).
//!
//! Output order is stable: modules sorted by module path, functions in
//! declaration order within a module.

pub mod schema;

use crate::config::CompilerConfig;
use crate::error::{CompilerError, Result};
use schema::{Schema, TypeTag};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use syn::{FnArg, Item, ItemFn, Pat, ReturnType, Type, Visibility};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// One parameter of a discovered function's contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDescriptor {
    pub name: String,
    pub type_tag: TypeTag,
    pub optional: bool,
}

/// A discovered server function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodDescriptor {
    pub name: String,
    /// Root-relative module path, `/`-separated, e.g. `api/users`.
    pub module_path: String,
    pub is_eligible: bool,
    pub parameters: Vec<ParameterDescriptor>,
    pub return_type_tag: TypeTag,
    /// Root-relative source file, `/`-separated.
    pub source_file: String,
    pub line: usize,
    /// The Rust function takes a leading `&CallContext`.
    pub takes_context: bool,
    /// The Rust function returns a `Result`.
    pub fallible: bool,
}

impl MethodDescriptor {
    /// Wire method identifier: `module_path.name`.
    pub fn identity(&self) -> String {
        format!("{}.{}", self.module_path, self.name)
    }

    /// `file:line` of the declaration.
    pub fn source_location(&self) -> String {
        format!("{}:{}", self.source_file, self.line)
    }
}

/// Scan configuration.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Root-relative subdirectories (or files) to scan. Empty means everything.
    pub include: Vec<PathBuf>,
    /// Turn any collected error into a failed scan.
    pub fail_on_error: bool,
    /// Type names accepted as serializable without being declared in the scan.
    pub known_types: Vec<String>,
}

impl ScanOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_include(mut self, path: impl Into<PathBuf>) -> Self {
        self.include.push(path.into());
        self
    }

    pub fn with_fail_on_error(mut self, fail: bool) -> Self {
        self.fail_on_error = fail;
        self
    }

    pub fn with_known_type(mut self, name: impl Into<String>) -> Self {
        self.known_types.push(name.into());
        self
    }
}

/// Result of a scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisResult {
    pub functions: Vec<MethodDescriptor>,
    /// Structural problems: unreadable or unparsable modules, malformed schemas.
    pub errors: Vec<String>,
}

struct SourceModule {
    module_path: String,
    rel_file: String,
    abs_file: PathBuf,
}

struct ParsedModule {
    module: SourceModule,
    file: syn::File,
}

/// Scan `root` and describe every eligible function.
pub fn analyze(root: &Path, options: &ScanOptions) -> Result<AnalysisResult> {
    let mut result = AnalysisResult::default();
    let modules = collect_modules(root, options, &mut result.errors)?;

    let mut parsed = Vec::with_capacity(modules.len());
    for module in modules {
        let source = match std::fs::read_to_string(&module.abs_file) {
            Ok(source) => source,
            Err(e) => {
                warn!("Cannot read {}: {}", module.rel_file, e);
                result
                    .errors
                    .push(format!("{}: failed to read module: {}", module.rel_file, e));
                continue;
            }
        };
        match syn::parse_file(&source) {
            Ok(file) => parsed.push(ParsedModule { module, file }),
            Err(e) => {
                let line = e.span().start().line;
                warn!("Cannot parse {}:{}: {}", module.rel_file, line, e);
                result
                    .errors
                    .push(format!("{}:{}: failed to parse module: {}", module.rel_file, line, e));
            }
        }
    }

    // Named shapes are resolved across all modules before any function is judged.
    let mut known: BTreeSet<String> = options.known_types.iter().cloned().collect();
    for module in &parsed {
        collect_serde_types(&module.file.items, &mut known);
    }

    for module in &parsed {
        describe_module(module, &known, &mut result);
    }

    info!(
        "Discovered {} RPC function(s) with {} error(s)",
        result.functions.len(),
        result.errors.len()
    );

    if options.fail_on_error && !result.errors.is_empty() {
        return Err(CompilerError::Scan {
            errors: result.errors,
        });
    }
    Ok(result)
}

/// Root-relative module path of a source file: `api/users.rs` -> `api/users`,
/// `api/mod.rs` -> `api`.
pub fn module_path_for(rel: &Path) -> String {
    let mut parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if let Some(last) = parts.pop() {
        let stem = last.strip_suffix(".rs").unwrap_or(&last).to_string();
        if stem != "mod" || parts.is_empty() {
            parts.push(stem);
        }
    }
    parts.join("/")
}

/// Source modules under `root`. Symlinks are followed; entries the walk cannot
/// read (unreadable directories, dangling links, link cycles) land in `errors`.
fn collect_modules(
    root: &Path,
    options: &ScanOptions,
    errors: &mut Vec<String>,
) -> Result<Vec<SourceModule>> {
    if !root.is_dir() {
        return Err(CompilerError::io(
            root,
            std::io::Error::new(std::io::ErrorKind::NotFound, "source root is not a directory"),
        ));
    }

    let mut modules = Vec::new();
    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let rel = e.path().and_then(|p| p.strip_prefix(root).ok());
                if let Some(rel) = rel {
                    if !is_included(rel, options) {
                        continue;
                    }
                }
                let location = rel
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| root.display().to_string());
                warn!("Cannot read {}: {}", location, e);
                errors.push(format!("{}: failed to read entry: {}", location, e));
                continue;
            }
        };
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().and_then(|e| e.to_str()) != Some("rs") {
            continue;
        }
        let Ok(rel) = path.strip_prefix(root) else {
            continue;
        };
        if !is_included(rel, options) {
            continue;
        }
        let rel_file = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        modules.push(SourceModule {
            module_path: module_path_for(rel),
            rel_file,
            abs_file: path.to_path_buf(),
        });
    }

    modules.sort_by(|a, b| a.module_path.cmp(&b.module_path));
    debug!("Scanning {} module(s) under {}", modules.len(), root.display());
    Ok(modules)
}

fn is_included(rel: &Path, options: &ScanOptions) -> bool {
    options.include.is_empty() || options.include.iter().any(|inc| rel.starts_with(inc))
}

/// Names of structs and enums that derive both `Serialize` and `Deserialize`.
fn collect_serde_types(items: &[Item], known: &mut BTreeSet<String>) {
    for item in items {
        let (ident, attrs) = match item {
            Item::Struct(s) => (&s.ident, &s.attrs),
            Item::Enum(e) => (&e.ident, &e.attrs),
            _ => continue,
        };
        let mut derives = BTreeSet::new();
        for attr in attrs.iter().filter(|a| a.path().is_ident("derive")) {
            let parsed = attr.parse_nested_meta(|meta| {
                if let Some(last) = meta.path.segments.last() {
                    derives.insert(last.ident.to_string());
                }
                Ok(())
            });
            if let Err(e) = parsed {
                debug!("Ignoring unparsable derive on {}: {}", ident, e);
            }
        }
        if derives.contains("Serialize") && derives.contains("Deserialize") {
            known.insert(ident.to_string());
        }
    }
}

fn describe_module(parsed: &ParsedModule, known: &BTreeSet<String>, result: &mut AnalysisResult) {
    let module = &parsed.module;
    for item in &parsed.file.items {
        let Item::Fn(item_fn) = item else {
            continue;
        };
        if !matches!(item_fn.vis, Visibility::Public(_)) {
            continue;
        }
        match describe_function(module, item_fn, known) {
            Ok(Some(descriptor)) => {
                debug!("Eligible: {}", descriptor.identity());
                result.functions.push(descriptor);
            }
            Ok(None) => {}
            Err(message) => result.errors.push(message),
        }
    }
}

/// `Ok(None)` for ineligible functions, `Err` for a malformed schema.
fn describe_function(
    module: &SourceModule,
    item_fn: &ItemFn,
    known: &BTreeSet<String>,
) -> std::result::Result<Option<MethodDescriptor>, String> {
    let name = item_fn.sig.ident.to_string();
    let line = item_fn.sig.ident.span().start().line;
    let identity = format!("{}.{}", module.module_path, name);

    let Some(schema_text) = schema_annotation(&item_fn.attrs) else {
        return Ok(None);
    };
    let schema: Schema = schema_text
        .parse()
        .map_err(|e| format!("{}:{}: {}: {}", module.rel_file, line, name, e))?;

    if item_fn.sig.asyncness.is_none() {
        debug!("Excluded {}: not async", identity);
        return Ok(None);
    }

    let (takes_context, rust_params) = match rust_parameters(item_fn) {
        Some(params) => params,
        None => {
            debug!("Excluded {}: unsupported parameter pattern", identity);
            return Ok(None);
        }
    };
    let schema_names: Vec<&str> = schema.params.iter().map(|p| p.name.as_str()).collect();
    if rust_params != schema_names {
        debug!(
            "Excluded {}: schema parameters {:?} do not match {:?}",
            identity, schema_names, rust_params
        );
        return Ok(None);
    }

    let is_known = |n: &str| known.contains(n);
    if !schema.returns.resolves(&is_known) || !schema.params.iter().all(|p| p.tag.resolves(&is_known))
    {
        debug!("Excluded {}: schema names an unknown type", identity);
        return Ok(None);
    }

    Ok(Some(MethodDescriptor {
        name,
        module_path: module.module_path.clone(),
        is_eligible: true,
        parameters: schema
            .params
            .into_iter()
            .map(|p| ParameterDescriptor {
                name: p.name,
                type_tag: p.tag,
                optional: p.optional,
            })
            .collect(),
        return_type_tag: schema.returns,
        source_file: module.rel_file.clone(),
        line,
        takes_context,
        fallible: returns_result(&item_fn.sig.output),
    }))
}

/// Text after the schema marker in the doc comment, if any.
fn schema_annotation(attrs: &[syn::Attribute]) -> Option<String> {
    attrs
        .iter()
        .filter(|a| a.path().is_ident("doc"))
        .filter_map(|a| match &a.meta {
            syn::Meta::NameValue(nv) => match &nv.value {
                syn::Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Str(s),
                    ..
                }) => Some(s.value()),
                _ => None,
            },
            _ => None,
        })
        .find_map(|line| {
            line.trim()
                .strip_prefix(CompilerConfig::SCHEMA_MARKER)
                .map(|rest| rest.trim().to_string())
        })
}

/// Contract parameter names, skipping a leading `&CallContext`.
fn rust_parameters(item_fn: &ItemFn) -> Option<(bool, Vec<String>)> {
    let mut takes_context = false;
    let mut names = Vec::new();
    for (index, input) in item_fn.sig.inputs.iter().enumerate() {
        let FnArg::Typed(pat_type) = input else {
            return None;
        };
        if index == 0 && is_context_type(&pat_type.ty) {
            takes_context = true;
            continue;
        }
        let Pat::Ident(pat) = pat_type.pat.as_ref() else {
            return None;
        };
        names.push(pat.ident.to_string());
    }
    Some((takes_context, names))
}

fn is_context_type(ty: &Type) -> bool {
    let Type::Reference(reference) = ty else {
        return false;
    };
    let Type::Path(path) = reference.elem.as_ref() else {
        return false;
    };
    path.path
        .segments
        .last()
        .is_some_and(|s| s.ident == CompilerConfig::CONTEXT_TYPE)
}

fn returns_result(output: &ReturnType) -> bool {
    let ReturnType::Type(_, ty) = output else {
        return false;
    };
    let Type::Path(path) = ty.as_ref() else {
        return false;
    };
    path.path
        .segments
        .last()
        .is_some_and(|s| s.ident == "Result")
}
