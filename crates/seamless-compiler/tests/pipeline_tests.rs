//! Scan -> generate -> write over a scratch source tree.

use seamless_compiler::{compile, CompilerError, GeneratorOptions, ScanOptions, TypeTag};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const USERS: &str = r#"use seamless_core::CallContext;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
}

/// Look up one user.
///
/// @rpc (id: string) -> User | null
pub async fn get_user(ctx: &CallContext, id: String) -> anyhow::Result<Option<User>> {
    todo!()
}

/// @rpc () -> User[]
pub async fn get_all_users(ctx: &CallContext) -> anyhow::Result<Vec<User>> {
    todo!()
}

/// Not exported over RPC: no annotation.
pub async fn reset() {}
"#;

const POSTS: &str = r#"use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
}

/// @rpc (authorId: string) -> Post[]
pub async fn get_posts_by_author(authorId: String) -> Vec<Post> {
    todo!()
}

/// @rpc (id: string) -> Post[
pub async fn broken(id: String) -> Vec<Post> {
    todo!()
}
"#;

fn write(root: &Path, rel: &str, source: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, source).unwrap();
}

fn source_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "api/users.rs", USERS);
    write(dir.path(), "api/posts.rs", POSTS);
    write(dir.path(), "api/mod.rs", "pub mod posts;\npub mod users;\n");
    dir
}

#[test]
fn test_compile_writes_all_artifacts() {
    let src = source_tree();
    let out = TempDir::new().unwrap();

    let report = compile(
        src.path(),
        out.path(),
        &ScanOptions::new(),
        &GeneratorOptions::new().with_shared_types_path("crate::models"),
    )
    .unwrap();

    let identities: Vec<String> = report.functions.iter().map(|f| f.identity()).collect();
    assert_eq!(
        identities,
        vec![
            "api/posts.get_posts_by_author",
            "api/users.get_user",
            "api/users.get_all_users"
        ]
    );
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].starts_with("api/posts.rs:"));
    assert!(report.errors[0].contains("broken"));
    assert_eq!(report.written.len(), 4);

    let stubs = fs::read_to_string(out.path().join("client_stubs.rs")).unwrap();
    assert!(stubs.contains("pub async fn get_posts_by_author(client: &RpcClient, authorId: String)"));
    assert!(stubs.contains("use crate::models::{Post, User};"));

    let routes = fs::read_to_string(out.path().join("server_routes.rs")).unwrap();
    assert!(routes.contains("use crate::api::posts as api_posts;"));
    assert!(routes.contains("api_posts::get_posts_by_author(params.arg(0, \"authorId\")?).await;"));
    assert!(routes.contains("api_users::get_user(&ctx, params.arg(0, \"id\")?).await?;"));

    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.path().join("rpc_manifest.json")).unwrap())
            .unwrap();
    assert_eq!(manifest["functionCount"], 3);
    assert_eq!(
        manifest["functions"]["api/users.get_user"]["sourceLocation"],
        "api/users.rs:13"
    );
}

#[test]
fn test_recompile_is_stable() {
    let src = source_tree();
    let out = TempDir::new().unwrap();
    let scan = ScanOptions::new();
    let options = GeneratorOptions::new();

    let first = compile(src.path(), out.path(), &scan, &options).unwrap();
    let before = fs::read_to_string(out.path().join("server_routes.rs")).unwrap();
    let second = compile(src.path(), out.path(), &scan, &options).unwrap();

    assert_eq!(first.functions, second.functions);
    assert!(second.written.is_empty());
    assert_eq!(second.unchanged.len(), 4);
    assert_eq!(
        fs::read_to_string(out.path().join("server_routes.rs")).unwrap(),
        before
    );
}

#[test]
fn test_source_change_rewrites_only_affected_output() {
    let src = source_tree();
    let out = TempDir::new().unwrap();
    let scan = ScanOptions::new();
    let options = GeneratorOptions::new();
    compile(src.path(), out.path(), &scan, &options).unwrap();

    // Doc text outside the annotation moves no line and changes no contract.
    let edited = USERS.replace("Look up one user.", "Look up a user by id.");
    write(src.path(), "api/users.rs", &edited);
    let report = compile(src.path(), out.path(), &scan, &options).unwrap();
    assert!(report.written.is_empty());

    let edited = USERS.replace("(id: string) -> User | null", "(id: string) -> User");
    write(src.path(), "api/users.rs", &edited);
    let report = compile(src.path(), out.path(), &scan, &options).unwrap();
    assert!(report.written.contains(&"client_stubs.rs".to_string()));
    let get_user = report
        .functions
        .iter()
        .find(|f| f.name == "get_user")
        .unwrap();
    assert_eq!(get_user.return_type_tag, TypeTag::Named("User".into()));
}

#[test]
fn test_strict_scan_fails_without_writing() {
    let src = source_tree();
    let out = TempDir::new().unwrap();
    let target = out.path().join("generated");

    let err = compile(
        src.path(),
        &target,
        &ScanOptions::new().with_fail_on_error(true),
        &GeneratorOptions::new(),
    )
    .unwrap_err();

    assert!(matches!(err, CompilerError::Scan { ref errors } if errors.len() == 1));
    assert!(!target.exists());
}

#[test]
fn test_include_limits_scan() {
    let src = source_tree();
    write(src.path(), "admin/tools.rs", "/// @rpc () -> null\npub async fn purge() {}\n");
    let out = TempDir::new().unwrap();

    let report = compile(
        src.path(),
        out.path(),
        &ScanOptions::new().with_include("admin"),
        &GeneratorOptions::new(),
    )
    .unwrap();

    assert_eq!(report.functions.len(), 1);
    assert_eq!(report.functions[0].identity(), "admin/tools.purge");
    assert!(!report.functions[0].fallible);
    assert!(!report.functions[0].takes_context);
}
