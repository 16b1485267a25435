//! End-to-end tests: client -> transport -> dispatcher -> registered function.
//!
//! Calls go through `LocalTransport`, so they exercise the full wire encoding
//! without opening sockets.

use async_trait::async_trait;
use seamless_core::value::tagged_date;
use seamless_core::{
    handler_fn, to_value, CallContext, Dispatcher, ErrorKind, FunctionRegistry, LocalTransport,
    RpcClient, RpcClientConfig, RpcError, ServerConfig, Timestamp, Transport, Value,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct CreateUserInput {
    name: String,
    email: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct User {
    id: String,
    name: String,
    email: String,
    #[serde(with = "tagged_date")]
    created_at: Timestamp,
}

/// Tenant name installed by the host and read back by functions.
struct Tenant(&'static str);

fn create_test_client(ctx: CallContext) -> RpcClient {
    let registry = Arc::new(FunctionRegistry::new());

    registry.register(
        "api/users.create_user",
        handler_fn(|_ctx, params| async move {
            let input: CreateUserInput = params.arg(0, "input")?;
            if input.name.is_empty() {
                return Err(RpcError::validation("Name is required").into());
            }
            if !input.email.contains('@') {
                return Err(RpcError::validation("Invalid email address")
                    .with_context("field", "email")
                    .into());
            }
            let user = User {
                id: uuid::Uuid::new_v4().to_string(),
                name: input.name,
                email: input.email,
                created_at: chrono::Utc::now(),
            };
            Ok(to_value(&user)?)
        }),
    );

    registry.register(
        "api/users.legacy_create",
        handler_fn(|_ctx, _params| async move { anyhow::bail!("email must contain @") }),
    );

    registry.register(
        "api/tenants.current",
        handler_fn(|ctx, _params| async move {
            let tenant = ctx
                .get::<Tenant>()
                .ok_or_else(|| RpcError::unauthorized("No tenant"))?;
            Ok(Value::from(tenant.0))
        }),
    );

    let dispatcher = Arc::new(Dispatcher::new(registry, ServerConfig::new()));
    let transport = LocalTransport::new(dispatcher).with_context(ctx);
    RpcClient::new(Arc::new(transport), RpcClientConfig::new())
}

fn user_input(name: &str, email: &str) -> Value {
    let mut map = seamless_core::Map::new();
    map.insert("name".into(), Value::from(name));
    map.insert("email".into(), Value::from(email));
    Value::Object(map)
}

#[tokio::test]
async fn test_create_user_returns_user_with_timestamp() {
    let client = create_test_client(CallContext::default());
    let before = chrono::Utc::now();

    let result = client
        .call("api/users.create_user", vec![user_input("Ann", "ann@x.io")])
        .await
        .unwrap();

    assert_eq!(result.get("name"), Some(&Value::from("Ann")));
    assert_eq!(result.get("email"), Some(&Value::from("ann@x.io")));
    assert!(!result.get("id").and_then(Value::as_str).unwrap().is_empty());
    let created = result.get("createdAt").and_then(Value::as_timestamp).unwrap();
    assert!(*created >= before - chrono::Duration::seconds(1));
}

#[tokio::test]
async fn test_create_user_typed() {
    let client = create_test_client(CallContext::default());
    let user: User = client
        .call_typed("api/users.create_user", vec![user_input("Bo", "bo@x.io")])
        .await
        .unwrap();
    assert_eq!(user.name, "Bo");
}

#[tokio::test]
async fn test_create_user_validation_error() {
    let client = create_test_client(CallContext::default());
    let err = client
        .call("api/users.create_user", vec![user_input("", "bad")])
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::ValidationError);
    assert_eq!(err.status_code, 400);
    assert_eq!(err.message, "Name is required");
}

#[tokio::test]
async fn test_untyped_handler_error_is_internal() {
    let client = create_test_client(CallContext::default());
    let err = client
        .call("api/users.legacy_create", vec![user_input("", "bad")])
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::InternalServerError);
    assert_eq!(err.status_code, 500);
    assert_eq!(err.message, "email must contain @");
    assert!(err.server_diagnostic.is_none());
}

#[tokio::test]
async fn test_unknown_method() {
    let client = create_test_client(CallContext::default());
    let err = client.call("api/users.delete_all", vec![]).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::FunctionNotFound);
    assert_eq!(err.status_code, 404);
}

#[tokio::test]
async fn test_context_reaches_functions_opaquely() {
    let client = create_test_client(CallContext::new(Arc::new(Tenant("acme"))));
    let tenant = client.call("api/tenants.current", vec![]).await.unwrap();
    assert_eq!(tenant, Value::from("acme"));

    let anonymous = create_test_client(CallContext::default());
    let err = anonymous.call("api/tenants.current", vec![]).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);
    assert_eq!(err.status_code, 401);
}

/// Transport that always fails at the network layer and records when it was hit.
struct FailingTransport {
    attempts: AtomicU32,
    seen_at: Mutex<Vec<tokio::time::Instant>>,
}

#[async_trait]
impl Transport for FailingTransport {
    async fn send(&self, _body: String) -> seamless_core::Result<String> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.seen_at.lock().unwrap().push(tokio::time::Instant::now());
        Err(RpcError::network("HTTP 502: Bad Gateway").with_status(502))
    }
}

#[tokio::test(start_paused = true)]
async fn test_retry_bound_and_backoff_schedule() {
    let transport = Arc::new(FailingTransport {
        attempts: AtomicU32::new(0),
        seen_at: Mutex::new(Vec::new()),
    });
    let delay = Duration::from_millis(100);
    let config = RpcClientConfig::new()
        .with_retry_attempts(2)
        .with_retry_delay(delay);
    let client = RpcClient::new(transport.clone(), config);

    let err = client.call("api/users.create_user", vec![]).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NetworkError);
    assert_eq!(err.status_code, 502);
    assert_eq!(transport.attempts.load(Ordering::SeqCst), 3);

    let seen = transport.seen_at.lock().unwrap().clone();
    let first_gap = seen[1] - seen[0];
    let second_gap = seen[2] - seen[1];
    assert!(first_gap >= delay && first_gap < delay * 2);
    assert!(second_gap >= delay * 2 && second_gap < delay * 3);
}

#[tokio::test(start_paused = true)]
async fn test_zero_retry_attempts_means_single_attempt() {
    let transport = Arc::new(FailingTransport {
        attempts: AtomicU32::new(0),
        seen_at: Mutex::new(Vec::new()),
    });
    let client = RpcClient::new(
        transport.clone(),
        RpcClientConfig::new().with_retry_attempts(0),
    );

    assert!(client.call("m.f", vec![]).await.is_err());
    assert_eq!(transport.attempts.load(Ordering::SeqCst), 1);
}
