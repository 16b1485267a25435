//! End-to-end tests against the `seamless-rpc serve` binary.

use seamless_core::{ErrorKind, RpcClient, RpcClientConfig, Value};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;

struct RpcServerHandle {
    child: tokio::process::Child,
    port: u16,
    stdout_drain: Option<tokio::task::JoinHandle<()>>,
}

impl RpcServerHandle {
    fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }

    fn client(&self) -> RpcClient {
        let config = RpcClientConfig::new()
            .with_base_url(self.url("/api/rpc"))
            .with_timeout(Duration::from_secs(10))
            .with_retry_attempts(0);
        RpcClient::http(config).unwrap()
    }

    async fn stop(mut self) {
        if let Some(drain) = self.stdout_drain.take() {
            drain.abort();
        }
        let _ = self.child.kill().await;
        let _ = self.child.wait().await;
    }
}

impl Drop for RpcServerHandle {
    fn drop(&mut self) {
        if let Some(drain) = self.stdout_drain.take() {
            drain.abort();
        }
        let _ = self.child.start_kill();
    }
}

async fn check_health(port: u16) -> bool {
    let client = reqwest::Client::new();
    if let Ok(response) = client
        .get(format!("http://127.0.0.1:{}/health", port))
        .timeout(Duration::from_secs(5))
        .send()
        .await
    {
        if let Ok(json) = response.json::<serde_json::Value>().await {
            return json.get("status").and_then(|v| v.as_str()) == Some("ok");
        }
    }
    false
}

async fn wait_for_server(port: u16, timeout_secs: u64) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < Duration::from_secs(timeout_secs) {
        if check_health(port).await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    false
}

/// Start the binary on an auto-assigned port and wait until `/health` answers.
async fn start_rpc_server() -> Result<RpcServerHandle, String> {
    let binary = PathBuf::from(env!("CARGO_BIN_EXE_seamless-rpc"));

    let mut child = tokio::process::Command::new(&binary)
        .arg("serve")
        .arg("--host")
        .arg("127.0.0.1")
        .arg("--port")
        .arg("0")
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| format!("failed to spawn seamless-rpc: {e}"))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| "failed to capture stdout".to_string())?;
    let mut lines = tokio::io::BufReader::new(stdout).lines();

    let mut discovered_port: Option<u16> = None;
    let deadline = tokio::time::Instant::now() + Duration::from_secs(20);
    while tokio::time::Instant::now() < deadline {
        match tokio::time::timeout(Duration::from_millis(250), lines.next_line()).await {
            Ok(Ok(Some(line))) => {
                if let Some(value) = line.strip_prefix("RPC_PORT=") {
                    let parsed = value
                        .trim()
                        .parse::<u16>()
                        .map_err(|e| format!("invalid RPC_PORT value '{value}': {e}"))?;
                    discovered_port = Some(parsed);
                    break;
                }
            }
            Ok(Ok(None)) => break,
            Ok(Err(err)) => return Err(format!("failed to read seamless-rpc stdout: {err}")),
            Err(_) => continue,
        }
    }

    let port =
        discovered_port.ok_or_else(|| "RPC_PORT line not emitted by seamless-rpc".to_string())?;
    if !wait_for_server(port, 15).await {
        return Err(format!("seamless-rpc failed health check on port {port}"));
    }

    let stdout_drain =
        tokio::spawn(async move { while let Ok(Some(_)) = lines.next_line().await {} });

    Ok(RpcServerHandle {
        child,
        port,
        stdout_drain: Some(stdout_drain),
    })
}

fn object(fields: &[(&str, &str)]) -> Value {
    let mut map = seamless_core::Map::new();
    for (key, value) in fields {
        map.insert(key.to_string(), Value::from(*value));
    }
    Value::Object(map)
}

#[tokio::test]
async fn test_sample_functions_over_http() {
    let server = start_rpc_server().await.unwrap();
    let client = server.client();

    let user = client
        .call("api/users.get_user", vec![Value::from("user-1")])
        .await
        .unwrap();
    assert_eq!(user.get("name"), Some(&Value::from("John Doe")));
    let created = user.get("createdAt").and_then(Value::as_timestamp).unwrap();
    assert_eq!(created.to_rfc3339(), "2024-01-01T00:00:00+00:00");

    let post = client
        .call(
            "api/posts.create_post",
            vec![object(&[
                ("title", "Second post"),
                ("content", "Created over the wire."),
                ("authorId", "user-2"),
            ])],
        )
        .await
        .unwrap();
    assert!(post.get("updatedAt").and_then(Value::as_timestamp).is_some());

    let by_author = client
        .call("api/posts.get_posts_by_author", vec![Value::from("user-2")])
        .await
        .unwrap();
    assert_eq!(by_author.as_array().map(Vec::len), Some(1));

    let profile = client
        .call("api/users.get_user_profile", vec![Value::from("user-1")])
        .await
        .unwrap();
    let stats = profile.get("stats").unwrap();
    assert_eq!(stats.get("postsCount").and_then(Value::as_f64), Some(1.0));

    server.stop().await;
}

#[tokio::test]
async fn test_errors_are_typed() {
    let server = start_rpc_server().await.unwrap();
    let client = server.client();

    let err = client
        .call(
            "api/users.create_user",
            vec![object(&[("name", "Ann"), ("email", "ann.example.com")])],
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ValidationError);
    assert_eq!(err.status_code, 400);
    assert_eq!(err.message, "Invalid email format");

    let err = client
        .call("api/users.get_user", vec![Value::from("user-404")])
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InternalServerError);
    assert_eq!(err.status_code, 500);
    assert!(err.server_diagnostic.is_none());

    let err = client.call("api/users.delete_user", vec![]).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::FunctionNotFound);
    assert_eq!(err.status_code, 404);

    let err = client.call("api/users.get_user", vec![]).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::MissingParameter);

    server.stop().await;
}

#[tokio::test]
async fn test_malformed_body_still_gets_envelope() {
    let server = start_rpc_server().await.unwrap();

    let response = reqwest::Client::new()
        .post(server.url("/api/rpc"))
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let json: serde_json::Value = response.json().await.unwrap();
    assert_eq!(json["id"], "unknown");
    assert_eq!(json["error"]["code"], "DESERIALIZATION_ERROR");
    assert!(json.get("result").is_none());

    server.stop().await;
}

#[tokio::test]
async fn test_dev_endpoints() {
    let server = start_rpc_server().await.unwrap();
    let client = server.client();
    let http = reqwest::Client::new();

    let functions: serde_json::Value = http
        .get(server.url("/dev/rpc/functions"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let names: Vec<&str> = functions["functions"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|v| v.as_str())
        .collect();
    assert_eq!(names.len(), 9);
    assert!(names.contains(&"api/posts.get_post_with_author"));

    client.call("api/posts.get_all_posts", vec![]).await.unwrap();
    let _ = client.call("api/posts.get_post", vec![Value::from("")]).await;

    let stats: serde_json::Value = http
        .get(server.url("/dev/rpc/stats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["total"], 2);
    assert_eq!(stats["successful"], 1);
    assert_eq!(stats["failed"], 1);

    let logs: serde_json::Value = http
        .get(server.url("/dev/rpc/logs"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(logs[0]["method"], "api/posts.get_post");
    assert_eq!(logs[0]["error"], "Post ID is required");
    assert_eq!(logs[1]["success"], true);

    let cleared = http.delete(server.url("/dev/rpc/logs")).send().await.unwrap();
    assert_eq!(cleared.status(), reqwest::StatusCode::NO_CONTENT);

    server.stop().await;
}
