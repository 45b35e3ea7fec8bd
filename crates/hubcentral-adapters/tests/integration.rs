//! Integration tests for the hubcentral-adapters crate.
//!
//! The OpenAI-compatible provider is exercised against a throwaway HTTP
//! server bound to localhost; storage adapters run against temp dirs.

use std::sync::Arc;
use std::time::Duration;

use hubcentral_adapters::{
    MemoryStorage, OpenAiCompatProvider, ProviderAdapter, ProviderError, StorageAdapter,
    StorageManager, VaultStorage,
};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serve exactly one HTTP response, returning the base URL and a handle
/// resolving to the raw request text.
async fn one_shot_server(status: &str, body: String) -> (String, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let status = status.to_string();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        // Read until the JSON body has arrived (it ends with `}`).
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&request);
            if let Some(idx) = text.find("\r\n\r\n")
                && text[idx..].trim_end().ends_with('}')
            {
                break;
            }
        }
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        String::from_utf8_lossy(&request).into_owned()
    });

    (format!("http://{addr}/v1"), handle)
}

// ═══════════════════════════════════════════════════════════════════════
//  OpenAI-compatible provider
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn chat_completion_round_trip() {
    let body = json!({
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": "pong" } }]
    })
    .to_string();
    let (base_url, server) = one_shot_server("200 OK", body).await;

    let provider = OpenAiCompatProvider::new("local", base_url, "test-model")
        .with_api_key(Some("secret-key".into()));
    let answer = provider
        .call("ping", Some("system ctx"), Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(answer, "pong");

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /v1/chat/completions"));
    assert!(request.to_lowercase().contains("authorization: bearer secret-key"));
    assert!(request.contains("\"test-model\""));
    assert!(request.contains("system ctx"));
}

#[tokio::test]
async fn non_success_status_is_reported() {
    let (base_url, server) =
        one_shot_server("503 Service Unavailable", "{\"error\":\"overloaded\"}".into()).await;

    let provider = OpenAiCompatProvider::new("local", base_url, "m");
    let err = provider
        .call("ping", None, Duration::from_secs(5))
        .await
        .unwrap_err();
    match err {
        ProviderError::Status { code, body } => {
            assert_eq!(code, 503);
            assert!(body.contains("overloaded"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn unreachable_server_is_transport_error() {
    // Bind then drop to get a port nothing listens on.
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let provider = OpenAiCompatProvider::new("local", format!("http://{addr}/v1"), "m");
    let err = provider
        .call("ping", None, Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Transport(_)), "{err:?}");
}

// ═══════════════════════════════════════════════════════════════════════
//  Storage
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn manager_writes_every_backend() {
    let dir = tempfile::tempdir().unwrap();
    let vault = Arc::new(VaultStorage::new("vault", dir.path()));
    let memory = Arc::new(MemoryStorage::new("memory"));

    let manager = StorageManager::new();
    manager.register("vault", vault.clone(), 0).await;
    manager.register("memory", memory.clone(), 1).await;

    let outcomes = manager
        .save_to_all(&json!({ "content": "shared note" }), Some("Inbox/shared.md"))
        .await;
    assert!(outcomes.iter().all(|o| o.success));

    assert_eq!(vault.load("Inbox/shared.md").await.unwrap()["content"], "shared note");
    assert_eq!(memory.load("Inbox/shared.md").await.unwrap()["content"], "shared note");
    assert!(dir.path().join("Inbox/shared.md").exists());
}
