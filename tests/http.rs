//! HTTP API end to end against a live server on a free port.

use std::sync::Arc;

use mcp_runtime::config::{Config, RateLimitConfig, ServerConfig};
use mcp_runtime::runtime::Runtime;
use mcp_runtime::server::serve;
use serde_json::{json, Value};

// ─── Helpers ────────────────────────────────────────────────────────

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not become ready within 5 seconds");
}

/// Start a seeded runtime; returns its base URL and the server task.
async fn start_server() -> (String, tokio::task::JoinHandle<()>) {
    start_server_with(RateLimitConfig::default()).await
}

async fn start_server_with(rate_limit: RateLimitConfig) -> (String, tokio::task::JoinHandle<()>) {
    let port = find_free_port();
    let server = ServerConfig {
        bind: format!("127.0.0.1:{}", port),
        rate_limit,
    };
    let runtime = Arc::new(Runtime::from_config(&Config::default()).await.unwrap());

    let handle = tokio::spawn(async move {
        serve(runtime, &server).await.ok();
    });
    wait_for_server(port).await;
    (format!("http://127.0.0.1:{}", port), handle)
}

// ─── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_health_and_security_headers() {
    let (base, server) = start_server().await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{}/health", base)).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let headers = resp.headers().clone();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(
        headers["referrer-policy"],
        "strict-origin-when-cross-origin"
    );
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    server.abort();
}

#[tokio::test]
async fn test_tool_catalog_and_execution() {
    let (base, server) = start_server().await;
    let client = reqwest::Client::new();

    let tools: Value = client
        .get(format!("{}/api/mcp/tools", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(tools.as_array().unwrap().len(), 3);
    assert_eq!(tools[0]["name"], "web_search");

    let resp = client
        .get(format!("{}/api/mcp/tools/99", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let err: Value = resp.json().await.unwrap();
    assert_eq!(err["error"]["code"], "not_found");

    let outcome: Value = client
        .post(format!("{}/api/mcp/tools/1/execute", base))
        .json(&json!({ "params": { "query": "axum", "limit": 3 } }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(outcome["success"], true);
    assert_eq!(outcome["data"]["results"].as_array().unwrap().len(), 3);
    assert!(outcome["executionTime"].is_u64());

    // A handler failure is still a 200 with success: false.
    let resp = client
        .post(format!("{}/api/mcp/tools/1/execute", base))
        .json(&json!({ "params": {} }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let outcome: Value = resp.json().await.unwrap();
    assert_eq!(outcome["success"], false);

    let resp = client
        .post(format!("{}/api/mcp/tools/1/execute", base))
        .json(&json!({ "params": [1, 2] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let ledger: Value = client
        .get(format!("{}/api/mcp/requests", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ledger.as_array().unwrap().len(), 2);
    assert_eq!(ledger[1]["status"], "failed");

    server.abort();
}

#[tokio::test]
async fn test_tool_registration_conflict_and_update() {
    let (base, server) = start_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/mcp/tools", base))
        .json(&json!({ "name": "web_search", "description": "again" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    let created: Value = client
        .post(format!("{}/api/mcp/tools", base))
        .json(&json!({ "name": "translator", "description": "Translate text" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(created["id"], 4);
    assert_eq!(created["category"], "general");

    let updated: Value = client
        .patch(format!("{}/api/mcp/tools/4", base))
        .json(&json!({ "enabled": false }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(updated["enabled"], false);

    let available: Value = client
        .get(format!("{}/api/mcp/tools/available", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(available.as_array().unwrap().len(), 3);

    let resp = client
        .patch(format!("{}/api/mcp/tools/77", base))
        .json(&json!({ "enabled": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    server.abort();
}

#[tokio::test]
async fn test_non_json_body_rejected() {
    let (base, server) = start_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/mcp/tools/1/execute", base))
        .header("content-type", "text/plain")
        .body("query=rust")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let err: Value = resp.json().await.unwrap();
    assert_eq!(err["error"]["code"], "bad_request");

    server.abort();
}

#[tokio::test]
async fn test_extraction_and_context_queries() {
    let (base, server) = start_server().await;
    let client = reqwest::Client::new();

    let results: Value = client
        .post(format!("{}/api/mcp/providers/extract", base))
        .json(&json!({}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(results.as_array().unwrap().len() >= 3);

    let cache: Value = client
        .get(format!("{}/api/mcp/context?providerId=3", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cache.as_array().unwrap().len(), 1);
    assert_eq!(cache[0]["key"], "api:https://api.example.com/docs");

    let hits: Value = client
        .get(format!("{}/api/mcp/context/search?q=MCP%20simulator", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(!hits.as_array().unwrap().is_empty());

    let resp = client
        .get(format!("{}/api/mcp/context/search", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .get(format!(
            "{}/api/mcp/context/key/git:https:%2F%2Fgithub.com%2Fexample%2Frepo:main",
            base
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let item: Value = resp.json().await.unwrap();
    assert_eq!(item["providerId"], 1);

    let resp = client
        .get(format!("{}/api/mcp/context/key/file:missing.ts", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = client
        .post(format!("{}/api/mcp/providers/42/extract", base))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    server.abort();
}

#[tokio::test]
async fn test_webhook_delivery() {
    let (base, server) = start_server().await;
    let client = reqwest::Client::new();

    let payload = json!({
        "action": "opened",
        "pull_request": {
            "number": 21,
            "title": "Docs",
            "body": "",
            "user": { "login": "octo" },
            "head": { "ref": "docs" }
        },
        "repository": { "clone_url": "https://github.com/example/repo" }
    });

    let resp = client
        .post(format!("{}/api/github/webhook", base))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400, "event header is required");

    let resp = client
        .post(format!("{}/api/github/webhook", base))
        .header("X-GitHub-Event", "pull_request")
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Webhook processed");

    let integrations: Value = client
        .get(format!("{}/api/github/integrations", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(integrations.as_array().unwrap().len(), 1);
    assert_eq!(integrations[0]["status"], "completed");
    assert_eq!(integrations[0]["branch"], "docs");
    assert_eq!(integrations[0]["prNumber"], 21);

    server.abort();
}

#[tokio::test]
async fn test_api_rate_limit() {
    let (base, server) = start_server_with(RateLimitConfig {
        enabled: true,
        max_requests: 3,
        window_secs: 900,
    })
    .await;
    let client = reqwest::Client::new();

    for _ in 0..3 {
        let resp = client
            .get(format!("{}/api/mcp/tools", base))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
    }

    let resp = client
        .get(format!("{}/api/mcp/requests", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 429);
    let retry_after: u64 = resp.headers()["retry-after"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after >= 1);
    let err: Value = resp.json().await.unwrap();
    assert_eq!(err["error"]["code"], "too_many_requests");
    assert_eq!(
        err["error"]["message"],
        "Too many requests, please try again later"
    );

    // Health checks are outside the quota.
    let resp = client.get(format!("{}/health", base)).send().await.unwrap();
    assert_eq!(resp.status(), 200);

    server.abort();
}

#[tokio::test]
async fn test_rate_limit_disabled() {
    let (base, server) = start_server_with(RateLimitConfig {
        enabled: false,
        max_requests: 1,
        window_secs: 900,
    })
    .await;
    let client = reqwest::Client::new();

    for _ in 0..5 {
        let resp = client
            .get(format!("{}/api/mcp/tools", base))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
    }

    server.abort();
}
