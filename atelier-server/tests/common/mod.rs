//! Shared fixtures: an in-memory store and an assistant talking to a mock Ollama.

#![allow(dead_code)]

use std::sync::Arc;

use atelier_core::auth::hash_password;
use atelier_core::config::AssistantConfig;
use atelier_core::{db, LlmClientConfig, OllamaClient};
use atelier_server::Assistant;
use sqlx::SqlitePool;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Users 1 (asha) and 2 (ravi), three products, order 12 owned by user 1.
/// Same rows as `store::test_support::seeded_pool`.
pub async fn seeded_pool() -> SqlitePool {
    let pool = db::create_memory_pool().await.unwrap();
    db::init_schema(&pool).await.unwrap();

    for (id, name) in [(1_i64, "asha"), (2, "ravi")] {
        sqlx::query("INSERT INTO USERS (USER_ID, USERNAME, EMAIL, PASSWORD) VALUES (?, ?, ?, ?)")
            .bind(id)
            .bind(name)
            .bind(format!("{}@example.com", name))
            .bind(hash_password("password123"))
            .execute(&pool)
            .await
            .unwrap();
    }

    sqlx::query(
        "INSERT INTO PRODUCTS (P_ID, NAME, PRICE, COLOUR, BRAND, IMG, AVG_RATING, DESCRIPTION, TOP_TYPE, SEARCH_TEXT) VALUES
            ('1020', 'Floral Kurta', 1299.0, 'blue', 'Libas', 'https://img.example.com/1020.jpg', 4.5, 'Blue floral kurta', 'kurta', 'floral kurta libas blue floral festive cotton'),
            ('1021', 'Striped Shirt', 899.0, 'white', 'Roadster', 'https://img.example.com/1021.jpg', 3.9, 'White striped shirt', 'shirt', 'striped shirt roadster white striped casual linen'),
            ('1022', 'Silk Saree', 2499.0, 'green', 'Mitera', 'https://img.example.com/1022.jpg', 4.8, 'Green silk saree', 'saree', 'silk saree mitera green solid festive silk')",
    )
    .execute(&pool)
    .await
    .unwrap();

    sqlx::query(
        "INSERT INTO ORDERS (ORDER_ID, PRODUCT_ID, USER_ID, PRODUCT_DESCRIPTION, ORDER_DATE, SHIPPING_DATE, DELIVERY_DATE, AMOUNT, STATUS, DELIVERY_PARTNER_NO)
         VALUES (12, '1020', 1, 'Floral Kurta', '2024-05-01', '2024-05-03', '2024-05-10', 1299.0, 'shipped', '9876543210')",
    )
    .execute(&pool)
    .await
    .unwrap();

    pool
}

/// Assistant backed by a real `OllamaClient` pointed at `server`, without retries.
pub fn assistant_for(pool: SqlitePool, server: &MockServer) -> Assistant {
    let config = LlmClientConfig {
        max_retries: 0,
        retry_delay_ms: 1,
        timeout_seconds: 5,
        ..LlmClientConfig::new(server.uri(), "gemma:2b")
    };
    let client = OllamaClient::new(config).unwrap();
    Assistant::new(pool, Arc::new(client), AssistantConfig::default())
}

/// Answer `/api/generate` calls whose body contains `needle` with `reply`.
/// Earlier mounts win when several match.
pub async fn reply_when(server: &MockServer, needle: &str, reply: &str) {
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_string_contains(needle))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "response": reply,
            "done": true
        })))
        .mount(server)
        .await;
}

/// Answer the router's call for a turn whose input contains `input` with `decision`.
pub async fn route_when(server: &MockServer, input: &str, decision: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_string_contains("Customer message"))
        .and(body_string_contains(input))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "response": decision.to_string(),
            "done": true
        })))
        .mount(server)
        .await;
}

/// Replies with the prompt it was sent, so tests can see what a handler asked.
pub struct EchoPrompt;

impl Respond for EchoPrompt {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap_or_default();
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "response": body["prompt"].as_str().unwrap_or_default(),
            "done": true
        }))
    }
}

/// Echo every `/api/generate` call not answered by an earlier mount.
pub async fn echo_otherwise(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(EchoPrompt)
        .mount(server)
        .await;
}

/// Every model call fails, as if the model server were overloaded.
pub async fn model_unavailable(server: &MockServer) {
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
            "error": "model is loading"
        })))
        .mount(server)
        .await;
}

pub async fn order_count(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM ORDERS")
        .fetch_one(pool)
        .await
        .unwrap()
}
