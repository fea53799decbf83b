//! Integration tests for the Tejuska REST API.
//! Binds the real router to a random port and drives it over HTTP.

use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use std::sync::Arc;

use tejuska_api::{config::AppConfig, rest, AppContext};

type HmacSha256 = Hmac<Sha256>;

const STRIPE_SECRET: &str = "whsec_test_secret";
const RAZORPAY_SECRET: &str = "rzp_test_secret";

/// Deterministic test config: stub OPTIC, signing secrets set, no
/// notification channels configured. Env vars from the host must not leak in.
fn test_config() -> AppConfig {
    let data_dir = tempfile::tempdir().unwrap().keep();
    let mut config = AppConfig::new(None, Some(data_dir), Some("error".to_string()), None);
    config.openai_api_key = None;
    config.stripe_webhook_secret = Some(STRIPE_SECRET.to_string());
    config.razorpay_key_secret = Some(RAZORPAY_SECRET.to_string());
    config.slack_webhook_url = None;
    config.smtp.user = None;
    config.smtp.password = None;
    config.twilio.account_sid = None;
    config
}

/// Start the API server on a random port and return its base URL.
async fn start_test_server(config: AppConfig) -> String {
    let ctx = Arc::new(AppContext::new(Arc::new(config)));
    let router = rest::build_router(ctx);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn stripe_signature(payload: &[u8], timestamp: i64) -> String {
    let mut mac = HmacSha256::new_from_slice(STRIPE_SECRET.as_bytes()).unwrap();
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}

fn razorpay_signature(payload: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(RAZORPAY_SECRET.as_bytes()).unwrap();
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

#[tokio::test]
async fn health_reports_status_and_version() {
    let base = start_test_server(test_config()).await;
    let response = reqwest::get(format!("{base}/health")).await.unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn stub_query_returns_sql_for_tenant() {
    let base = start_test_server(test_config()).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/api/v1/query"))
        .json(&json!({ "tenant_id": "acme-corp", "query": "top services by cost" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["tenant_id"], "acme-corp");
    assert_eq!(body["query"], "top services by cost");
    let sql = body["sql"].as_str().unwrap();
    assert!(sql.contains("tenant_id = 'acme-corp'"));
    assert!(sql.contains("consolidated_billing"));
    assert!(body["answer"].as_str().unwrap().contains("OpenAI API key"));
}

#[tokio::test]
async fn empty_query_is_rejected() {
    let base = start_test_server(test_config()).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/api/v1/query"))
        .json(&json!({ "tenant_id": "acme-corp", "query": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn auto_terminate_is_accepted_immediately() {
    let base = start_test_server(test_config()).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/api/v1/auto-terminate"))
        .json(&json!({ "tenant_id": "acme-corp", "resource_id": "i-0abc123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 202);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Evaluation scheduled.");
    assert_eq!(body["tenant_id"], "acme-corp");
    assert_eq!(body["resource_id"], "i-0abc123");
    // dry_run defaults on — evaluation must never execute anything implicitly
    assert_eq!(body["dry_run"], true);
}

#[tokio::test]
async fn unknown_notification_channel_is_rejected() {
    let base = start_test_server(test_config()).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/api/v1/notify"))
        .json(&json!({
            "tenant_id": "acme-corp",
            "channel": "pager",
            "recipient": "oncall",
            "body": "cost spike",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 422);
}

#[tokio::test]
async fn unconfigured_channel_maps_to_500() {
    let base = start_test_server(test_config()).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/api/v1/notify"))
        .json(&json!({
            "tenant_id": "acme-corp",
            "channel": "slack",
            "recipient": "",
            "body": "cost spike",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 500);

    let body: Value = response.json().await.unwrap();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("Notification delivery failed"));
}

#[tokio::test]
async fn stripe_webhook_accepts_signed_event() {
    let base = start_test_server(test_config()).await;
    let client = reqwest::Client::new();

    let payload = json!({
        "type": "checkout.session.completed",
        "data": { "object": { "metadata": { "tenant_id": "acme-corp" } } },
    })
    .to_string();
    let signature = stripe_signature(payload.as_bytes(), chrono::Utc::now().timestamp());

    let response = client
        .post(format!("{base}/webhooks/stripe"))
        .header("stripe-signature", signature)
        .header("content-type", "application/json")
        .body(payload)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["received"], true);
}

#[tokio::test]
async fn stripe_webhook_rejects_tampered_payload() {
    let base = start_test_server(test_config()).await;
    let client = reqwest::Client::new();

    let signature =
        stripe_signature(br#"{"type":"checkout.session.completed"}"#, chrono::Utc::now().timestamp());

    let response = client
        .post(format!("{base}/webhooks/stripe"))
        .header("stripe-signature", signature)
        .header("content-type", "application/json")
        .body(r#"{"type":"customer.subscription.deleted"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn stripe_webhook_requires_configured_secret() {
    let mut config = test_config();
    config.stripe_webhook_secret = None;
    let base = start_test_server(config).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/webhooks/stripe"))
        .header("stripe-signature", "t=0,v1=00")
        .body("{}")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 500);
}

#[tokio::test]
async fn razorpay_webhook_accepts_signed_event() {
    let base = start_test_server(test_config()).await;
    let client = reqwest::Client::new();

    let payload = json!({
        "event": "payment.captured",
        "payload": { "payment": { "entity": { "id": "pay_123" } } },
    })
    .to_string();
    let signature = razorpay_signature(payload.as_bytes());

    let response = client
        .post(format!("{base}/webhooks/razorpay"))
        .header("x-razorpay-signature", signature)
        .header("content-type", "application/json")
        .body(payload)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["received"], true);
}

#[tokio::test]
async fn razorpay_webhook_rejects_missing_signature() {
    let base = start_test_server(test_config()).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/webhooks/razorpay"))
        .body(r#"{"event":"payment.captured"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}
