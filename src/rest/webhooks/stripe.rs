// rest/webhooks/stripe.rs — POST /webhooks/stripe.
//
// Verifies the `Stripe-Signature` header: `t=<unix>,v1=<hex>,...` where each
// v1 entry is HMAC-SHA256 over `"{t}.{raw body}"`. Deliveries older than the
// tolerance window are rejected to block replays.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::rest::error::ApiError;
use crate::AppContext;

type HmacSha256 = Hmac<Sha256>;

/// Maximum accepted age of a signed delivery, matching Stripe's default.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, PartialEq, Eq)]
pub enum SignatureError {
    MalformedHeader,
    Expired,
    Mismatch,
}

/// Verify a `Stripe-Signature` header against the raw payload.
///
/// `now` is the verifier's clock as a unix timestamp; injected so expiry
/// behavior is testable.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
) -> Result<(), SignatureError> {
    let mut timestamp: Option<i64> = None;
    let mut candidates: Vec<&str> = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => timestamp = v.parse().ok(),
            Some(("v1", v)) => candidates.push(v),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MalformedHeader)?;
    if candidates.is_empty() {
        return Err(SignatureError::MalformedHeader);
    }
    if (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(SignatureError::Expired);
    }

    for candidate in candidates {
        let Ok(sig) = hex::decode(candidate) else {
            continue;
        };
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| SignatureError::MalformedHeader)?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        if mac.verify_slice(&sig).is_ok() {
            return Ok(());
        }
    }
    Err(SignatureError::Mismatch)
}

/// Handle Stripe lifecycle events:
///   - checkout.session.completed
///   - customer.subscription.updated
///   - customer.subscription.deleted
pub async fn stripe_webhook(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    payload: Bytes,
) -> Result<Json<Value>, ApiError> {
    let secret = ctx
        .config
        .stripe_webhook_secret
        .as_deref()
        .ok_or_else(|| ApiError::internal("STRIPE_WEBHOOK_SECRET is not configured."))?;

    let sig_header = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let now = chrono::Utc::now().timestamp();
    if let Err(e) = verify_signature(&payload, sig_header, secret, now) {
        warn!(reason = ?e, "Stripe signature verification failed");
        return Err(ApiError::bad_request("Invalid Stripe signature."));
    }

    let event: Value = serde_json::from_slice(&payload)
        .map_err(|_| ApiError::bad_request("Malformed Stripe event payload."))?;
    let event_type = event["type"].as_str().unwrap_or_default();
    let data_object = &event["data"]["object"];

    match event_type {
        "checkout.session.completed" => {
            let tenant_id = data_object["metadata"]["tenant_id"].as_str();
            info!(tenant = ?tenant_id, "checkout completed");
            // TODO: update subscriptions table to plan='enterprise' once the DB layer exists
        }
        "customer.subscription.updated" => {
            let subscription_id = data_object["id"].as_str();
            let new_status = data_object["status"].as_str();
            info!(subscription = ?subscription_id, status = ?new_status, "subscription updated");
        }
        "customer.subscription.deleted" => {
            let subscription_id = data_object["id"].as_str();
            info!(subscription = ?subscription_id, "subscription cancelled");
        }
        other => {
            debug!(event_type = other, "unhandled Stripe event type");
        }
    }

    Ok(Json(json!({ "received": true })))
}
