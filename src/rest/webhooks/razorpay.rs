// rest/webhooks/razorpay.rs — POST /webhooks/razorpay.
//
// Razorpay sends `X-Razorpay-Signature`: hex HMAC-SHA256 of the raw body
// keyed with the account's key secret. No timestamp scheme — the header is
// the whole check.

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

/// Constant-time verification of the hex signature over the raw payload.
pub fn verify_signature(payload: &[u8], signature_hex: &str, secret: &str) -> bool {
    let Ok(signature) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(&signature).is_ok()
}

/// Handle Razorpay payment events:
///   - payment.captured
///   - subscription.cancelled
pub async fn razorpay_webhook(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    payload: Bytes,
) -> Result<Json<Value>, ApiError> {
    let secret = ctx
        .config
        .razorpay_key_secret
        .as_deref()
        .ok_or_else(|| ApiError::internal("RAZORPAY_KEY_SECRET is not configured."))?;

    let signature = headers
        .get("x-razorpay-signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if !verify_signature(&payload, signature, secret) {
        warn!("Razorpay signature verification failed");
        return Err(ApiError::bad_request("Invalid Razorpay signature."));
    }

    let event: Value = serde_json::from_slice(&payload)
        .map_err(|_| ApiError::bad_request("Malformed Razorpay event payload."))?;
    let event_type = event["event"].as_str().unwrap_or_default();

    match event_type {
        "payment.captured" => {
            let payment_id = event["payload"]["payment"]["entity"]["id"].as_str();
            info!(payment = ?payment_id, "Razorpay payment captured");
            // TODO: update subscription plan once the DB layer exists
        }
        "subscription.cancelled" => {
            let subscription_id = event["payload"]["subscription"]["entity"]["id"].as_str();
            info!(subscription = ?subscription_id, "Razorpay subscription cancelled");
        }
        other => {
            debug!(event_type = other, "unhandled Razorpay event");
        }
    }

    Ok(Json(json!({ "received": true })))
}
