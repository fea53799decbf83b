// rest/routes/notify.rs — POST /api/v1/notify (Slack / email / SMS dispatch).

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::error;

use crate::notify::Channel;
use crate::rest::error::ApiError;
use crate::AppContext;

#[derive(Deserialize)]
pub struct NotificationRequest {
    pub tenant_id: String,
    /// One of "slack" | "email" | "sms"; anything else is rejected at
    /// deserialization time.
    pub channel: Channel,
    pub recipient: String,
    pub subject: Option<String>,
    pub body: String,
}

pub async fn send_notification(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<NotificationRequest>,
) -> Result<Json<Value>, ApiError> {
    match ctx
        .notifier
        .send(
            body.channel,
            &body.recipient,
            body.subject.as_deref(),
            &body.body,
        )
        .await
    {
        Ok(detail) => Ok(Json(json!({ "success": true, "detail": detail }))),
        Err(e) => {
            error!(channel = %body.channel, err = %e, "notification failed");
            Err(ApiError::internal(format!(
                "Notification delivery failed: {e}"
            )))
        }
    }
}
