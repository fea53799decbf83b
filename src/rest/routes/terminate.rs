// rest/routes/terminate.rs — POST /api/v1/auto-terminate (ABACUS automation).

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::AppContext;

fn default_dry_run() -> bool {
    true
}

#[derive(Deserialize)]
pub struct AutoTerminationRequest {
    pub tenant_id: String,
    /// Cloud resource ID to evaluate.
    pub resource_id: String,
    /// If true, simulate without executing (default).
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,
}

/// Accepts the request immediately; the GNN + PPO evaluation runs as a
/// fire-and-forget background task that only logs its recommendation.
pub async fn auto_terminate(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<AutoTerminationRequest>,
) -> (StatusCode, Json<Value>) {
    info!(
        tenant = %body.tenant_id,
        resource = %body.resource_id,
        dry_run = body.dry_run,
        "auto-termination request"
    );

    let engine = ctx.engine.clone();
    let AutoTerminationRequest {
        tenant_id,
        resource_id,
        dry_run,
    } = body;
    {
        let tenant_id = tenant_id.clone();
        let resource_id = resource_id.clone();
        tokio::spawn(async move {
            engine
                .evaluate_and_terminate(&tenant_id, &resource_id, dry_run)
                .await;
        });
    }

    (
        StatusCode::ACCEPTED,
        Json(json!({
            "message": "Evaluation scheduled.",
            "tenant_id": tenant_id,
            "resource_id": resource_id,
            "dry_run": dry_run,
        })),
    )
}
