// rest/routes/query.rs — POST /api/v1/query (OPTIC natural-language cost queries).

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use crate::rest::error::ApiError;
use crate::AppContext;

const MAX_QUERY_LEN: usize = 2000;

#[derive(Deserialize)]
pub struct NlpQueryRequest {
    pub tenant_id: String,
    /// Natural-language cost question, 1-2000 chars.
    pub query: String,
}

#[derive(Serialize)]
pub struct NlpQueryResponse {
    pub tenant_id: String,
    pub query: String,
    pub sql: String,
    pub answer: String,
}

pub async fn natural_language_query(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<NlpQueryRequest>,
) -> Result<Json<NlpQueryResponse>, ApiError> {
    if body.query.is_empty() || body.query.len() > MAX_QUERY_LEN {
        return Err(ApiError::bad_request(format!(
            "query must be 1-{MAX_QUERY_LEN} characters"
        )));
    }

    info!(tenant = %body.tenant_id, "NLP query received");

    match ctx
        .engine
        .translate_and_execute(&body.tenant_id, &body.query)
        .await
    {
        Ok((sql, answer)) => Ok(Json(NlpQueryResponse {
            tenant_id: body.tenant_id,
            query: body.query,
            sql,
            answer,
        })),
        Err(e) => {
            error!(err = %e, "NLP query failed");
            Err(ApiError::internal(
                "Query processing failed. Please try again.",
            ))
        }
    }
}
