//! OPTIC (text-to-SQL) and ABACUS (autonomous termination) engine.
//!
//! OPTIC translates a natural-language cost question into SQL over the
//! `consolidated_billing` table. With no `OPENAI_API_KEY` configured it
//! answers from a deterministic stub so the API works offline and in tests.
//!
//! ABACUS scores a cloud resource with the GNN + PPO pipeline and logs a
//! keep/terminate recommendation. Feature values are a fixed synthetic
//! vector until real billing ingestion lands.

pub mod nn;

use std::fmt;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{info, warn};

use crate::config::AppConfig;
use nn::{PpoPolicy, ResourceGnn, FEATURE_DIM};

/// Synthetic resource feature vector:
/// [cpu_util, mem_util, net_in, net_out, cost_per_hr, age_days, tag_prod, reserved]
pub const SYNTHETIC_FEATURES: [f32; FEATURE_DIM] = [0.05, 0.10, 0.002, 0.001, 0.023, 45.0, 0.0, 0.0];

const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";
const SQL_SYSTEM_PROMPT: &str = "You are a FinOps SQL expert. The user will ask a question about cloud costs. \
     You will generate a PostgreSQL query against the 'consolidated_billing' table. \
     Always filter by tenant_id. Return ONLY the SQL statement, nothing else.";
const ANSWER_SYSTEM_PROMPT: &str = "The following SQL was run to answer the user's question. \
     Provide a concise, professional plain-English summary of the result. \
     If you do not have the actual data, describe what the query will return.";

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("OpenAI request failed: {0}")]
    OpenAi(#[from] reqwest::Error),
    #[error("OpenAI returned an unexpected response shape")]
    MalformedResponse,
}

/// ABACUS recommendation for a single resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationDecision {
    Keep,
    Terminate,
}

impl fmt::Display for TerminationDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keep => write!(f, "KEEP"),
            Self::Terminate => write!(f, "TERMINATE"),
        }
    }
}

// ─── AiEngine ─────────────────────────────────────────────────────────────────

pub struct AiEngine {
    config: Arc<AppConfig>,
    http: reqwest::Client,
    gnn: ResourceGnn,
    policy: PpoPolicy,
}

impl AiEngine {
    pub fn new(config: Arc<AppConfig>, http: reqwest::Client) -> Self {
        let mut rng = nn::weight_rng();
        let gnn = ResourceGnn::new(&mut rng);
        let policy = PpoPolicy::new(&mut rng);
        info!("AiEngine initialised (GNN + PPO in eval mode)");
        Self {
            config,
            http,
            gnn,
            policy,
        }
    }

    // ─── OPTIC: text-to-SQL ──────────────────────────────────────────────────

    /// Translate a natural-language query to SQL and a plain-English answer.
    ///
    /// Returns `(sql, answer)`. Without an API key this is the deterministic
    /// stub; with one it makes two Chat Completions calls (one to generate
    /// the SQL, one to summarise it).
    pub async fn translate_and_execute(
        &self,
        tenant_id: &str,
        query: &str,
    ) -> Result<(String, String), EngineError> {
        let Some(api_key) = self.config.openai_api_key.as_deref() else {
            warn!("OPENAI_API_KEY not set; returning stub response");
            return Ok(stub_response(tenant_id));
        };

        let sql = self
            .chat_completion(
                api_key,
                SQL_SYSTEM_PROMPT,
                &format!("tenant_id='{tenant_id}'. Question: {query}"),
                0.0,
                512,
            )
            .await?;

        let answer = self
            .chat_completion(api_key, ANSWER_SYSTEM_PROMPT, &format!("SQL: {sql}"), 0.3, 256)
            .await?;

        Ok((sql, answer))
    }

    async fn chat_completion(
        &self,
        api_key: &str,
        system: &str,
        user: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, EngineError> {
        let url = format!("{}{}", self.config.openai_base_url, CHAT_COMPLETIONS_PATH);
        let body = json!({
            "model": "gpt-4o",
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "temperature": temperature,
            "max_tokens": max_tokens,
        });

        let response: Value = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.trim().to_string())
            .ok_or(EngineError::MalformedResponse)
    }

    // ─── ABACUS: autonomous termination ──────────────────────────────────────

    /// Score a resource graph with the GCN: per-node termination logits.
    ///
    /// `features` is N × FEATURE_DIM, `adjacency` N × N. Feeds the batch
    /// variant of the pipeline; single-resource requests go through
    /// [`AiEngine::evaluate`] instead.
    pub fn score_graph(&self, features: &[Vec<f32>], adjacency: &[Vec<f32>]) -> Vec<Vec<f32>> {
        self.gnn.forward(features, adjacency)
    }

    /// Run the policy forward pass on the synthetic feature vector.
    pub fn evaluate(&self) -> TerminationDecision {
        let (logits, _value) = self.policy.forward(&SYNTHETIC_FEATURES);
        match nn::argmax(&logits) {
            1 => TerminationDecision::Terminate,
            _ => TerminationDecision::Keep,
        }
    }

    /// Evaluate a resource and, if the policy recommends it and `dry_run` is
    /// off, execute the termination. Runs as a fire-and-forget background
    /// task; outcomes are logged, never returned to the caller.
    pub async fn evaluate_and_terminate(&self, tenant_id: &str, resource_id: &str, dry_run: bool) {
        info!(
            tenant = tenant_id,
            resource = resource_id,
            dry_run,
            "evaluating resource for termination"
        );

        let decision = self.evaluate();
        info!(
            resource = resource_id,
            recommendation = %decision,
            dry_run,
            "PPO recommendation"
        );

        if decision == TerminationDecision::Terminate && !dry_run {
            // Cloud-provider termination call goes here once credentials
            // and the resource inventory exist.
            info!(
                tenant = tenant_id,
                resource = resource_id,
                "executing termination"
            );
        } else {
            info!(recommendation = %decision, dry_run, "no action taken");
        }
    }
}

fn stub_response(tenant_id: &str) -> (String, String) {
    let sql = format!(
        "SELECT service_name, SUM(billed_cost) AS total_cost \
         FROM consolidated_billing \
         WHERE tenant_id = '{tenant_id}' \
         GROUP BY service_name ORDER BY total_cost DESC LIMIT 10;"
    );
    let answer = "Your top 10 cloud services by billed cost for this period are listed. \
                  Connect an OpenAI API key to enable live natural-language answers."
        .to_string();
    (sql, answer)
}
