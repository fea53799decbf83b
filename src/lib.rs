pub mod config;
pub mod engine;
pub mod notify;
pub mod rest;

use std::sync::Arc;

use config::AppConfig;
use engine::AiEngine;
use notify::Notifier;

/// Shared application state passed to every REST handler and background task.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    /// OPTIC (text-to-SQL) and ABACUS (termination policy) engine.
    pub engine: Arc<AiEngine>,
    /// Unified Slack / email / SMS dispatcher.
    pub notifier: Arc<Notifier>,
    /// Shared outbound HTTP client (Slack, Twilio, OpenAI).
    pub http: reqwest::Client,
    pub started_at: std::time::Instant,
}

impl AppContext {
    pub fn new(config: Arc<AppConfig>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        let engine = Arc::new(AiEngine::new(config.clone(), http.clone()));
        let notifier = Arc::new(Notifier::new(config.clone(), http.clone()));
        Self {
            config,
            engine,
            notifier,
            http,
            started_at: std::time::Instant::now(),
        }
    }
}
