use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::error;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_TWILIO_BASE_URL: &str = "https://api.twilio.com";

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

// ─── SmtpConfig ───────────────────────────────────────────────────────────────

/// Email delivery configuration (`[smtp]` in config.toml).
///
/// Credentials come from `SMTP_USER` / `SMTP_PASSWORD` env vars first;
/// the TOML section is a fallback for host/port tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SmtpConfig {
    /// SMTP relay hostname (default: smtp.gmail.com).
    pub host: String,
    /// SMTP submission port, STARTTLS (default: 587).
    pub port: u16,
    /// Login username; also used as the From address.
    pub user: Option<String>,
    /// Login password / app password.
    pub password: Option<String>,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SMTP_HOST.to_string(),
            port: DEFAULT_SMTP_PORT,
            user: None,
            password: None,
        }
    }
}

// ─── TwilioConfig ─────────────────────────────────────────────────────────────

/// SMS delivery configuration (`[twilio]` in config.toml).
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TwilioConfig {
    /// Twilio account SID (`TWILIO_ACCOUNT_SID` env var).
    pub account_sid: Option<String>,
    /// Twilio auth token (`TWILIO_AUTH_TOKEN` env var).
    pub auth_token: Option<String>,
    /// E.164 sender number (`TWILIO_FROM_NUMBER` env var).
    pub from_number: Option<String>,
}

// ─── TOML config file ─────────────────────────────────────────────────────────

/// `{data_dir}/config.toml` — all fields are optional overrides.
/// Priority: CLI / env var  >  TOML  >  built-in default.
#[derive(Deserialize, Default)]
struct TomlConfig {
    /// HTTP server port (default: 8000).
    port: Option<u16>,
    /// Bind address (default: "127.0.0.1"; use "0.0.0.0" to serve the dashboard host).
    bind_address: Option<String>,
    /// Log level filter string, e.g. "debug", "info,tejuska_api=trace" (default: "info").
    log: Option<String>,
    /// Log output format: "pretty" (default, human-readable) | "json" (structured for log aggregators).
    log_format: Option<String>,
    /// OpenAI API key for OPTIC. Omit to run in deterministic stub mode.
    openai_api_key: Option<String>,
    /// Override the OpenAI API base URL (default: https://api.openai.com).
    openai_base_url: Option<String>,
    /// Stripe webhook signing secret (whsec_...).
    stripe_webhook_secret: Option<String>,
    /// Razorpay key secret used to sign webhook payloads.
    razorpay_key_secret: Option<String>,
    /// Slack incoming-webhook URL for the `slack` notification channel.
    slack_webhook_url: Option<String>,
    /// Override the Twilio API base URL (default: https://api.twilio.com).
    twilio_base_url: Option<String>,
    /// Email delivery settings (`[smtp]`).
    smtp: Option<SmtpConfig>,
    /// SMS delivery settings (`[twilio]`).
    twilio: Option<TwilioConfig>,
}

fn load_toml(data_dir: &Path) -> Option<TomlConfig> {
    let path = data_dir.join("config.toml");
    let contents = std::fs::read_to_string(&path).ok()?;
    match toml::from_str::<TomlConfig>(&contents) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            error!(path = %path.display(), err = %e, "failed to parse config.toml — using defaults");
            None
        }
    }
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

// ─── AppConfig ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub bind_address: String,
    pub data_dir: PathBuf,
    pub log: String,
    /// Log output format: "pretty" (default) | "json".
    pub log_format: String,
    /// OpenAI API key (`OPENAI_API_KEY` env var).
    /// None means OPTIC answers from the deterministic stub — no network calls.
    pub openai_api_key: Option<String>,
    /// OpenAI API base URL (`OPENAI_BASE_URL` env var).
    pub openai_base_url: String,
    /// Stripe webhook signing secret (`STRIPE_WEBHOOK_SECRET` env var).
    /// None means /webhooks/stripe refuses all deliveries with HTTP 500.
    pub stripe_webhook_secret: Option<String>,
    /// Razorpay key secret (`RAZORPAY_KEY_SECRET` env var).
    pub razorpay_key_secret: Option<String>,
    /// Slack incoming-webhook URL (`SLACK_WEBHOOK_URL` env var).
    pub slack_webhook_url: Option<String>,
    /// Twilio API base URL (`TWILIO_BASE_URL` env var; override in tests).
    pub twilio_base_url: String,
    pub smtp: SmtpConfig,
    pub twilio: TwilioConfig,
}

impl AppConfig {
    /// Build config from CLI/env args + optional TOML file.
    ///
    /// Priority (highest to lowest):
    ///   1. CLI / env — passed as `Some(value)` from clap
    ///   2. TOML file at `{data_dir}/config.toml`
    ///   3. Built-in defaults
    pub fn new(
        port: Option<u16>,
        data_dir: Option<PathBuf>,
        log: Option<String>,
        bind_address: Option<String>,
    ) -> Self {
        let data_dir = data_dir.unwrap_or_else(default_data_dir);

        // Load TOML as the lowest-priority override layer
        let toml = load_toml(&data_dir).unwrap_or_default();

        let port = port.or(toml.port).unwrap_or(DEFAULT_PORT);
        let log = log.or(toml.log).unwrap_or_else(|| "info".to_string());

        let bind_address = bind_address
            .or_else(|| env_nonempty("TEJUSKA_BIND"))
            .or(toml.bind_address)
            .unwrap_or_else(default_bind_address);

        let log_format = env_nonempty("TEJUSKA_LOG_FORMAT")
            .or(toml.log_format)
            .unwrap_or_else(|| "pretty".to_string());

        let openai_api_key = env_nonempty("OPENAI_API_KEY").or(toml.openai_api_key);
        let openai_base_url = env_nonempty("OPENAI_BASE_URL")
            .or(toml.openai_base_url)
            .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string());

        let stripe_webhook_secret =
            env_nonempty("STRIPE_WEBHOOK_SECRET").or(toml.stripe_webhook_secret);
        let razorpay_key_secret =
            env_nonempty("RAZORPAY_KEY_SECRET").or(toml.razorpay_key_secret);
        let slack_webhook_url = env_nonempty("SLACK_WEBHOOK_URL").or(toml.slack_webhook_url);

        let twilio_base_url = env_nonempty("TWILIO_BASE_URL")
            .or(toml.twilio_base_url)
            .unwrap_or_else(|| DEFAULT_TWILIO_BASE_URL.to_string());

        let mut smtp = toml.smtp.unwrap_or_default();
        if let Some(host) = env_nonempty("SMTP_HOST") {
            smtp.host = host;
        }
        if let Some(port) = env_nonempty("SMTP_PORT").and_then(|p| p.parse().ok()) {
            smtp.port = port;
        }
        smtp.user = env_nonempty("SMTP_USER").or(smtp.user);
        smtp.password = env_nonempty("SMTP_PASSWORD").or(smtp.password);

        let mut twilio = toml.twilio.unwrap_or_default();
        twilio.account_sid = env_nonempty("TWILIO_ACCOUNT_SID").or(twilio.account_sid);
        twilio.auth_token = env_nonempty("TWILIO_AUTH_TOKEN").or(twilio.auth_token);
        twilio.from_number = env_nonempty("TWILIO_FROM_NUMBER").or(twilio.from_number);

        Self {
            port,
            bind_address,
            data_dir,
            log,
            log_format,
            openai_api_key,
            openai_base_url,
            stripe_webhook_secret,
            razorpay_key_secret,
            slack_webhook_url,
            twilio_base_url,
            smtp,
            twilio,
        }
    }
}

fn default_data_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        // ~/Library/Application Support/tejuska
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("tejuska");
        }
    }
    #[cfg(target_os = "linux")]
    {
        // $XDG_DATA_HOME/tejuska or ~/.local/share/tejuska
        if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
            return PathBuf::from(xdg).join("tejuska");
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join(".local")
                .join("share")
                .join("tejuska");
        }
    }
    #[cfg(target_os = "windows")]
    {
        // %APPDATA%\tejuska
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata).join("tejuska");
        }
    }
    // Fallback
    PathBuf::from(".tejuska")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = AppConfig::new(None, Some(dir.path().to_path_buf()), None, None);
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert_eq!(cfg.smtp.host, DEFAULT_SMTP_HOST);
        assert_eq!(cfg.smtp.port, DEFAULT_SMTP_PORT);
        assert_eq!(cfg.log, "info");
        assert_eq!(cfg.log_format, "pretty");
    }

    #[test]
    fn toml_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            r#"
port = 9100
log = "debug"

[smtp]
host = "mail.internal"
port = 2525
"#,
        )
        .unwrap();
        let cfg = AppConfig::new(None, Some(dir.path().to_path_buf()), None, None);
        assert_eq!(cfg.port, 9100);
        assert_eq!(cfg.log, "debug");
        assert_eq!(cfg.smtp.host, "mail.internal");
        assert_eq!(cfg.smtp.port, 2525);
    }

    #[test]
    fn cli_beats_toml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "port = 9100\n").unwrap();
        let cfg = AppConfig::new(
            Some(9200),
            Some(dir.path().to_path_buf()),
            None,
            Some("0.0.0.0".to_string()),
        );
        assert_eq!(cfg.port, 9200);
        assert_eq!(cfg.bind_address, "0.0.0.0");
    }

    #[test]
    fn malformed_toml_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "port = \"not a port").unwrap();
        let cfg = AppConfig::new(None, Some(dir.path().to_path_buf()), None, None);
        assert_eq!(cfg.port, DEFAULT_PORT);
    }
}
