//! Tejuska Cloud Intelligence — FinOps backend API server.
//!
//! Usage:
//! - Default: `tejuska-api`
//! - Custom port: `tejuska-api --port 9000`
//! - JSON logs to file: `TEJUSKA_LOG_FORMAT=json tejuska-api --log-file /var/log/tejuska/api.log`

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use tejuska_api::{config::AppConfig, rest, AppContext};

#[derive(Parser)]
#[command(
    name = "tejuska-api",
    about = "Tejuska Cloud Intelligence — FinOps backend API",
    version
)]
struct Args {
    /// HTTP server port
    #[arg(long, env = "TEJUSKA_PORT")]
    port: Option<u16>,

    /// Data directory for config.toml
    #[arg(long, env = "TEJUSKA_DATA_DIR")]
    data_dir: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "TEJUSKA_LOG")]
    log: Option<String>,

    /// Bind address (default: 127.0.0.1; use 0.0.0.0 to serve the dashboard host)
    #[arg(long, env = "TEJUSKA_BIND")]
    bind_address: Option<String>,

    /// Write logs to this file path (rotated daily). Optional.
    #[arg(long, env = "TEJUSKA_LOG_FILE")]
    log_file: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Arc::new(AppConfig::new(
        args.port,
        args.data_dir,
        args.log,
        args.bind_address,
    ));

    let _log_guard = setup_logging(&config.log, args.log_file.as_deref(), &config.log_format);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.port,
        "Tejuska Cloud Intelligence backend starting"
    );
    if config.openai_api_key.is_none() {
        info!("OPENAI_API_KEY not set — OPTIC runs in stub mode");
    }

    let ctx = Arc::new(AppContext::new(config));

    tokio::select! {
        result = rest::start_rest_server(ctx) => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Tejuska Cloud Intelligence backend shutting down");
        }
    }

    Ok(())
}

/// Initialise the tracing subscriber.
///
/// Returns a `WorkerGuard` that must stay alive for the process lifetime
/// when file logging is enabled.
///
/// `log_format` may be `"pretty"` (default, human-readable compact format) or
/// `"json"` (structured JSON for log aggregators).
///
/// If the log directory cannot be created, falls back to stdout-only logging
/// with a warning — never panics.
fn setup_logging(
    log_level: &str,
    log_file: Option<&std::path::Path>,
    log_format: &str,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let use_json = log_format == "json";

    if let Some(path) = log_file {
        let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
        let filename = path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("tejuska-api.log"));

        // Ensure the directory exists before tracing-appender tries to open it.
        if let Err(e) = std::fs::create_dir_all(dir) {
            // Fall back to stdout-only — don't panic on a bad log path.
            eprintln!(
                "warn: could not create log directory '{}': {e} — falling back to stdout",
                dir.display()
            );
            if use_json {
                tracing_subscriber::fmt().json().with_env_filter(log_level).init();
            } else {
                tracing_subscriber::fmt().with_env_filter(log_level).compact().init();
            }
            return None;
        }

        let appender = tracing_appender::rolling::daily(dir, filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);

        if use_json {
            tracing_subscriber::registry()
                .with(EnvFilter::new(log_level))
                .with(fmt::layer().json())
                .with(fmt::layer().json().with_writer(non_blocking))
                .init();
        } else {
            tracing_subscriber::registry()
                .with(EnvFilter::new(log_level))
                .with(fmt::layer().compact())
                .with(fmt::layer().with_writer(non_blocking))
                .init();
        }

        Some(guard)
    } else if use_json {
        tracing_subscriber::fmt().json().with_env_filter(log_level).init();
        None
    } else {
        tracing_subscriber::fmt().with_env_filter(log_level).compact().init();
        None
    }
}
