//! Tracing Subscriber Initialization
//!
//! Installs a `tracing-subscriber` registry with an env-driven filter and a
//! JSON (default) or human-readable formatter.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{GateError, GateResult};

/// Default filter when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "profilegate_api=debug,profilegate_core=debug,tower_http=debug,info";

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "pretty" | "text" | "plain" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to the startup event
    pub service_name: String,
    /// Line format (`PROFILEGATE_LOG_FORMAT`: json | pretty)
    pub log_format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: std::env::var("PROFILEGATE_SERVICE_NAME")
                .unwrap_or_else(|_| "profilegate".to_string()),
            log_format: std::env::var("PROFILEGATE_LOG_FORMAT")
                .map(|s| LogFormat::parse(&s))
                .unwrap_or(LogFormat::Json),
        }
    }
}

/// Initialize the global tracing subscriber.
///
/// Call once at startup; a second call returns [`GateError::Telemetry`].
pub fn init_tracing(config: &TelemetryConfig) -> GateResult<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    };
    result.map_err(|e| GateError::Telemetry(e.to_string()))?;

    tracing::info!(
        service_name = %config.service_name,
        log_format = ?config.log_format,
        "Telemetry initialized"
    );

    Ok(())
}
