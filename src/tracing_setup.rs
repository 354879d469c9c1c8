use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LogFormat;

/// Map a configured level name onto a filter directive. Unknown names fall back to `error`.
pub fn level_directive(level: &str) -> Option<&'static str> {
    match level.to_ascii_uppercase().as_str() {
        "TRACE" => Some("trace"),
        "DEBUG" => Some("debug"),
        "INFO" => Some("info"),
        "WARN" => Some("warn"),
        // tracing has nothing above error
        "ERROR" | "FATAL" => Some("error"),
        _ => None,
    }
}

/// Install the global subscriber. `RUST_LOG`, when set, wins over `level`.
pub fn init_tracing(
    level: &str,
    format: LogFormat,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let directive = level_directive(level);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directive.unwrap_or("error")));

    let registry = Registry::default().with(filter);
    match format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_span_list(true),
            )
            .try_init()?,
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init()?,
    }

    if directive.is_none() {
        tracing::error!("Unknown level [{}]. Log level set to ERROR", level);
    }
    tracing::info!("Structured logging initialized successfully");
    Ok(())
}
