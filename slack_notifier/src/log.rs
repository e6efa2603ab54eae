use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt as _};

const DEFAULT_FILTER: &str = "slack_notifier=info,slack_notify=info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Single-line JSON, no colours. Meant for log collectors.
    Json,
    /// Human readable output for terminals.
    Pretty,
}

impl LogFormat {
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "json" || v == "prod" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber. Calling it twice is a no-op for the second call.
pub fn init_tracing(format: LogFormat) {
    let result = match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter())
            .with(fmt::layer().json().flatten_event(true).with_ansi(false))
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter())
            .with(fmt::layer().with_target(false).with_ansi(true))
            .try_init(),
    };
    if let Err(e) = result {
        tracing::debug!("Tracing subscriber already installed: {e}");
    }
}
