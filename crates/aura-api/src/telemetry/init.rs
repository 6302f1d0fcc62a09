use aura_core::LogFormat;
use tracing_subscriber::{
    fmt::format::Format, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

const DEFAULT_FILTER: &str = "aura=debug,tower_http=debug";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into())
}

/// Initialize tracing with the configured output format.
///
/// A second call (e.g. from tests sharing a process) leaves the first subscriber in place.
pub fn init_telemetry(format: LogFormat, environment: &str) {
    let result = match format {
        LogFormat::Compact => {
            let console_fmt = tracing_subscriber::fmt::layer().event_format(
                Format::default()
                    .compact()
                    .with_target(false)
                    .without_time(),
            );
            tracing_subscriber::registry()
                .with(env_filter())
                .with(console_fmt)
                .try_init()
        }
        LogFormat::Json => {
            let json_fmt = tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(false);
            tracing_subscriber::registry()
                .with(env_filter())
                .with(json_fmt)
                .try_init()
        }
    };

    match result {
        Ok(()) => {
            tracing::info!(log_format = ?format, environment = %environment, "Tracing initialized")
        }
        Err(e) => tracing::debug!(error = %e, "Tracing subscriber already installed"),
    }
}
