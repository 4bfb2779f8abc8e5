use std::io::IsTerminal;
use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};
use crate::error::AppError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
///
/// Logs go to stderr so replay output on stdout stays machine-readable.
pub fn init(logging: &LoggingSettings) -> Result<(), AppError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let ansi = std::io::stderr().is_terminal();
    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_ansi(ansi)
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| AppError::telemetry(format!("failed to install tracing subscriber: {err}")))
}

/// Register descriptions for the cache counters. Safe to call repeatedly.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "hookcache_hit_total",
            Unit::Count,
            "Total number of reads answered from the cache."
        );
        describe_counter!(
            "hookcache_miss_total",
            Unit::Count,
            "Total number of reads not found in the cache."
        );
        describe_counter!(
            "hookcache_store_total",
            Unit::Count,
            "Total number of results written to the cache."
        );
        describe_counter!(
            "hookcache_invalidated_total",
            Unit::Count,
            "Total number of cache entries removed after mutations."
        );
        describe_counter!(
            "hookcache_evict_total",
            Unit::Count,
            "Total number of cache entries evicted due to capacity."
        );
    });
}
