//! Tracing initialisation and analysis spans
//!
//! The library only emits `tracing` events. Binaries call [`init_tracing`]
//! once at startup to install a subscriber.

use tracing::{info_span, Level, Span};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `level`. Exactly one of the JSON or
/// plain formatters is attached; both write to stderr so stdout stays
/// reserved for command output. Only the first call in a process has any
/// effect.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let json_layer = json.then(|| {
        fmt::layer()
            .with_target(false)
            .json()
            .with_writer(std::io::stderr)
    });
    let plain_layer = (!json).then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(plain_layer)
        .try_init()
        .ok();
}

/// Span wrapping one analysis request, tagged with a fresh `analysis_id`
pub fn analysis_span(kind: &'static str, subject_id: &str) -> Span {
    info_span!(
        "analysis",
        kind,
        subject_id,
        analysis_id = %Uuid::new_v4()
    )
}
