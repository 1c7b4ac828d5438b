//! Error reporting and tracing bootstrap.

use sentry_tracing::{EventFilter, SentryLayer};
use tracing::Level;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialise sentry when a DSN is configured. The guard must be held for the
/// lifetime of the process so queued events are flushed on shutdown.
pub fn init_once(dsn: Option<&str>) -> Option<sentry::ClientInitGuard> {
    let dsn = dsn?.trim();
    if dsn.is_empty() {
        return None;
    }

    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some(environment().into()),
            ..Default::default()
        },
    ));
    Some(guard)
}

fn environment() -> &'static str {
    if cfg!(debug_assertions) {
        "dev"
    } else {
        "production"
    }
}

pub fn sentry_layer<S>() -> SentryLayer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    sentry_tracing::layer().event_filter(|metadata| match *metadata.level() {
        Level::ERROR => EventFilter::Event,
        Level::WARN | Level::INFO => EventFilter::Breadcrumb,
        _ => EventFilter::Ignore,
    })
}

/// Install the global subscriber: fmt output filtered by `RUST_LOG`
/// (default `info`) plus the sentry layer.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(env_filter))
        .with(sentry_layer())
        .init();
}
