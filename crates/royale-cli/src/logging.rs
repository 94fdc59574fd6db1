use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging to stderr. `RUST_LOG` wins over `level` when set.
pub fn init_logging(level: &str) {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
