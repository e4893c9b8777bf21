use std::io;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Logs go to stderr; stdout is reserved for the rendered tables.
pub fn init_logging(log_level: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_writer(io::stderr);

    Registry::default()
        .with(env_filter)
        .with(stderr_layer)
        .try_init()?;

    Ok(())
}
