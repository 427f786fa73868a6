use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

/// Install the global log subscriber. Output goes to stderr so stdout only
/// carries the run summary.
///
/// `default_filter` applies when `RUST_LOG` is unset.
pub fn init_tracing(default_filter: &str) -> Result<(), anyhow::Error> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    SubscriberBuilder::default()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {}", e))
}
