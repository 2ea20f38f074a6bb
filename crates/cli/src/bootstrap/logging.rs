use rdns_domain::Config;
use tracing_subscriber::EnvFilter;

/// Logs go to stderr so answers on stdout stay scriptable.
///
/// `RUST_LOG` wins over the configured level, e.g.
///   RUST_LOG=rdns_infrastructure=trace
pub fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    let installed = if config.logging.timestamps {
        subscriber.try_init()
    } else {
        subscriber.without_time().try_init()
    };
    installed.ok();
}
