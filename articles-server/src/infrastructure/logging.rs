use tracing_subscriber::{EnvFilter, fmt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "info,articles_server=debug";

pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .json()
        .finish();

    // also bridges `log` records from actix's Logger middleware
    let _ = subscriber.try_init();
}
