use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::{EnvFilter, Layer as _};

const DEFAULT_LOG_LEVEL: &str = "info,hyper=info,h2=info,solo_registration_backend=debug,\
                                 solo_registration_database=debug";

/// Logs to stdout, filtered by `RUST_LOG` when it is set.
pub fn setup_telemetry() {
    let stdout_log = tracing_subscriber::fmt::layer();

    tracing_subscriber::registry()
        .with(
            stdout_log.with_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_LEVEL.into()),
            ),
        )
        .init();
}
