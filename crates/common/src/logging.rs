//! Logging subsystem init. Stdout only: this workspace has no RPC surface
//! to justify shipping spans to a remote collector, so unlike the upstream
//! version there is no OpenTelemetry/OTLP layer here.

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

pub struct LoggerConfig {
    whoami: String,
}

impl LoggerConfig {
    pub fn new(whoami: String) -> Self {
        Self { whoami }
    }
}

/// Initializes the logging subsystem with the provided config.
pub fn init(config: LoggerConfig) {
    let filt = tracing_subscriber::EnvFilter::from_default_env();
    let stdout_sub = tracing_subscriber::fmt::layer().compact().with_filter(filt);

    tracing_subscriber::registry().with(stdout_sub).init();

    info!(whoami = %config.whoami, "logging started");
}

/// Shuts down the logging subsystem. Currently a no-op hook kept for
/// symmetry with `init`, in case a future output needs explicit flush.
pub fn finalize() {
    info!("shutting down logging");
}
