//! Tracing initialization.

use std::io;
use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Environment variable holding the log filter directives.
pub const LOG_ENV: &str = "LABELDUP_LOG";

/// Initialize the tracing subscriber, writing to stderr.
///
/// Reads per-target levels from `LABELDUP_LOG`, for example
/// `LABELDUP_LOG=labeldup=debug` or `LABELDUP_LOG=labeldup::progress=info`.
/// Falls back to `labeldup=warn` when unset or invalid.
///
/// Calling it more than once is a no-op.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("labeldup=warn"));

        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_writer(io::stderr))
            .with(filter)
            .init();
    });
}
