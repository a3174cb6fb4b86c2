//! Tracing subscriber setup

use std::sync::OnceLock;

use tracing_subscriber::{fmt, EnvFilter};

static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// Install the global subscriber once. The filter comes from `RUST_LOG`,
/// defaulting to `info`.
pub fn init_logging(json: bool) {
    LOGGER_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let builder = fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr);

        let result = if json {
            builder.json().try_init()
        } else {
            builder.try_init()
        };
        if let Err(e) = result {
            eprintln!("logging already initialized: {e}");
        }
    });
}
