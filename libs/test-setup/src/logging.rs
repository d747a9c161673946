use std::sync::Once;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, FmtSubscriber, prelude::*};

static INIT: Once = Once::new();

/// Install a global subscriber writing to the test output. The filter comes from `RUST_LOG`,
/// defaulting to `info`.
pub fn init_logger() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_test_writer()
            .finish()
            .with(ErrorLayer::default());

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|err| eprintln!("Error initializing the global logger: {err}"))
            .ok();
    });
}
