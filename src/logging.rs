use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Directive used when `HIPOT_LOG` is unset: the library and both binaries.
pub const DEFAULT_FILTER: &str = "hipot_analyzer=info,hipot_server=info";

/// Installs the global tracing subscriber.
///
/// Filter comes from `HIPOT_LOG` (e.g. `HIPOT_LOG=hipot_analyzer=debug`),
/// falling back to [`DEFAULT_FILTER`]. Safe to call more than once.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("HIPOT_LOG").unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .with(filter)
            .init();
    });
}
