//! Logging setup
//!
//! The library only emits `tracing` events; nothing is printed unless a
//! subscriber is installed. `init_logging` installs a formatting subscriber
//! on stderr, filtered by `BELT_LOG` (same syntax as `RUST_LOG`):
//!
//! ```bash
//! BELT_LOG=belt_runtime=trace ./my-program
//! ```

use std::sync::Once;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "BELT_LOG";

const DEFAULT_FILTER: &str = "belt_core=info,belt_runtime=info";

static LOGGING_INIT: Once = Once::new();

/// Install the stderr subscriber.
///
/// Safe to call multiple times (idempotent via Once). If another global
/// subscriber is already installed, that one is kept.
pub fn init_logging() {
    LOGGING_INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        let installed = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .is_ok();

        if installed {
            tracing::debug!("logging initialized");
        }
    });
}
