pub mod core;

use tracing_subscriber::EnvFilter;

pub use crate::core::error::{LauncherError, LauncherResult};
pub use crate::core::state::{Launcher, LauncherSettings, PreparedVersion};

/// Structured logging to stderr; `RUST_LOG` overrides the default filter.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,mcresolve=info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
