//! Tracing subscriber setup.

use std::sync::OnceLock;

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber once. `RUST_LOG` overrides the `info` default.
pub fn install_tracing_subscriber() {
    static INSTALLED: OnceLock<()> = OnceLock::new();
    INSTALLED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = fmt().with_env_filter(filter).try_init();
    });
}
