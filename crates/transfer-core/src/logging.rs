use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::{Result, TransferError};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,transfer_core=debug";

/// Install a global fmt subscriber. `RUST_LOG` takes precedence over
/// `filter`. Fails if a subscriber is already installed.
pub fn init_logging(filter: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .try_init()
        .map_err(|e| TransferError::Config(format!("Failed to initialize logging: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_fails_without_panicking() {
        let _ = init_logging(DEFAULT_FILTER);
        assert!(init_logging(DEFAULT_FILTER).is_err());
    }

    #[test]
    fn filter_strings_parse() {
        for f in [DEFAULT_FILTER, "warn", "transfer_core::submit=trace"] {
            let _ = EnvFilter::new(f);
        }
    }
}
