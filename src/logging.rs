//! Tracing subscriber setup for binaries and tools embedding the link.
//!
//! The library only emits `tracing` events; installing a subscriber is left to
//! the host application. [`init`] is a convenience for hosts that have none.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Build the filter used by [`init`].
///
/// `RUST_LOG` wins when set; otherwise the crate logs at `INFO`, or `DEBUG`
/// when `verbose` is true.
pub fn filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { Level::DEBUG } else { Level::INFO };
        EnvFilter::new(format!("skylink={}", level))
    })
}

/// Install a formatting subscriber as the global default.
///
/// Returns `false` when another subscriber was already installed, which is
/// not an error for a library caller.
pub fn init(verbose: bool) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(filter(verbose))
        .with_target(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_harmless() {
        init(false);
        assert!(!init(true));
    }

    #[test]
    fn verbose_filter_names_the_crate() {
        if std::env::var_os("RUST_LOG").is_none() {
            assert!(filter(true).to_string().contains("skylink=debug"));
        }
    }
}
