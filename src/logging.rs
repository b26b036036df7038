//! Logging setup for the provider binary.
//!
//! All logs go to **stderr**; stdout carries only the handshake line.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: overrides the default filter (e.g. `starbucks_provider=debug,reqwest=info`)
//!
//! ```bash
//! # Request-level logging from the API client
//! RUST_LOG=starbucks_provider::client=debug ./starbucks-provider
//! ```

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn default_level(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "info"
    }
}

fn filter(debug: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level(debug)))
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise the level is `debug` or `info`
/// depending on `debug`.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging(debug: bool) {
    tracing_subscriber::registry()
        .with(filter(debug))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .init();
}

/// Like [`init_logging`], but returns false instead of panicking when a
/// subscriber is already installed.
pub fn try_init_logging(debug: bool) -> bool {
    tracing_subscriber::registry()
        .with(filter(debug))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    // The global subscriber can only be set once per process, so only the
    // filter construction is tested here.

    use super::*;

    #[test]
    fn test_default_level() {
        assert_eq!(default_level(true), "debug");
        assert_eq!(default_level(false), "info");
    }

    #[test]
    fn test_env_filter_parsing() {
        assert!(EnvFilter::try_new("starbucks_provider=debug").is_ok());
        assert!(EnvFilter::try_new("warn,starbucks_provider::client=debug").is_ok());
        assert!(EnvFilter::try_new("info,reqwest=warn,h2=warn").is_ok());
    }
}
