//! Tracing subscriber setup shared by the binaries.
//!
//! Logs go to stderr so reports written to stdout stay machine readable.

use std::io;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// `default_directive` when the variable is unset or invalid.
///
/// Does nothing when a global subscriber is already installed.
pub fn init(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ignored = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .try_init();
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::init;

    #[rstest]
    fn repeated_initialisation_is_harmless() {
        init("info");
        init("debug");

        tracing::info!("subscriber installed");
    }
}
