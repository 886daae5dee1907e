//! Diagnostics on standard error.
//!
//! Logging is controlled only by `--verbose`; no environment variable is consulted.

use std::io;

use tracing::Level;

/// Maps the number of `-v` flags to the most verbose level that is printed.
pub fn level(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Installs a `tracing` subscriber that writes to standard error.
///
/// Does nothing if a global subscriber is already installed.
pub fn init(verbose: u8) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(level(verbose))
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}
