//! Tracing setup for the binaries.
//!
//! Logs always go to stderr: stdout carries results in the client and
//! JSON-RPC frames in the tool servers.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter directive for a verbosity count; `quiet` wins over `verbose`
pub fn default_filter(verbose: u8, quiet: bool) -> String {
    let log_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let level = if quiet { "error" } else { log_level };
    format!("research_digest={}", level)
}

/// Install the global subscriber (`RUST_LOG` overrides the verbosity flags)
pub fn init_tracing(verbose: u8, quiet: bool) {
    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter(verbose, quiet)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
