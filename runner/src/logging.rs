//! Diagnostic tracing for the runner.
//!
//! Stdout carries the agent's messages as JSON lines, so all tracing output
//! goes to stderr.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset or unparsable.
const DEFAULT_FILTER: &str = "warn";

/// Install the global subscriber for the `issue-runner` binary.
///
/// Call once, before any agent work. Per-message relay events sit at `trace`,
/// so `RUST_LOG=issue_runner=trace` shows every message type as it passes.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .init();
}
