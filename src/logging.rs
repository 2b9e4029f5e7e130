//! Structured logging initialization.
//!
//! All logs go to stderr so stdout stays clean for command output.

use std::io::{self, IsTerminal};

use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Default filter directive for the given verbosity flags.
#[must_use]
pub fn default_directive(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "tagsync=error";
    }
    match verbose {
        0 => "tagsync=info",
        1 => "tagsync=debug",
        _ => "tagsync=trace",
    }
}

/// Initialize the tracing subscriber based on CLI flags and environment.
///
/// # Arguments
///
/// * `json` - Emit JSON lines instead of human-readable output
/// * `verbose` - Verbosity level: 0 = info, 1 = debug, 2+ = trace
/// * `quiet` - Only errors
///
/// `RUST_LOG` overrides the filter (e.g. "tagsync=debug,reqwest=info").
///
/// | Format | TTY | Output |
/// |--------|-----|--------|
/// | json | any | JSON lines |
/// | text | yes | Pretty colored output |
/// | text | no | Compact plain output |
pub fn init_logging(json: bool, verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)));

    let registry = tracing_subscriber::registry().with(filter);

    // try_init: a subscriber may already be installed (tests, embedding).
    if json {
        let layer = fmt::layer()
            .json()
            .with_target(true)
            .with_span_events(FmtSpan::NONE)
            .with_writer(io::stderr);
        let _ = registry.with(layer).try_init();
    } else if io::stderr().is_terminal() {
        let layer = fmt::layer()
            .with_target(false)
            .with_span_events(FmtSpan::NONE)
            .with_writer(io::stderr);
        let _ = registry.with(layer).try_init();
    } else {
        let layer = fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .compact()
            .with_writer(io::stderr);
        let _ = registry.with(layer).try_init();
    }
}
