// ABOUTME: Tracing subscriber initialisation for embedding binaries.
// ABOUTME: Verbose selects debug level, otherwise warnings only.

use tracing_subscriber::EnvFilter;

/// Install a global fmt subscriber. Safe to call more than once.
pub fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
