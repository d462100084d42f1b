use tracing_subscriber::EnvFilter;

/// Initialize tracing for the process. Logs go to stderr so command output on
/// stdout stays clean.
///
/// `RUST_LOG` takes precedence; otherwise `info`, or `debug` when verbose.
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
