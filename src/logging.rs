use tracing_subscriber::EnvFilter;

/// Install the stderr tracing subscriber. `RUST_LOG` takes precedence over
/// `verbose`.
pub fn init(verbose: bool) {
    let default = if verbose { "nodefix=debug" } else { "nodefix=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
