use tracing_subscriber::EnvFilter;

/// Install the stderr subscriber for the binaries. `RUST_LOG` wins; without
/// it the crate logs at `info`. Safe to call more than once.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
