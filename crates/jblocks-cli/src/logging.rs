use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber on stderr, so command output on
/// stdout stays machine-readable. `RUST_LOG` overrides `default`.
pub fn init(default: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
