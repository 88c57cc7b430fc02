use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Log to stderr, filtered by `RUST_LOG` (default `info`). Stdout is left
/// for command output.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .init();
}
