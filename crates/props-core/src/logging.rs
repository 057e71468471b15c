use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install a tracing subscriber for a hosting process.
///
/// Store diagnostics (load failures, swallowed conversion errors, failed
/// writes) are emitted as `tracing` events; this routes them to stderr.
/// The level comes from `RUST_LOG` and defaults to "info".
///
/// Fails if a global subscriber is already installed.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .with_level(true)
        .compact();

    let filter_layer = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
