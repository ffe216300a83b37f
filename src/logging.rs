use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the tracing subscriber.
/// Respects `RUST_LOG` if set, otherwise logs at `info`.
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .try_init();
}
