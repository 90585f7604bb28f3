use tracing_subscriber::EnvFilter;

/// Installs the global `tracing` subscriber
///
/// Honors `RUST_LOG`, defaulting to `info` for this crate and `warn` for
/// everything else. Calling it twice is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,reelguide=info"));

    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_err()
    {
        tracing::debug!("Tracing subscriber already installed");
    }
}
