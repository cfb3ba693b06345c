use tracing_subscriber::EnvFilter;

/// Installs a fmt subscriber honouring `RUST_LOG`, defaulting to `info`.
/// Does nothing if a global subscriber is already set.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .try_init();
}
