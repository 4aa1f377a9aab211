use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber once. Honors `RUST_LOG`,
/// defaulting to `info`; safe to call repeatedly (later calls are
/// no-ops).
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
