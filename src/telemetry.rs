//! Opt-in tracing bootstrap.
//!
//! The engine only emits `tracing` events; hosts that never install a
//! subscriber pay nothing. `init_default_tracing` is a convenience for
//! demos and headless tools that want sensible output without wiring
//! `tracing-subscriber` themselves.

/// Installs a compact subscriber honoring `RUST_LOG`, falling back to
/// `tickline=info` when the variable is unset.
///
/// Returns `false` when the `telemetry` feature is disabled or another
/// global subscriber is already installed by the host.
#[must_use]
pub fn init_default_tracing() -> bool {
    #[cfg(feature = "telemetry")]
    {
        use tracing_subscriber::EnvFilter;

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("tickline=info"));
        return tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .compact()
            .try_init()
            .is_ok();
    }

    #[cfg(not(feature = "telemetry"))]
    {
        false
    }
}
