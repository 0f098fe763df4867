//! Telemetry - Opt-In Tracing Subscriber
//!
//! The library itself only emits `tracing` events; it never installs a
//! subscriber. Binaries and integration tests embedding the crate can call
//! [`init`] to get an env-filtered fmt subscriber (`RUST_LOG` controls the
//! level, defaulting to `info`).

use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Errors from telemetry initialization.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A global subscriber is already installed
    #[error("global tracing subscriber already set: {message}")]
    AlreadyInitialized {
        /// Underlying error message
        message: String,
    },
}

/// Install the global tracing subscriber.
///
/// Reads the filter from `RUST_LOG`, defaulting to `info`. Call once per
/// process, before the first memory operation of interest.
pub fn init() -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()
        .map_err(|e| TelemetryError::AlreadyInitialized {
            message: e.to_string(),
        })
}
