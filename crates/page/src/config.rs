//! Runtime configuration for page sessions and the watch demo binary.
//!
//! Configuration can be loaded from environment variables or constructed
//! programmatically.

use core::time::Duration;
use std::env;

/// Runtime configuration for page loading and watches.
#[derive(Clone, Debug)]
pub struct PageConfig {
    /// Default disappearance-watch timeout in milliseconds.
    pub watch_timeout_ms: u64,
    /// How many updates a single intake batch carries.
    pub batch_size: usize,
    /// Whether to emit telemetry lines after a page load.
    pub telemetry_enabled: bool,
}

impl PageConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `VIGIL_WATCH_TIMEOUT_MS`: default watch timeout in milliseconds
    ///   (default: 10000)
    /// - `VIGIL_BATCH_SIZE`: updates per intake batch (default: 32)
    /// - `VIGIL_TELEMETRY`: set to "1" to enable telemetry (default:
    ///   disabled)
    #[must_use]
    pub fn from_env() -> Self {
        let watch_timeout_ms = env::var("VIGIL_WATCH_TIMEOUT_MS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .unwrap_or(10_000);
        let batch_size = env::var("VIGIL_BATCH_SIZE")
            .ok()
            .and_then(|val| val.parse::<usize>().ok())
            .unwrap_or(32)
            .max(1);
        let telemetry_enabled = env::var("VIGIL_TELEMETRY").ok().as_deref() == Some("1");
        Self {
            watch_timeout_ms,
            batch_size,
            telemetry_enabled,
        }
    }

    /// Get the default watch timeout as a `Duration`.
    #[must_use]
    pub const fn watch_timeout(&self) -> Duration {
        Duration::from_millis(self.watch_timeout_ms)
    }
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            watch_timeout_ms: 10_000,
            batch_size: 32,
            telemetry_enabled: false,
        }
    }
}
