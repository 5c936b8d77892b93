use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::contract::SyncWindow;

/// Glucose low bound used when the configuration does not set one (mmol/L).
pub const DEFAULT_TARGET_LOW: f64 = 3.7;

fn default_target_low() -> f64 {
    DEFAULT_TARGET_LOW
}

/// Static input for both sync pipelines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Start of the window. Defaults to the beginning of the current UTC day.
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,
    /// Exclusive end of the window; open-ended when unset.
    #[serde(default)]
    pub till: Option<DateTime<Utc>>,
    /// Low bound of every Nightscout target interval.
    #[serde(default = "default_target_low")]
    pub target_low: f64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            since: None,
            till: None,
            target_low: DEFAULT_TARGET_LOW,
        }
    }
}

impl SyncConfig {
    /// Resolves the fetch window relative to `now`.
    pub fn window(&self, now: DateTime<Utc>) -> SyncWindow {
        let since = self.since.unwrap_or_else(|| {
            now.date_naive()
                .and_hms_opt(0, 0, 0)
                .map(|midnight| midnight.and_utc())
                .unwrap_or(now)
        });
        SyncWindow {
            since,
            till: self.till,
        }
    }

    pub fn trace_loaded(&self) {
        info!(
            since = ?self.since,
            till = ?self.till,
            target_low = self.target_low,
            "Loaded SyncConfig"
        );
        debug!(?self, "SyncConfig loaded (full debug)");
    }
}
