//! Poll pacing
//!
//! The bot performs one availability check at a time; the delay between
//! checks is the caller's job. This is all of it: a fixed interval with
//! uniform jitter so polls do not land on an exact beat.

use rand::Rng;
use std::time::Duration;

/// Poll pacing configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollConfig {
    /// Base interval between availability checks in seconds
    pub interval_secs: u64,
    /// Jitter applied to the interval (percentage, 0-100)
    pub jitter_percent: u8,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: 180,
            jitter_percent: 20,
        }
    }
}

impl PollConfig {
    /// Delay until the next check: base interval +/- jitter
    pub fn next_delay(&self) -> Duration {
        let base_ms = self.interval_secs.saturating_mul(1000);

        let jitter_range = (base_ms as f64 * self.jitter_percent.min(100) as f64 / 100.0) as u64;
        let jitter = if jitter_range > 0 {
            rand::thread_rng().gen_range(0..jitter_range * 2) as i64 - jitter_range as i64
        } else {
            0
        };

        Duration::from_millis((base_ms as i64 + jitter).max(0) as u64)
    }
}
