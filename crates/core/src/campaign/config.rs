//! Campaign dispatch configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a campaign run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignConfig {
    /// Number of dispatch workers draining the queue (minimum 1).
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// How often to ask the provider for a call's status (milliseconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Upper bound on how long one call is polled before it is
    /// recorded as a timeout (seconds).
    #[serde(default = "default_max_wait")]
    pub max_wait_secs: u64,

    /// How often the progress observer reports (milliseconds).
    #[serde(default = "default_progress_interval")]
    pub progress_interval_ms: u64,

    /// Synthesize one audio per recipient instead of one per campaign.
    /// The script may reference the recipient as `{recipient}`.
    #[serde(default)]
    pub personalize: bool,

    /// Stop polling in-flight calls once cancel is requested.
    /// By default live calls are polled to their terminal status.
    #[serde(default)]
    pub abandon_in_flight_on_cancel: bool,
}

fn default_concurrency() -> usize {
    1
}

fn default_poll_interval() -> u64 {
    1000 // 1 second
}

fn default_max_wait() -> u64 {
    300 // 5 minutes
}

fn default_progress_interval() -> u64 {
    1000
}

impl CampaignConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms.max(1))
    }
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            poll_interval_ms: default_poll_interval(),
            max_wait_secs: default_max_wait(),
            progress_interval_ms: default_progress_interval(),
            personalize: false,
            abandon_in_flight_on_cancel: false,
        }
    }
}
