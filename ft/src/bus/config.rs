//! Bus configuration

use serde::{Deserialize, Serialize};
use tracing::debug;

/// In-process bus configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusConfig {
    /// Channel buffer size for publish/subscribe requests
    #[serde(rename = "channel-buffer", default = "default_channel_buffer")]
    pub channel_buffer: usize,

    /// Per-subscriber inbox size; deliveries to a full inbox are dropped
    #[serde(rename = "inbox-buffer", default = "default_inbox_buffer")]
    pub inbox_buffer: usize,

    /// Probability in [0, 1) that any single delivery is discarded
    #[serde(rename = "drop-rate", default)]
    pub drop_rate: f64,
}

fn default_channel_buffer() -> usize {
    debug!("default_channel_buffer: called");
    1024
}

fn default_inbox_buffer() -> usize {
    debug!("default_inbox_buffer: called");
    256
}

impl Default for BusConfig {
    fn default() -> Self {
        debug!("BusConfig::default: called");
        Self {
            channel_buffer: 1024,
            inbox_buffer: 256,
            drop_rate: 0.0,
        }
    }
}

impl BusConfig {
    /// Whether deliveries are randomly discarded
    pub fn is_lossy(&self) -> bool {
        self.drop_rate > 0.0
    }
}
