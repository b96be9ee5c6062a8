//! Coordinator configuration

use std::time::Duration;

use tracing::debug;

use crate::config::TimingConfig;
use crate::domain::{AgentId, Board};

/// Default interval between RUNNING cycles
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Default minimum gap between two board redraws
pub const DEFAULT_RENDER_INTERVAL: Duration = Duration::from_millis(200);

/// Launch parameters for one coordinator; immutable once the game starts
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub board: Board,
    pub hider_count: usize,
    pub seeker_id: AgentId,
    pub poll_interval: Duration,
    pub render_interval: Duration,
}

impl CoordinatorConfig {
    pub fn new(board: Board, hider_count: usize, seeker_id: AgentId) -> Self {
        debug!(%board, hider_count, %seeker_id, "CoordinatorConfig::new: called");
        Self {
            board,
            hider_count,
            seeker_id,
            poll_interval: DEFAULT_POLL_INTERVAL,
            render_interval: DEFAULT_RENDER_INTERVAL,
        }
    }

    /// Take poll and render cadence from the timing section
    pub fn with_timing(mut self, timing: &TimingConfig) -> Self {
        self.poll_interval = timing.coordinator_poll();
        self.render_interval = timing.render_interval();
        self
    }

    /// READY reports needed before BEGIN: every hider plus the seeker
    pub fn expected_reports(&self) -> usize {
        self.hider_count + 1
    }
}
