//! Per-agent local state and its transitions

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::bus::StatusReport;
use crate::domain::{AgentId, Position};

/// Lifecycle stage derived from the independent flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    AwaitingStart,
    Active,
    Frozen,
    Terminated,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::AwaitingStart => "awaiting-start",
            LifecycleState::Active => "active",
            LifecycleState::Frozen => "frozen",
            LifecycleState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// What one agent knows about itself
///
/// `game_started` and `frozen` are kept apart on purpose: a rebroadcast BEGIN
/// must never thaw an agent that was already frozen.
#[derive(Debug, Clone)]
pub struct AgentState {
    pub id: AgentId,
    pub position: Position,
    pub game_started: bool,
    pub frozen: bool,
    pub terminated: bool,
    pub last_heartbeat: Option<Instant>,
}

impl AgentState {
    pub fn new(id: AgentId, position: Position) -> Self {
        Self {
            id,
            position,
            game_started: false,
            frozen: false,
            terminated: false,
            last_heartbeat: None,
        }
    }

    pub fn lifecycle(&self) -> LifecycleState {
        if self.terminated {
            LifecycleState::Terminated
        } else if self.frozen {
            LifecycleState::Frozen
        } else if self.game_started {
            LifecycleState::Active
        } else {
            LifecycleState::AwaitingStart
        }
    }

    /// Whether the movement step should pick a new cell
    pub fn can_move(&self) -> bool {
        self.lifecycle() == LifecycleState::Active
    }

    pub fn apply_begin(&mut self) {
        if self.game_started {
            debug!(id = %self.id, "BEGIN repeated");
        } else {
            info!(id = %self.id, frozen = self.frozen, "Game started");
        }
        self.game_started = true;
    }

    /// Apply a FREEZE broadcast; returns whether it was aimed at this agent
    pub fn apply_freeze(&mut self, target: AgentId) -> bool {
        if target != self.id {
            return false;
        }
        if !self.frozen {
            info!(id = %self.id, pos = %self.position, "Frozen");
        }
        self.frozen = true;
        true
    }

    pub fn apply_stop(&mut self) {
        debug!(id = %self.id, "AgentState::apply_stop: called");
        self.terminated = true;
    }

    /// Whether a STATUS heartbeat is owed at `now`
    pub fn heartbeat_due(&self, now: Instant, every: Duration) -> bool {
        match self.last_heartbeat {
            None => true,
            Some(last) => now.duration_since(last) >= every,
        }
    }

    pub fn status_report(&self) -> StatusReport {
        StatusReport {
            id: self.id,
            position: self.position,
            frozen: self.frozen,
            game_started: self.game_started,
        }
    }
}
