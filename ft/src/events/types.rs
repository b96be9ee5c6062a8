//! Event types for game activity streaming
//!
//! These events describe everything an observer may want to follow:
//! - Agent lifecycle (ready, moved, heartbeat, stopped)
//! - Coordinator decisions (phase changes, tags, resyncs)
//! - Protocol faults (undecodable payloads)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bus::Topic;
use crate::coordinator::GamePhase;
use crate::domain::{AgentId, Position};

/// Repair actions taken by the coordinator after a STATUS heartbeat
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResyncKind {
    /// Agent reported it never saw BEGIN
    RebroadcastBegin,
    /// Agent reported it is still moving after being tagged
    RefreezeMissed,
    /// Agent reported frozen without a coordinator-issued FREEZE
    RepairSelfFrozen,
    /// Heartbeat from an agent whose READY never arrived
    LateReady,
    /// Heartbeat position disagreed with the index (a MOVE was lost)
    PositionCorrected,
}

/// Core event enum - the vocabulary of game activity
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GameEvent {
    // === Agent lifecycle ===
    /// An agent announced itself
    AgentReady {
        source: String,
        agent: AgentId,
        position: Position,
    },
    /// An agent stepped to a new cell
    AgentMoved {
        source: String,
        agent: AgentId,
        from: Position,
        to: Position,
    },
    /// An agent published a STATUS heartbeat
    HeartbeatSent {
        source: String,
        agent: AgentId,
        position: Position,
        frozen: bool,
        game_started: bool,
    },
    /// An agent left its control loop
    AgentStopped {
        source: String,
        agent: AgentId,
        position: Position,
        frozen: bool,
    },

    // === Coordinator ===
    /// The game phase changed
    PhaseChanged {
        source: String,
        from: GamePhase,
        to: GamePhase,
    },
    /// A hider was caught by the seeker
    AgentTagged {
        source: String,
        agent: AgentId,
        position: Position,
    },
    /// A divergence was repaired
    ResyncIssued {
        source: String,
        agent: AgentId,
        kind: ResyncKind,
    },

    // === Faults ===
    /// A payload could not be decoded
    DecodeFailed {
        source: String,
        topic: Topic,
        message: String,
    },
}

impl GameEvent {
    /// Name of the component that emitted the event
    pub fn source(&self) -> &str {
        match self {
            GameEvent::AgentReady { source, .. }
            | GameEvent::AgentMoved { source, .. }
            | GameEvent::HeartbeatSent { source, .. }
            | GameEvent::AgentStopped { source, .. }
            | GameEvent::PhaseChanged { source, .. }
            | GameEvent::AgentTagged { source, .. }
            | GameEvent::ResyncIssued { source, .. }
            | GameEvent::DecodeFailed { source, .. } => source,
        }
    }

    /// Get the event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            GameEvent::AgentReady { .. } => "AgentReady",
            GameEvent::AgentMoved { .. } => "AgentMoved",
            GameEvent::HeartbeatSent { .. } => "HeartbeatSent",
            GameEvent::AgentStopped { .. } => "AgentStopped",
            GameEvent::PhaseChanged { .. } => "PhaseChanged",
            GameEvent::AgentTagged { .. } => "AgentTagged",
            GameEvent::ResyncIssued { .. } => "ResyncIssued",
            GameEvent::DecodeFailed { .. } => "DecodeFailed",
        }
    }
}

/// A timestamped event log entry for file persistence
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventLogEntry {
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,
    pub event: GameEvent,
}

impl EventLogEntry {
    /// Create a new log entry with current timestamp
    pub fn new(event: GameEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
        }
    }
}
