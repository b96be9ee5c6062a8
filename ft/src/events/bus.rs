//! Event Bus - observer channel for game activity
//!
//! The EventBus uses a tokio broadcast channel to hand events to every
//! subscriber. Components receive an [`EventEmitter`] at construction and never
//! touch a global logger.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

use super::types::{GameEvent, ResyncKind};
use crate::bus::Topic;
use crate::coordinator::GamePhase;
use crate::domain::{AgentId, Position};

/// Default channel capacity (events)
pub const DEFAULT_CHANNEL_CAPACITY: usize = 4096;

/// Central bus for game observability
pub struct EventBus {
    tx: broadcast::Sender<GameEvent>,
}

impl EventBus {
    /// Create a new event bus with the given capacity
    pub fn new(capacity: usize) -> Self {
        debug!(capacity, "EventBus::new: creating event bus");
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Create a new event bus with default capacity
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Emit an event to all subscribers
    ///
    /// Fire-and-forget: without subscribers the event is dropped.
    pub fn emit(&self, event: GameEvent) {
        debug!(event_type = event.event_type(), source = event.source(), "EventBus::emit");
        let _ = self.tx.send(event);
    }

    /// Subscribe to events emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        debug!("EventBus::subscribe: new subscriber");
        self.tx.subscribe()
    }

    /// Create an emitter handle bound to a component name
    pub fn emitter_for(&self, source: impl Into<String>) -> EventEmitter {
        let source = source.into();
        debug!(%source, "EventBus::emitter_for: creating emitter");
        EventEmitter {
            tx: self.tx.clone(),
            source,
        }
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

/// Handle for components to emit events without owning the bus
#[derive(Clone)]
pub struct EventEmitter {
    tx: broadcast::Sender<GameEvent>,
    source: String,
}

impl EventEmitter {
    /// Emitter that is not connected to any observer
    pub fn detached(source: impl Into<String>) -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            source: source.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Emit a raw event
    pub fn emit(&self, event: GameEvent) {
        let _ = self.tx.send(event);
    }

    // === Convenience methods ===

    pub fn agent_ready(&self, agent: AgentId, position: Position) {
        self.emit(GameEvent::AgentReady {
            source: self.source.clone(),
            agent,
            position,
        });
    }

    pub fn agent_moved(&self, agent: AgentId, from: Position, to: Position) {
        self.emit(GameEvent::AgentMoved {
            source: self.source.clone(),
            agent,
            from,
            to,
        });
    }

    pub fn heartbeat_sent(&self, agent: AgentId, position: Position, frozen: bool, game_started: bool) {
        self.emit(GameEvent::HeartbeatSent {
            source: self.source.clone(),
            agent,
            position,
            frozen,
            game_started,
        });
    }

    pub fn agent_stopped(&self, agent: AgentId, position: Position, frozen: bool) {
        self.emit(GameEvent::AgentStopped {
            source: self.source.clone(),
            agent,
            position,
            frozen,
        });
    }

    pub fn phase_changed(&self, from: GamePhase, to: GamePhase) {
        self.emit(GameEvent::PhaseChanged {
            source: self.source.clone(),
            from,
            to,
        });
    }

    pub fn agent_tagged(&self, agent: AgentId, position: Position) {
        self.emit(GameEvent::AgentTagged {
            source: self.source.clone(),
            agent,
            position,
        });
    }

    pub fn resync_issued(&self, agent: AgentId, kind: ResyncKind) {
        self.emit(GameEvent::ResyncIssued {
            source: self.source.clone(),
            agent,
            kind,
        });
    }

    pub fn decode_failed(&self, topic: Topic, message: &str) {
        self.emit(GameEvent::DecodeFailed {
            source: self.source.clone(),
            topic,
            message: message.to_string(),
        });
    }
}

/// Create an event bus wrapped in an Arc for shared ownership
pub fn create_event_bus() -> Arc<EventBus> {
    Arc::new(EventBus::with_default_capacity())
}
