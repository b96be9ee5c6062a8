//! Event stream for observing a running game
//!
//! Every component is handed an [`EventEmitter`] when it is built. Consumers
//! (the JSONL [`EventLogger`], tests) subscribe to the [`EventBus`]. Diagnostic
//! logging stays on `tracing`; these events are the structured, replayable
//! record of what happened.

mod bus;
mod logger;
mod types;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventBus, EventEmitter, create_event_bus};
pub use logger::{EventLogger, read_events, spawn_event_logger};
pub use types::{EventLogEntry, GameEvent, ResyncKind};
