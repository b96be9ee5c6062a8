//! Coordinator - authoritative game state machine
//!
//! The coordinator is the only component that decides who is tagged and when
//! the game ends. It learns about agents exclusively from READY, MOVE and
//! STATUS reports and answers with BEGIN, FREEZE and STOP broadcasts:
//!
//! ```text
//! STARTING --(hider_count + 1 distinct READY)--> RUNNING --(no untagged hiders)--> COMPLETE
//!     \____________________ ERROR (invariant violation) ______________________/
//! ```
//!
//! STATUS heartbeats are reconciled against its own view so lost BEGIN, FREEZE,
//! READY and MOVE messages are repaired within one heartbeat interval.

mod config;
mod core;
mod error;
mod metrics;
mod phase;

pub use config::{CoordinatorConfig, DEFAULT_POLL_INTERVAL, DEFAULT_RENDER_INTERVAL};
pub use core::{COORDINATOR_TOPICS, Coordinator, CoordinatorOutcome};
pub use error::CoordinatorError;
pub use metrics::CoordinatorMetrics;
pub use phase::GamePhase;
