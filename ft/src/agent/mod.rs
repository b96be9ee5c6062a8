//! Agents - hiders and the seeker
//!
//! Both kinds run the same [`AgentLifecycle`] engine; what differs is the
//! [`MoveStrategy`] plugged into it. An agent talks to the rest of the game
//! only through the bus: it announces itself with READY, reports MOVE and
//! STATUS, and obeys BEGIN, FREEZE and STOP.

mod hider;
mod lifecycle;
mod seeker;
mod state;
mod strategy;

pub use hider::HiderStrategy;
pub use lifecycle::{AGENT_TOPICS, AgentConfig, AgentLifecycle, Hider, Seeker};
pub use seeker::PursuitStrategy;
pub use state::{AgentState, LifecycleState};
pub use strategy::{MoveStrategy, agent_rng, step_or_stay};
