//! Coordinator errors

use thiserror::Error;

use super::phase::GamePhase;
use crate::bus::{BusError, DecodeError};
use crate::domain::AgentId;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// The seeker never reported a position although the game is running
    #[error("Seeker {0} has no known position while the game is running")]
    SeekerPositionUnknown(AgentId),

    #[error("Invalid phase transition from {from} to {to}")]
    InvalidTransition { from: GamePhase, to: GamePhase },

    #[error(transparent)]
    Bus(#[from] BusError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}
