//! Game phase owned by the coordinator

use std::fmt;

use serde::{Deserialize, Serialize};

/// Authoritative phase of the game
///
/// Moves forward only (`Starting → Running → Complete`); `Error` may
/// interrupt any non-error phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    Starting,
    Running,
    Complete,
    Error,
}

impl GamePhase {
    pub fn can_transition_to(self, next: GamePhase) -> bool {
        match (self, next) {
            (GamePhase::Error, _) => false,
            (_, GamePhase::Error) => true,
            (GamePhase::Starting, GamePhase::Running) => true,
            (GamePhase::Running, GamePhase::Complete) => true,
            _ => false,
        }
    }

    /// Whether the coordinator loop has finished
    pub fn is_terminal(self) -> bool {
        matches!(self, GamePhase::Complete | GamePhase::Error)
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GamePhase::Starting => "STARTING",
            GamePhase::Running => "RUNNING",
            GamePhase::Complete => "COMPLETE",
            GamePhase::Error => "ERROR",
        };
        f.write_str(name)
    }
}
