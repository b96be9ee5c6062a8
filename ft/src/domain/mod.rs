//! Core game data: grid geometry and the shared position index

mod board;
mod index;

pub use board::{AgentId, Board, BoardError, Position};
pub use index::PositionIndex;
