//! Grid geometry: agent ids, cell positions and board bounds

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Identifier of a hider or the seeker, stable for the agent's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub u16);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for AgentId {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

/// A cell on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Position shifted by the given delta (may leave the board)
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Manhattan distance to another cell
    pub fn manhattan(self, other: Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(i32, i32)> for Position {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// Errors from board construction
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoardError {
    #[error("Board dimensions must be positive, got {width}x{height}")]
    EmptyDimension { width: u32, height: u32 },

    #[error("Board dimensions {width}x{height} exceed the supported grid size")]
    TooLarge { width: u32, height: u32 },
}

/// Immutable W×H grid supplied at launch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    width: u32,
    height: u32,
}

impl Board {
    /// Create a board, rejecting empty or unaddressable dimensions
    pub fn new(width: u32, height: u32) -> Result<Self, BoardError> {
        debug!(width, height, "Board::new: called");
        if width == 0 || height == 0 {
            return Err(BoardError::EmptyDimension { width, height });
        }
        if width > i32::MAX as u32 || height > i32::MAX as u32 {
            return Err(BoardError::TooLarge { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether the position lies inside the board
    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
    }

    /// In-bounds cardinal neighbors of `pos` (right, left, down, up)
    pub fn neighbors(&self, pos: Position) -> Vec<Position> {
        [(1, 0), (-1, 0), (0, 1), (0, -1)]
            .into_iter()
            .map(|(dx, dy)| pos.offset(dx, dy))
            .filter(|candidate| self.contains(*candidate))
            .collect()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
