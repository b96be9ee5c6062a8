//! Point-in-time projection of the coordinator's view of the board

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

use crate::coordinator::GamePhase;
use crate::domain::{AgentId, Board, Position, PositionIndex};

/// What a single cell shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Seeker,
    Hider,
    Frozen,
    /// More than one agent on the cell
    Crowded,
}

impl Cell {
    pub fn symbol(self) -> char {
        match self {
            Cell::Empty => '.',
            Cell::Seeker => 'S',
            Cell::Hider => 'H',
            Cell::Frozen => 'F',
            Cell::Crowded => '*',
        }
    }
}

#[derive(Debug, Clone)]
pub struct BoardSnapshot {
    pub width: u32,
    pub height: u32,
    pub phase: GamePhase,
    pub seeker_id: AgentId,
    pub seeker: Option<Position>,
    pub cells: BTreeMap<Position, Vec<AgentId>>,
    pub untagged: Vec<AgentId>,
}

impl BoardSnapshot {
    pub fn capture(
        board: &Board,
        phase: GamePhase,
        index: &PositionIndex,
        seeker_id: AgentId,
        untagged: &BTreeSet<AgentId>,
    ) -> Self {
        let cells = index
            .cells()
            .map(|(pos, ids)| (pos, ids.iter().copied().collect()))
            .collect();
        Self {
            width: board.width(),
            height: board.height(),
            phase,
            seeker_id,
            seeker: index.position_of(seeker_id),
            cells,
            untagged: untagged.iter().copied().collect(),
        }
    }

    pub fn cell_at(&self, pos: Position) -> Cell {
        match self.cells.get(&pos).map(Vec::as_slice) {
            None | Some([]) => Cell::Empty,
            Some([id]) if *id == self.seeker_id => Cell::Seeker,
            Some([id]) if self.untagged.contains(id) => Cell::Hider,
            Some([_]) => Cell::Frozen,
            Some(_) => Cell::Crowded,
        }
    }

    /// Rows of cell symbols, top row first
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for y in 0..self.height as i32 {
            let row: Vec<String> = (0..self.width as i32)
                .map(|x| self.cell_at(Position::new(x, y)).symbol().to_string())
                .collect();
            out.push_str(&row.join(" "));
            out.push('\n');
        }
        out
    }

    /// One status line under the grid
    pub fn summary(&self) -> String {
        let mut line = format!("{}  seeker {}", self.phase, self.seeker_id);
        match self.seeker {
            Some(pos) => {
                let _ = write!(line, " at {pos}");
            }
            None => line.push_str(" (position unknown)"),
        }
        let untagged: Vec<String> = self.untagged.iter().map(ToString::to_string).collect();
        let _ = write!(line, "  untagged [{}]", untagged.join(", "));
        line
    }
}
