//! PositionIndex - bidirectional agent ↔ cell lookup

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, warn};

use super::board::{AgentId, Position};

/// Two consistent views of where agents stand
///
/// `positions` holds exactly one entry per known agent; `occupants` holds only
/// non-empty cells. An id is in `occupants[p]` iff `positions[id] == p`.
#[derive(Debug, Clone, Default)]
pub struct PositionIndex {
    positions: HashMap<AgentId, Position>,
    occupants: HashMap<Position, BTreeSet<AgentId>>,
    last_movers: BTreeSet<AgentId>,
}

impl PositionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `id` at `pos` and mark it as a last mover
    ///
    /// `clear_previous = false` is meant for initial registration. An id that
    /// is already registered on another cell is still removed from that cell.
    pub fn set_position(&mut self, id: AgentId, pos: Position, clear_previous: bool) {
        debug!(%id, %pos, clear_previous, "PositionIndex::set_position: called");
        if let Some(previous) = self.positions.insert(id, pos) {
            if !clear_previous && previous != pos {
                warn!(%id, %previous, %pos, "Agent re-registered on a different cell, clearing stale entry");
            }
            self.remove_occupant(previous, id);
        }
        self.occupants.entry(pos).or_default().insert(id);
        self.last_movers.insert(id);
    }

    /// Snapshot of the ids standing on `pos`, ascending
    pub fn occupants_at(&self, pos: Position) -> Vec<AgentId> {
        self.occupants
            .get(&pos)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Last known position of `id`, `None` if it never reported
    pub fn position_of(&self, id: AgentId) -> Option<Position> {
        self.positions.get(&id).copied()
    }

    /// Return and clear the set of ids that moved since the previous drain
    pub fn drain_last_movers(&mut self) -> BTreeSet<AgentId> {
        debug!(count = self.last_movers.len(), "PositionIndex::drain_last_movers: called");
        std::mem::take(&mut self.last_movers)
    }

    /// Number of known agents
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Occupied cells and who stands on them
    pub fn cells(&self) -> impl Iterator<Item = (Position, &BTreeSet<AgentId>)> {
        self.occupants.iter().map(|(pos, ids)| (*pos, ids))
    }

    fn remove_occupant(&mut self, pos: Position, id: AgentId) {
        if let Some(ids) = self.occupants.get_mut(&pos) {
            ids.remove(&id);
            if ids.is_empty() {
                self.occupants.remove(&pos);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn assert_consistent(index: &PositionIndex) {
        for (id, pos) in &index.positions {
            assert!(
                index.occupants.get(pos).is_some_and(|ids| ids.contains(id)),
                "forward entry {id} -> {pos} missing from reverse map"
            );
        }
        for (pos, ids) in &index.occupants {
            assert!(!ids.is_empty(), "empty cell {pos} left in reverse map");
            for id in ids {
                assert_eq!(index.positions.get(id), Some(pos), "reverse entry {pos} -> {id} is stale");
            }
        }
    }

    #[test]
    fn test_move() {
        let mut index = PositionIndex::new();
        index.set_position(AgentId(1), Position::new(1, 2), true);
        assert_eq!(index.position_of(AgentId(1)), Some(Position::new(1, 2)));
        assert_eq!(index.occupants_at(Position::new(1, 2)), vec![AgentId(1)]);
    }

    #[test]
    fn test_move_clears_previous_cell() {
        let mut index = PositionIndex::new();
        index.set_position(AgentId(1), Position::new(0, 0), false);
        index.set_position(AgentId(1), Position::new(0, 1), true);
        assert!(index.occupants_at(Position::new(0, 0)).is_empty());
        assert_eq!(index.occupants_at(Position::new(0, 1)), vec![AgentId(1)]);
        assert_eq!(index.cells().count(), 1);
        assert_consistent(&index);
    }

    #[test]
    fn test_registration_without_clearing() {
        let mut index = PositionIndex::new();
        index.set_position(AgentId(3), Position::new(3, 4), false);
        assert_eq!(index.position_of(AgentId(3)), Some(Position::new(3, 4)));
    }

    #[test]
    fn test_different_start_positions() {
        let mut index = PositionIndex::new();
        index.set_position(AgentId(1), Position::new(5, 6), false);
        index.set_position(AgentId(3), Position::new(0, 0), false);
        assert_ne!(index.position_of(AgentId(1)), index.position_of(AgentId(3)));
    }

    #[test]
    fn test_shared_start_cell() {
        let mut index = PositionIndex::new();
        index.set_position(AgentId(0), Position::new(2, 2), false);
        index.set_position(AgentId(1), Position::new(2, 2), false);
        assert_eq!(index.occupants_at(Position::new(2, 2)), vec![AgentId(0), AgentId(1)]);
        assert_consistent(&index);
    }

    #[test]
    fn test_unknown_agent() {
        let index = PositionIndex::new();
        assert_eq!(index.position_of(AgentId(9)), None);
        assert!(index.occupants_at(Position::new(0, 0)).is_empty());
        assert!(index.is_empty());
    }

    #[test]
    fn test_last_movers_drain_once() {
        let mut index = PositionIndex::new();
        index.set_position(AgentId(1), Position::new(0, 0), true);
        assert_eq!(index.drain_last_movers(), BTreeSet::from([AgentId(1)]));
        assert!(index.drain_last_movers().is_empty());
    }

    #[test]
    fn test_occupants_is_a_snapshot() {
        let mut index = PositionIndex::new();
        index.set_position(AgentId(1), Position::new(0, 0), false);
        let before = index.occupants_at(Position::new(0, 0));
        index.set_position(AgentId(1), Position::new(1, 0), true);
        assert_eq!(before, vec![AgentId(1)]);
    }

    #[test]
    fn test_reregistration_elsewhere_keeps_maps_consistent() {
        let mut index = PositionIndex::new();
        index.set_position(AgentId(2), Position::new(0, 0), false);
        index.set_position(AgentId(2), Position::new(1, 1), false);
        assert!(index.occupants_at(Position::new(0, 0)).is_empty());
        assert_eq!(index.len(), 1);
        assert_consistent(&index);
    }

    proptest! {
        #[test]
        fn prop_maps_stay_consistent(
            ops in proptest::collection::vec((0u16..6, 0i32..4, 0i32..4, any::<bool>()), 0..64)
        ) {
            let mut index = PositionIndex::new();
            for (id, x, y, clear) in ops {
                index.set_position(AgentId(id), Position::new(x, y), clear);
                assert_consistent(&index);
                let pos = index.position_of(AgentId(id)).unwrap();
                prop_assert!(index.occupants_at(pos).contains(&AgentId(id)));
            }
        }
    }
}
