//! Seeker pursuit: a biased random walk toward the nearest known hider

use std::collections::BTreeSet;

use rand::Rng;
use rand::rngs::StdRng;
use tracing::debug;

use super::state::AgentState;
use super::strategy::{MoveStrategy, step_or_stay};
use crate::bus::{GameMessage, Topic};
use crate::domain::{AgentId, Board, Position, PositionIndex};

/// The seeker's local view, fed only by MOVE and FREEZE broadcasts
///
/// Its idea of who is tagged is advisory; the coordinator decides.
#[derive(Debug)]
pub struct PursuitStrategy {
    id: AgentId,
    index: PositionIndex,
    peers: BTreeSet<AgentId>,
    tagged: BTreeSet<AgentId>,
    rng: StdRng,
}

impl PursuitStrategy {
    pub fn new(id: AgentId, rng: StdRng) -> Self {
        Self {
            id,
            index: PositionIndex::new(),
            peers: BTreeSet::new(),
            tagged: BTreeSet::new(),
            rng,
        }
    }

    /// Ids believed to be still untagged
    pub fn peers(&self) -> &BTreeSet<AgentId> {
        &self.peers
    }

    pub fn index(&self) -> &PositionIndex {
        &self.index
    }

    /// Closest peer with a known in-bounds position; ties go to the smallest id
    pub fn nearest_peer(&self, from: Position, board: &Board) -> Option<(AgentId, Position)> {
        let mut best: Option<(AgentId, Position, u32)> = None;
        for &id in &self.peers {
            let Some(pos) = self.index.position_of(id) else {
                continue;
            };
            if !board.contains(pos) {
                continue;
            }
            let distance = from.manhattan(pos);
            if best.is_none_or(|(_, _, d)| distance < d) {
                best = Some((id, pos, distance));
            }
        }
        best.map(|(id, pos, _)| (id, pos))
    }
}

impl MoveStrategy for PursuitStrategy {
    fn name(&self) -> &'static str {
        "seeker"
    }

    fn topics(&self) -> &'static [Topic] {
        &[Topic::Move]
    }

    fn observe(&mut self, msg: &GameMessage) {
        match msg {
            GameMessage::Move(report) => {
                self.index.set_position(report.id, report.new_position, true);
            }
            GameMessage::Freeze(order) => {
                self.tagged.insert(order.target);
                if self.peers.remove(&order.target) {
                    debug!(target = %order.target, "PursuitStrategy: peer tagged");
                }
            }
            _ => {}
        }
    }

    fn tick(&mut self, _state: &AgentState) {
        for id in self.index.drain_last_movers() {
            if id != self.id && !self.tagged.contains(&id) && self.peers.insert(id) {
                debug!(%id, "PursuitStrategy: new peer");
            }
        }
    }

    fn choose_move(&mut self, state: &AgentState, board: &Board) -> Position {
        let me = state.position;
        let Some((peer, target)) = self.nearest_peer(me, board) else {
            return step_or_stay(board, me, &mut self.rng);
        };

        let dx = (target.x - me.x).signum();
        let dy = (target.y - me.y).signum();
        // One axis per step, chosen by coin flip; a zero delta on that axis means wait
        let next = if self.rng.random_bool(0.5) {
            me.offset(dx, 0)
        } else {
            me.offset(0, dy)
        };
        debug!(%peer, %target, %next, "PursuitStrategy::choose_move: chasing");
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::strategy::agent_rng;

    const SEEKER: AgentId = AgentId(9);

    fn strategy() -> PursuitStrategy {
        PursuitStrategy::new(SEEKER, agent_rng(Some(11), SEEKER))
    }

    fn observe_move(s: &mut PursuitStrategy, id: u16, x: i32, y: i32) {
        s.observe(&GameMessage::moved(AgentId(id), Position::new(x, y)));
    }

    #[test]
    fn test_tick_learns_peers_but_not_self() {
        let mut s = strategy();
        let state = AgentState::new(SEEKER, Position::new(0, 0));
        observe_move(&mut s, 1, 2, 2);
        observe_move(&mut s, 9, 0, 1);
        s.tick(&state);
        assert_eq!(s.peers().iter().copied().collect::<Vec<_>>(), vec![AgentId(1)]);
    }

    #[test]
    fn test_freeze_removes_peer_for_good() {
        let mut s = strategy();
        let state = AgentState::new(SEEKER, Position::new(0, 0));
        observe_move(&mut s, 1, 2, 2);
        s.tick(&state);
        s.observe(&GameMessage::freeze(AgentId(1)));
        assert!(s.peers().is_empty());

        // A stray move from the tagged hider does not bring it back
        observe_move(&mut s, 1, 2, 1);
        s.tick(&state);
        assert!(s.peers().is_empty());
    }

    #[test]
    fn test_nearest_peer_tie_breaks_on_smallest_id() {
        let board = Board::new(5, 5).unwrap();
        let mut s = strategy();
        let state = AgentState::new(SEEKER, Position::new(2, 2));
        observe_move(&mut s, 4, 2, 4);
        observe_move(&mut s, 3, 0, 2);
        observe_move(&mut s, 7, 4, 4);
        s.tick(&state);
        assert_eq!(s.nearest_peer(state.position, &board), Some((AgentId(3), Position::new(0, 2))));
    }

    #[test]
    fn test_chase_moves_one_axis_toward_peer() {
        let board = Board::new(5, 5).unwrap();
        let mut s = strategy();
        let state = AgentState::new(SEEKER, Position::new(0, 0));
        observe_move(&mut s, 1, 3, 4);
        s.tick(&state);
        for _ in 0..50 {
            let next = s.choose_move(&state, &board);
            assert!(next == Position::new(1, 0) || next == Position::new(0, 1));
        }
    }

    #[test]
    fn test_chase_on_shared_row_moves_or_waits() {
        let board = Board::new(5, 1).unwrap();
        let mut s = strategy();
        let state = AgentState::new(SEEKER, Position::new(4, 0));
        observe_move(&mut s, 1, 0, 0);
        s.tick(&state);
        for _ in 0..50 {
            let next = s.choose_move(&state, &board);
            assert!(next == Position::new(3, 0) || next == Position::new(4, 0));
        }
    }

    #[test]
    fn test_no_peers_explores() {
        let board = Board::new(3, 3).unwrap();
        let mut s = strategy();
        let state = AgentState::new(SEEKER, Position::new(1, 1));
        let next = s.choose_move(&state, &board);
        assert_eq!(next.manhattan(state.position), 1);
    }

    #[test]
    fn test_out_of_bounds_peer_ignored() {
        let board = Board::new(3, 3).unwrap();
        let mut s = strategy();
        let state = AgentState::new(SEEKER, Position::new(1, 1));
        observe_move(&mut s, 1, 50, 0);
        s.tick(&state);

        assert!(s.peers().contains(&AgentId(1)));
        assert_eq!(s.nearest_peer(state.position, &board), None);
        for _ in 0..20 {
            let next = s.choose_move(&state, &board);
            assert!(board.contains(next));
            assert_eq!(next.manhattan(state.position), 1);
        }
    }
}
