//! MoveStrategy trait - what distinguishes a hider from the seeker

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use tracing::debug;

use super::state::AgentState;
use crate::bus::{GameMessage, Topic};
use crate::domain::{AgentId, Board, Position};

/// Movement policy plugged into the shared agent lifecycle
///
/// The lifecycle owns cadence, freeze handling and heartbeats; a strategy only
/// decides where to go next and may keep its own bookkeeping.
pub trait MoveStrategy: Send {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Extra topics the agent must subscribe to for this strategy
    fn topics(&self) -> &'static [Topic] {
        &[]
    }

    /// Called for every decoded inbound message, before the lifecycle applies it
    fn observe(&mut self, _msg: &GameMessage) {}

    /// Called once per movement period, frozen or not
    fn tick(&mut self, _state: &AgentState) {}

    /// Next cell for an active agent; returning the current cell means stay
    fn choose_move(&mut self, state: &AgentState, board: &Board) -> Position;
}

/// Uniform random legal 4-neighbor, or `from` when there is none
pub fn step_or_stay(board: &Board, from: Position, rng: &mut StdRng) -> Position {
    match board.neighbors(from).choose(rng) {
        Some(next) => *next,
        None => {
            debug!(%from, %board, "No legal move, staying in place");
            from
        }
    }
}

/// Per-agent RNG: reproducible from a game seed, OS-seeded otherwise
pub fn agent_rng(seed: Option<u64>, id: AgentId) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed ^ (u64::from(id.0) + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)),
        None => StdRng::from_os_rng(),
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::*;

    #[test]
    fn test_step_stays_on_single_cell_board() {
        let board = Board::new(1, 1).unwrap();
        let mut rng = agent_rng(Some(1), AgentId(0));
        assert_eq!(step_or_stay(&board, Position::new(0, 0), &mut rng), Position::new(0, 0));
    }

    #[test]
    fn test_step_is_a_legal_neighbor() {
        let board = Board::new(4, 4).unwrap();
        let mut rng = agent_rng(Some(3), AgentId(0));
        let from = Position::new(0, 3);
        for _ in 0..50 {
            let next = step_or_stay(&board, from, &mut rng);
            assert!(board.contains(next));
            assert_eq!(next.manhattan(from), 1);
        }
    }

    #[test]
    fn test_agent_rng_reproducible_and_distinct() {
        let a: u64 = agent_rng(Some(42), AgentId(0)).random();
        let b: u64 = agent_rng(Some(42), AgentId(0)).random();
        let c: u64 = agent_rng(Some(42), AgentId(1)).random();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
