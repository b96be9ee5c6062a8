//! Hider movement: a plain random walk

use rand::rngs::StdRng;

use super::state::AgentState;
use super::strategy::{MoveStrategy, step_or_stay};
use crate::domain::{Board, Position};

#[derive(Debug)]
pub struct HiderStrategy {
    rng: StdRng,
}

impl HiderStrategy {
    pub fn new(rng: StdRng) -> Self {
        Self { rng }
    }
}

impl MoveStrategy for HiderStrategy {
    fn name(&self) -> &'static str {
        "hider"
    }

    fn choose_move(&mut self, state: &AgentState, board: &Board) -> Position {
        step_or_stay(board, state.position, &mut self.rng)
    }
}
