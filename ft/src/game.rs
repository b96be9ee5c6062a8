//! Game runner - one coordinator and N + 1 agents on an in-process bus

use std::fmt;
use std::sync::Arc;

use eyre::{Context, Result};
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, error, info, warn};

use crate::agent::{AgentConfig, AgentState, Hider, HiderStrategy, PursuitStrategy, Seeker, agent_rng};
use crate::bus::{BusError, BusMetrics, LocalBus, Transport};
use crate::config::Config;
use crate::coordinator::{Coordinator, CoordinatorConfig, CoordinatorMetrics, GamePhase};
use crate::domain::{AgentId, Board, BoardError, Position};
use crate::events::{EventBus, create_event_bus};
use crate::render::{BoardObserver, NullObserver, TerminalRenderer};

/// Problems with the launch parameters
#[derive(Debug, Error, PartialEq)]
pub enum SetupError {
    #[error(transparent)]
    Board(#[from] BoardError),

    #[error("Positions need x y pairs, got {0} values")]
    OddCoordinates(usize),

    #[error("{expected} hiders need {} positions (the last one is the seeker), got {found}", .expected + 1)]
    CountMismatch { expected: usize, found: usize },

    #[error("Start position {pos} is outside the {board} board")]
    OutOfBounds { pos: Position, board: Board },

    #[error("At most {max} hiders are supported, got {found}")]
    TooManyHiders { max: usize, found: usize },
}

/// Board and starting cells, fixed for the whole game
///
/// Hiders get ids `0..N` in the order given; the seeker gets id `N`.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSetup {
    board: Board,
    hiders: Vec<Position>,
    seeker: Position,
}

impl GameSetup {
    pub fn new(board: Board, hiders: Vec<Position>, seeker: Position) -> Result<Self, SetupError> {
        debug!(%board, hiders = hiders.len(), %seeker, "GameSetup::new: called");
        let max = usize::from(u16::MAX);
        if hiders.len() >= max {
            return Err(SetupError::TooManyHiders {
                max: max - 1,
                found: hiders.len(),
            });
        }
        if let Some(pos) = hiders
            .iter()
            .chain(std::iter::once(&seeker))
            .find(|pos| !board.contains(**pos))
        {
            return Err(SetupError::OutOfBounds { pos: *pos, board });
        }
        Ok(Self { board, hiders, seeker })
    }

    /// Build from flat `x y` pairs as given on the command line; the last pair is the seeker
    pub fn from_pairs(width: u32, height: u32, hider_count: usize, coords: &[i32]) -> Result<Self, SetupError> {
        let board = Board::new(width, height)?;
        if coords.len() % 2 != 0 {
            return Err(SetupError::OddCoordinates(coords.len()));
        }
        let mut positions: Vec<Position> = coords.chunks_exact(2).map(|c| Position::new(c[0], c[1])).collect();
        if positions.len() != hider_count + 1 {
            return Err(SetupError::CountMismatch {
                expected: hider_count,
                found: positions.len(),
            });
        }
        let Some(seeker) = positions.pop() else {
            return Err(SetupError::CountMismatch {
                expected: hider_count,
                found: 0,
            });
        };
        Self::new(board, positions, seeker)
    }

    pub fn board(&self) -> Board {
        self.board
    }

    pub fn hiders(&self) -> &[Position] {
        &self.hiders
    }

    pub fn seeker(&self) -> Position {
        self.seeker
    }

    pub fn hider_count(&self) -> usize {
        self.hiders.len()
    }

    pub fn seeker_id(&self) -> AgentId {
        AgentId(self.hiders.len() as u16)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Hider,
    Seeker,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Hider => f.pad("hider"),
            Role::Seeker => f.pad("seeker"),
        }
    }
}

/// An agent's own view when it exited
#[derive(Debug, Clone, Serialize)]
pub struct AgentSummary {
    pub id: AgentId,
    pub role: Role,
    pub position: Position,
    pub frozen: bool,
    pub game_started: bool,
}

impl AgentSummary {
    fn new(role: Role, state: &AgentState) -> Self {
        Self {
            id: state.id,
            role,
            position: state.position,
            frozen: state.frozen,
            game_started: state.game_started,
        }
    }
}

/// What happened, as seen by the coordinator and the agents
#[derive(Debug, Clone, Serialize)]
pub struct GameReport {
    pub phase: GamePhase,
    pub tagged: Vec<AgentId>,
    pub untagged: Vec<AgentId>,
    pub agents: Vec<AgentSummary>,
    /// Agents that had to be aborted after the grace period (missed STOP)
    pub stragglers: Vec<AgentId>,
    pub coordinator: CoordinatorMetrics,
    pub bus: Option<BusMetrics>,
    #[serde(rename = "elapsed-ms")]
    pub elapsed_ms: u64,
}

impl fmt::Display for GameReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Game {} after {} ms", self.phase, self.elapsed_ms)?;
        writeln!(f, "  tagged:   {:?}", self.tagged.iter().map(|id| id.0).collect::<Vec<_>>())?;
        writeln!(f, "  untagged: {:?}", self.untagged.iter().map(|id| id.0).collect::<Vec<_>>())?;
        for agent in &self.agents {
            writeln!(
                f,
                "  {} {:<6} at {} frozen={}",
                agent.id, agent.role, agent.position, agent.frozen
            )?;
        }
        if !self.stragglers.is_empty() {
            writeln!(f, "  aborted:  {:?}", self.stragglers.iter().map(|id| id.0).collect::<Vec<_>>())?;
        }
        let m = &self.coordinator;
        write!(
            f,
            "  messages={} freezes={} resyncs={} decode-failures={}",
            m.messages_received, m.freezes_sent, m.resyncs_issued, m.decode_failures
        )
    }
}

type AgentTask = (AgentId, Role, JoinHandle<Result<AgentState, BusError>>);

/// Builds and runs one game
pub struct Game {
    setup: GameSetup,
    config: Config,
    observer: Box<dyn BoardObserver>,
    events: Arc<EventBus>,
}

impl Game {
    pub fn new(setup: GameSetup, config: Config) -> Self {
        let observer: Box<dyn BoardObserver> = if config.render.enabled {
            Box::new(TerminalRenderer::new(config.render.color))
        } else {
            Box::new(NullObserver)
        };
        Self {
            setup,
            config,
            observer,
            events: create_event_bus(),
        }
    }

    pub fn with_observer(mut self, observer: Box<dyn BoardObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        self.events.clone()
    }

    /// Play until the coordinator finishes, then collect the agents
    pub async fn run(self) -> Result<GameReport> {
        let Game {
            setup,
            config,
            observer,
            events,
        } = self;
        let started = Instant::now();
        let timing = &config.timing;
        let board = setup.board();
        let seeker_id = setup.seeker_id();

        info!(%board, hiders = setup.hider_count(), seed = ?config.seed, "Starting game");

        let bus = LocalBus::spawn(config.bus.clone(), config.seed);
        let transport: Arc<dyn Transport> = Arc::new(bus.clone());

        // The coordinator subscribes before any agent can publish READY
        let coordinator_config = CoordinatorConfig::new(board, setup.hider_count(), seeker_id).with_timing(timing);
        let coordinator = Coordinator::connect(
            coordinator_config,
            transport.clone(),
            observer,
            events.emitter_for("coordinator"),
        )
        .await
        .context("Failed to connect coordinator")?;
        let coordinator_task = tokio::spawn(coordinator.run());

        let mut agents: Vec<AgentTask> = Vec::with_capacity(setup.hider_count() + 1);
        for (idx, pos) in setup.hiders().iter().enumerate() {
            let id = AgentId(idx as u16);
            let hider: Hider = Hider::new(
                AgentConfig::hider(id, *pos, board, timing),
                HiderStrategy::new(agent_rng(config.seed, id)),
                transport.clone(),
                events.emitter_for(format!("agent-{id}")),
            );
            agents.push((id, Role::Hider, tokio::spawn(hider.run())));
        }
        let seeker: Seeker = Seeker::new(
            AgentConfig::seeker(seeker_id, setup.seeker(), board, timing),
            PursuitStrategy::new(seeker_id, agent_rng(config.seed, seeker_id)),
            transport.clone(),
            events.emitter_for(format!("agent-{seeker_id}")),
        );
        agents.push((seeker_id, Role::Seeker, tokio::spawn(seeker.run())));

        let outcome = match coordinator_task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Coordinator task died, stopping agents");
                for (_, _, handle) in &agents {
                    handle.abort();
                }
                if let Err(e) = bus.shutdown().await {
                    debug!(error = %e, "Bus already stopped");
                }
                return Err(eyre::Report::new(e).wrap_err("Coordinator task panicked"));
            }
        };

        let deadline = Instant::now() + timing.shutdown_grace();
        let (summaries, stragglers) = collect_agents(agents, deadline).await;

        let bus_metrics = match bus.metrics().await {
            Ok(metrics) => Some(metrics),
            Err(e) => {
                warn!(error = %e, "Could not read bus metrics");
                None
            }
        };
        if let Err(e) = bus.shutdown().await {
            debug!(error = %e, "Bus already stopped");
        }

        let outcome = outcome.context("Coordinator failed")?;
        let elapsed = started.elapsed();
        info!(phase = %outcome.phase, elapsed_ms = elapsed.as_millis(), "Game finished");

        Ok(GameReport {
            phase: outcome.phase,
            tagged: outcome.tagged,
            untagged: outcome.untagged,
            agents: summaries,
            stragglers,
            coordinator: outcome.metrics,
            bus: bus_metrics,
            elapsed_ms: elapsed.as_millis() as u64,
        })
    }
}

/// Join agents until `deadline`; abort the ones still running
async fn collect_agents(agents: Vec<AgentTask>, deadline: Instant) -> (Vec<AgentSummary>, Vec<AgentId>) {
    let mut summaries = Vec::new();
    let mut stragglers = Vec::new();
    for (id, role, mut handle) in agents {
        match timeout_at(deadline, &mut handle).await {
            Ok(Ok(Ok(state))) => summaries.push(AgentSummary::new(role, &state)),
            Ok(Ok(Err(e))) => warn!(%id, error = %e, "Agent stopped with an error"),
            Ok(Err(e)) => warn!(%id, error = %e, "Agent task failed"),
            Err(_) => {
                warn!(%id, "Agent did not stop in time, aborting");
                handle.abort();
                stragglers.push(id);
            }
        }
    }
    (summaries, stragglers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_pairs_last_pair_is_seeker() {
        let setup = GameSetup::from_pairs(20, 15, 2, &[3, 5, 10, 12, 0, 0]).unwrap();
        assert_eq!(setup.hiders(), &[Position::new(3, 5), Position::new(10, 12)]);
        assert_eq!(setup.seeker(), Position::new(0, 0));
        assert_eq!(setup.seeker_id(), AgentId(2));
    }

    #[test]
    fn test_from_pairs_rejects_odd_count() {
        assert_eq!(
            GameSetup::from_pairs(3, 3, 1, &[0, 0, 1]),
            Err(SetupError::OddCoordinates(3))
        );
    }

    #[test]
    fn test_from_pairs_rejects_count_mismatch() {
        let err = GameSetup::from_pairs(3, 3, 2, &[0, 0, 1, 1]).unwrap_err();
        assert_eq!(err, SetupError::CountMismatch { expected: 2, found: 2 });
        assert!(err.to_string().contains("need 3 positions"));
    }

    #[test]
    fn test_rejects_out_of_bounds_start() {
        let err = GameSetup::from_pairs(3, 3, 1, &[3, 0, 0, 0]).unwrap_err();
        assert!(matches!(err, SetupError::OutOfBounds { .. }));
    }

    #[test]
    fn test_rejects_empty_board() {
        let err = GameSetup::from_pairs(0, 3, 0, &[0, 0]).unwrap_err();
        assert!(matches!(err, SetupError::Board(_)));
    }

    #[test]
    fn test_report_display() {
        let report = GameReport {
            phase: GamePhase::Complete,
            tagged: vec![AgentId(0)],
            untagged: vec![],
            agents: vec![AgentSummary {
                id: AgentId(1),
                role: Role::Seeker,
                position: Position::new(1, 1),
                frozen: false,
                game_started: true,
            }],
            stragglers: vec![AgentId(0)],
            coordinator: CoordinatorMetrics::default(),
            bus: None,
            elapsed_ms: 12,
        };
        let text = report.to_string();
        assert!(text.starts_with("Game COMPLETE after 12 ms"));
        assert!(text.contains("seeker"));
        assert!(text.contains("aborted:  [0]"));
    }
}
