//! AgentLifecycle - the control loop shared by hiders and the seeker

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, info, warn};

use super::hider::HiderStrategy;
use super::seeker::PursuitStrategy;
use super::state::AgentState;
use super::strategy::MoveStrategy;
use crate::bus::{BusError, DecodeError, Delivery, GameMessage, Subscription, Topic, Transport};
use crate::config::TimingConfig;
use crate::domain::{AgentId, Board, Position};
use crate::events::EventEmitter;

/// Topics every agent listens on
pub const AGENT_TOPICS: [Topic; 3] = [Topic::Begin, Topic::Freeze, Topic::Stop];

/// Launch parameters for one agent
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub id: AgentId,
    pub start: Position,
    pub board: Board,
    /// Time between movement steps
    pub move_frequency: Duration,
    /// Minimum time between STATUS heartbeats
    pub sync_frequency: Duration,
}

impl AgentConfig {
    pub fn hider(id: AgentId, start: Position, board: Board, timing: &TimingConfig) -> Self {
        Self {
            id,
            start,
            board,
            move_frequency: timing.hider_move(),
            sync_frequency: timing.sync(),
        }
    }

    pub fn seeker(id: AgentId, start: Position, board: Board, timing: &TimingConfig) -> Self {
        Self {
            id,
            start,
            board,
            move_frequency: timing.seeker_move(),
            sync_frequency: timing.sync(),
        }
    }
}

/// One agent: local state, a movement strategy and a bus handle
pub struct AgentLifecycle<S: MoveStrategy> {
    config: AgentConfig,
    state: AgentState,
    strategy: S,
    transport: Arc<dyn Transport>,
    events: EventEmitter,
}

pub type Hider = AgentLifecycle<HiderStrategy>;
pub type Seeker = AgentLifecycle<PursuitStrategy>;

impl<S: MoveStrategy> AgentLifecycle<S> {
    pub fn new(config: AgentConfig, strategy: S, transport: Arc<dyn Transport>, events: EventEmitter) -> Self {
        debug!(id = %config.id, start = %config.start, strategy = strategy.name(), "AgentLifecycle::new: called");
        let state = AgentState::new(config.id, config.start);
        Self {
            config,
            state,
            strategy,
            transport,
            events,
        }
    }

    pub fn state(&self) -> &AgentState {
        &self.state
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Subscribe, then announce the starting cell with READY
    pub async fn start(&mut self) -> Result<Subscription, BusError> {
        let mut topics = AGENT_TOPICS.to_vec();
        for topic in self.strategy.topics() {
            if !topics.contains(topic) {
                topics.push(*topic);
            }
        }
        let inbox = self.transport.subscribe(&topics).await?;

        self.transport
            .publish(&GameMessage::ready(self.state.id, self.state.position))
            .await?;
        self.events.agent_ready(self.state.id, self.state.position);
        info!(id = %self.state.id, role = self.strategy.name(), pos = %self.state.position, "Agent ready");
        Ok(inbox)
    }

    /// Apply one inbound broadcast to the local state
    pub fn handle_message(&mut self, msg: &GameMessage) {
        self.strategy.observe(msg);
        match msg {
            GameMessage::Begin => self.state.apply_begin(),
            GameMessage::Freeze(order) => {
                self.state.apply_freeze(order.target);
            }
            GameMessage::Stop => self.state.apply_stop(),
            _ => {}
        }
    }

    pub fn handle_delivery(&mut self, delivery: Delivery) -> Result<(), DecodeError> {
        let msg = delivery.decode()?;
        self.handle_message(&msg);
        Ok(())
    }

    /// One movement period: strategy tick, optional move, heartbeat if due
    pub async fn step(&mut self) -> Result<(), BusError> {
        self.strategy.tick(&self.state);

        if self.state.can_move() {
            let from = self.state.position;
            let next = self.strategy.choose_move(&self.state, &self.config.board);
            if next == from {
                debug!(id = %self.state.id, pos = %from, "Staying in place this step");
            } else if !self.config.board.contains(next) {
                warn!(id = %self.state.id, %next, "Strategy chose a cell outside the board, staying");
            } else {
                self.transport.publish(&GameMessage::moved(self.state.id, next)).await?;
                self.state.position = next;
                self.events.agent_moved(self.state.id, from, next);
            }
        }

        self.heartbeat(Instant::now()).await
    }

    async fn heartbeat(&mut self, now: Instant) -> Result<(), BusError> {
        if !self.state.heartbeat_due(now, self.config.sync_frequency) {
            return Ok(());
        }
        let report = self.state.status_report();
        self.transport.publish(&GameMessage::Status(report)).await?;
        self.state.last_heartbeat = Some(now);
        self.events
            .heartbeat_sent(report.id, report.position, report.frozen, report.game_started);
        Ok(())
    }

    /// Multiplex inbound broadcasts and movement periods until STOP
    pub async fn run_loop(&mut self, mut inbox: Subscription) -> Result<(), BusError> {
        let period = self.config.move_frequency.max(Duration::from_millis(1));
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !self.state.terminated {
            tokio::select! {
                delivery = inbox.recv() => {
                    let Some(delivery) = delivery else {
                        warn!(id = %self.state.id, "Bus closed before STOP");
                        return Err(BusError::Closed);
                    };
                    if let Err(e) = self.handle_delivery(delivery) {
                        error!(id = %self.state.id, error = %e, "Dropping undecodable broadcast");
                        self.events.decode_failed(e.topic(), &e.to_string());
                    }
                }
                _ = ticker.tick() => self.step().await?,
            }
        }

        info!(id = %self.state.id, pos = %self.state.position, frozen = self.state.frozen, "Agent stopped");
        self.events
            .agent_stopped(self.state.id, self.state.position, self.state.frozen);
        Ok(())
    }

    /// Start, run until STOP and hand back the final local state
    pub async fn run(mut self) -> Result<AgentState, BusError> {
        let inbox = self.start().await?;
        self.run_loop(inbox).await?;
        Ok(self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::strategy::agent_rng;
    use crate::bus::{BusConfig, LocalBus, StatusReport};

    /// Always heads for one cell and counts ticks
    struct Fixed {
        target: Position,
        ticks: usize,
    }

    impl MoveStrategy for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn tick(&mut self, _state: &AgentState) {
            self.ticks += 1;
        }

        fn choose_move(&mut self, _state: &AgentState, _board: &Board) -> Position {
            self.target
        }
    }

    fn config(id: u16, x: i32, y: i32) -> AgentConfig {
        AgentConfig {
            id: AgentId(id),
            start: Position::new(x, y),
            board: Board::new(3, 3).unwrap(),
            move_frequency: Duration::from_millis(100),
            sync_frequency: Duration::from_secs(2),
        }
    }

    fn fixed_agent(bus: &LocalBus, target: Position) -> AgentLifecycle<Fixed> {
        AgentLifecycle::new(
            config(0, 0, 0),
            Fixed { target, ticks: 0 },
            Arc::new(bus.clone()),
            EventEmitter::detached("agent-0"),
        )
    }

    async fn next(listener: &mut Subscription) -> GameMessage {
        listener.recv().await.unwrap().decode().unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_publishes_ready() {
        let bus = LocalBus::spawn(BusConfig::default(), None);
        let mut listener = bus.subscribe(&[Topic::Ready]).await.unwrap();
        let mut agent = fixed_agent(&bus, Position::new(1, 0));

        let inbox = agent.start().await.unwrap();
        assert_eq!(inbox.topics(), &AGENT_TOPICS);
        assert_eq!(next(&mut listener).await, GameMessage::ready(AgentId(0), Position::new(0, 0)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_move_before_begin_but_heartbeat() {
        let bus = LocalBus::spawn(BusConfig::default(), None);
        let mut listener = bus.subscribe(&[Topic::Move, Topic::Status]).await.unwrap();
        let mut agent = fixed_agent(&bus, Position::new(1, 0));

        agent.step().await.unwrap();
        assert_eq!(agent.state().position, Position::new(0, 0));
        assert_eq!(agent.strategy().ticks, 1);
        assert_eq!(
            next(&mut listener).await,
            GameMessage::Status(StatusReport {
                id: AgentId(0),
                position: Position::new(0, 0),
                frozen: false,
                game_started: false,
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_moves_after_begin_and_rate_limits_heartbeat() {
        let bus = LocalBus::spawn(BusConfig::default(), None);
        let mut listener = bus.subscribe(&[Topic::Move, Topic::Status]).await.unwrap();
        let mut agent = fixed_agent(&bus, Position::new(1, 0));

        agent.step().await.unwrap();
        agent.handle_message(&GameMessage::Begin);
        agent.step().await.unwrap();

        assert_eq!(agent.state().position, Position::new(1, 0));
        assert!(matches!(next(&mut listener).await, GameMessage::Status(_)));
        assert_eq!(next(&mut listener).await, GameMessage::moved(AgentId(0), Position::new(1, 0)));
        // Paused clock: the second step is inside the sync period
        assert!(listener.try_recv().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_frozen_agent_ticks_but_stays() {
        let bus = LocalBus::spawn(BusConfig::default(), None);
        let mut agent = fixed_agent(&bus, Position::new(1, 0));

        agent.handle_message(&GameMessage::Begin);
        agent.handle_message(&GameMessage::freeze(AgentId(0)));
        // A recovery rebroadcast of BEGIN must not thaw it
        agent.handle_message(&GameMessage::Begin);
        agent.step().await.unwrap();
        agent.step().await.unwrap();

        assert_eq!(agent.state().position, Position::new(0, 0));
        assert!(agent.state().frozen);
        assert_eq!(agent.strategy().ticks, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_bounds_choice_ignored() {
        let bus = LocalBus::spawn(BusConfig::default(), None);
        let mut agent = fixed_agent(&bus, Position::new(-1, 0));
        agent.handle_message(&GameMessage::Begin);
        agent.step().await.unwrap();
        assert_eq!(agent.state().position, Position::new(0, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_seeker_subscribes_to_moves() {
        let bus = LocalBus::spawn(BusConfig::default(), None);
        let id = AgentId(1);
        let mut seeker: Seeker = AgentLifecycle::new(
            config(1, 2, 2),
            PursuitStrategy::new(id, agent_rng(Some(1), id)),
            Arc::new(bus.clone()),
            EventEmitter::detached("agent-1"),
        );
        let mut inbox = seeker.start().await.unwrap();
        assert!(inbox.topics().contains(&Topic::Move));

        bus.publish(&GameMessage::moved(AgentId(0), Position::new(0, 1))).await.unwrap();
        let delivery = inbox.recv().await.unwrap();
        seeker.handle_delivery(delivery).unwrap();
        assert_eq!(seeker.strategy().index().position_of(AgentId(0)), Some(Position::new(0, 1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_stop() {
        let bus = LocalBus::spawn(BusConfig::default(), None);
        let id = AgentId(0);
        let hider: Hider = AgentLifecycle::new(
            config(0, 1, 1),
            HiderStrategy::new(agent_rng(Some(2), id)),
            Arc::new(bus.clone()),
            EventEmitter::detached("agent-0"),
        );
        let mut ready = bus.subscribe(&[Topic::Ready]).await.unwrap();
        let handle = tokio::spawn(hider.run());

        ready.recv().await.unwrap();
        bus.publish(&GameMessage::Begin).await.unwrap();
        tokio::time::sleep(Duration::from_millis(550)).await;
        bus.publish(&GameMessage::Stop).await.unwrap();

        let state = handle.await.unwrap().unwrap();
        assert!(state.terminated);
        assert!(state.game_started);
        assert!(!state.frozen);
        assert!(Board::new(3, 3).unwrap().contains(state.position));
    }

    #[tokio::test(start_paused = true)]
    async fn test_undecodable_broadcast_dropped() {
        let bus = LocalBus::spawn(BusConfig::default(), None);
        let mut agent = fixed_agent(&bus, Position::new(1, 0));
        let bad = Delivery {
            topic: Topic::Freeze,
            payload: br#"{"type":"Stop"}"#.to_vec(),
        };
        assert!(agent.handle_delivery(bad).is_err());
        assert!(!agent.state().terminated);
    }
}
