//! Main Coordinator task implementation

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::config::CoordinatorConfig;
use super::error::CoordinatorError;
use super::metrics::CoordinatorMetrics;
use super::phase::GamePhase;
use crate::bus::{BusError, Delivery, GameMessage, MoveReport, ReadyReport, StatusReport, Subscription, Topic, Transport};
use crate::domain::{AgentId, Position, PositionIndex};
use crate::events::{EventEmitter, ResyncKind};
use crate::render::{BoardObserver, BoardSnapshot};

/// Topics the coordinator listens on
pub const COORDINATOR_TOPICS: [Topic; 3] = [Topic::Ready, Topic::Move, Topic::Status];

/// Final state handed back when the coordinator loop ends
#[derive(Debug, Clone)]
pub struct CoordinatorOutcome {
    pub phase: GamePhase,
    pub tagged: Vec<AgentId>,
    pub untagged: Vec<AgentId>,
    pub metrics: CoordinatorMetrics,
}

/// The Coordinator owns the authoritative game state
///
/// All mutation happens on the task that calls [`Coordinator::run`]: inbound
/// reports and the RUNNING poll are multiplexed by one `select!` loop.
pub struct Coordinator {
    config: CoordinatorConfig,
    transport: Arc<dyn Transport>,
    inbox: Subscription,
    observer: Box<dyn BoardObserver>,
    events: EventEmitter,
    phase: GamePhase,
    index: PositionIndex,
    /// Ids whose READY (or a late STATUS standing in for it) has been counted
    reported: BTreeSet<AgentId>,
    untagged: BTreeSet<AgentId>,
    tagged: BTreeSet<AgentId>,
    stop_sent: bool,
    dirty: bool,
    last_render: Option<Instant>,
    metrics: CoordinatorMetrics,
}

impl Coordinator {
    /// Subscribe to agent reports and build a coordinator in STARTING
    pub async fn connect(
        config: CoordinatorConfig,
        transport: Arc<dyn Transport>,
        observer: Box<dyn BoardObserver>,
        events: EventEmitter,
    ) -> Result<Self, CoordinatorError> {
        debug!(?config, "Coordinator::connect: called");
        let inbox = transport.subscribe(&COORDINATOR_TOPICS).await?;
        Ok(Self {
            config,
            transport,
            inbox,
            observer,
            events,
            phase: GamePhase::Starting,
            index: PositionIndex::new(),
            reported: BTreeSet::new(),
            untagged: BTreeSet::new(),
            tagged: BTreeSet::new(),
            stop_sent: false,
            dirty: false,
            last_render: None,
            metrics: CoordinatorMetrics::default(),
        })
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn untagged(&self) -> &BTreeSet<AgentId> {
        &self.untagged
    }

    pub fn tagged(&self) -> &BTreeSet<AgentId> {
        &self.tagged
    }

    pub fn index(&self) -> &PositionIndex {
        &self.index
    }

    pub fn metrics(&self) -> &CoordinatorMetrics {
        &self.metrics
    }

    /// Run until the game is COMPLETE or an invariant breaks
    pub async fn run(mut self) -> Result<CoordinatorOutcome, CoordinatorError> {
        let poll = self.config.poll_interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval(poll);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            board = %self.config.board,
            hiders = self.config.hider_count,
            seeker = %self.config.seeker_id,
            "Coordinator started"
        );

        while !self.phase.is_terminal() {
            tokio::select! {
                delivery = self.inbox.recv() => {
                    let Some(delivery) = delivery else {
                        return Err(self.fail(CoordinatorError::Bus(BusError::Closed)).await);
                    };
                    match self.handle_delivery(delivery).await {
                        Ok(()) => {}
                        Err(CoordinatorError::Decode(e)) => {
                            error!(error = %e, "Dropping undecodable report");
                        }
                        Err(e) => return Err(self.fail(e).await),
                    }
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.run_cycle().await {
                        return Err(self.fail(e).await);
                    }
                }
            }
        }

        info!(phase = %self.phase, tagged = self.tagged.len(), "Coordinator stopped");
        Ok(self.outcome())
    }

    /// Decode and apply one delivery
    ///
    /// A payload that does not decode fails the call; nothing is retried.
    pub async fn handle_delivery(&mut self, delivery: Delivery) -> Result<(), CoordinatorError> {
        self.metrics.messages_received += 1;
        let msg = match delivery.decode() {
            Ok(msg) => msg,
            Err(e) => {
                self.metrics.decode_failures += 1;
                self.events.decode_failed(delivery.topic, &e.to_string());
                return Err(e.into());
            }
        };
        self.handle_message(msg).await
    }

    pub async fn handle_message(&mut self, msg: GameMessage) -> Result<(), CoordinatorError> {
        debug!(?msg, phase = %self.phase, "Coordinator::handle_message: called");
        match msg {
            GameMessage::Ready(report) => self.on_ready(report).await,
            GameMessage::Move(report) => {
                self.on_move(report);
                Ok(())
            }
            GameMessage::Status(report) => self.on_status(report).await,
            other => {
                debug!(topic = %other.topic(), "Coordinator: ignoring coordinator-bound topic");
                Ok(())
            }
        }
    }

    async fn on_ready(&mut self, report: ReadyReport) -> Result<(), CoordinatorError> {
        self.metrics.ready_reports += 1;
        if self.phase != GamePhase::Starting {
            debug!(id = %report.id, phase = %self.phase, "Ignoring READY outside STARTING");
            return Ok(());
        }
        self.register(report.id, report.start_position).await
    }

    /// Count a reporter once and register its starting cell
    async fn register(&mut self, id: AgentId, pos: Position) -> Result<(), CoordinatorError> {
        if !self.config.board.contains(pos) {
            warn!(%id, %pos, board = %self.config.board, "Ignoring report outside the board");
            return Ok(());
        }
        if !self.reported.insert(id) {
            debug!(%id, "Duplicate READY ignored");
            return Ok(());
        }

        self.index.set_position(id, pos, false);
        if id != self.config.seeker_id {
            self.untagged.insert(id);
        }
        info!(
            %id,
            %pos,
            reported = self.reported.len(),
            expected = self.config.expected_reports(),
            "Agent ready"
        );

        if self.reported.len() == self.config.expected_reports() {
            self.transition(GamePhase::Running)?;
            self.broadcast(GameMessage::Begin).await?;
            info!(hiders = self.untagged.len(), "All agents ready, game started");
            self.render_view(true);
        }
        Ok(())
    }

    fn on_move(&mut self, report: MoveReport) {
        self.metrics.move_reports += 1;
        if self.phase != GamePhase::Running {
            debug!(id = %report.id, phase = %self.phase, "Ignoring MOVE outside RUNNING");
            return;
        }
        if !self.config.board.contains(report.new_position) {
            warn!(id = %report.id, pos = %report.new_position, "Ignoring MOVE outside the board");
            return;
        }
        self.index.set_position(report.id, report.new_position, true);
    }

    /// Reconcile the coordinator's view with an agent heartbeat
    async fn on_status(&mut self, report: StatusReport) -> Result<(), CoordinatorError> {
        self.metrics.status_reports += 1;
        let id = report.id;

        match self.phase {
            GamePhase::Starting if !self.reported.contains(&id) => {
                warn!(%id, pos = %report.position, "Heartbeat from agent without READY, registering it");
                self.record_resync(id, ResyncKind::LateReady);
                return self.register(id, report.position).await;
            }
            GamePhase::Running => {
                if !report.game_started {
                    warn!(%id, "Agent missed BEGIN, rebroadcasting");
                    self.broadcast(GameMessage::Begin).await?;
                    self.record_resync(id, ResyncKind::RebroadcastBegin);
                }
                if self.config.board.contains(report.position) && self.index.position_of(id) != Some(report.position) {
                    warn!(
                        %id,
                        known = ?self.index.position_of(id),
                        reported = %report.position,
                        "Heartbeat position differs from index, correcting"
                    );
                    self.index.set_position(id, report.position, true);
                    self.record_resync(id, ResyncKind::PositionCorrected);
                }
            }
            _ => {}
        }

        if report.frozen && self.untagged.contains(&id) {
            // Only reachable if an agent froze itself; keep the views aligned
            warn!(%id, "Agent reports frozen but was never tagged, repairing");
            self.untagged.remove(&id);
            self.tagged.insert(id);
            self.send_freeze(id).await?;
            self.record_resync(id, ResyncKind::RepairSelfFrozen);
        } else if !report.frozen && self.tagged.contains(&id) {
            warn!(%id, "Tagged agent still moving, re-sending FREEZE");
            self.send_freeze(id).await?;
            self.record_resync(id, ResyncKind::RefreezeMissed);
        }
        Ok(())
    }

    /// One RUNNING cycle: freeze, draw, check for the end
    pub async fn run_cycle(&mut self) -> Result<(), CoordinatorError> {
        if self.phase != GamePhase::Running {
            return Ok(());
        }
        self.process_freezing().await?;
        self.render_view(false);
        self.check_game_over().await?;
        Ok(())
    }

    /// Freeze every untagged hider sharing the seeker's cell
    pub async fn process_freezing(&mut self) -> Result<Vec<AgentId>, CoordinatorError> {
        let seeker = self.config.seeker_id;
        let Some(pos) = self.index.position_of(seeker) else {
            error!(%seeker, "Seeker position unknown while running");
            return Err(CoordinatorError::SeekerPositionUnknown(seeker));
        };

        let mut frozen = Vec::new();
        for id in self.index.occupants_at(pos) {
            if id == seeker || !self.untagged.remove(&id) {
                continue;
            }
            self.tagged.insert(id);
            self.send_freeze(id).await?;
            self.events.agent_tagged(id, pos);
            self.dirty = true;
            info!(%id, %pos, remaining = self.untagged.len(), "Hider tagged");
            frozen.push(id);
        }
        Ok(frozen)
    }

    /// Push a snapshot to the observer when something changed
    ///
    /// Redraws are rate-limited by the render interval unless `force` is set.
    /// Returns whether a frame was drawn.
    pub fn render_view(&mut self, force: bool) -> bool {
        if !self.index.drain_last_movers().is_empty() {
            self.dirty = true;
        }
        if !force {
            if !self.dirty {
                return false;
            }
            if let Some(last) = self.last_render
                && last.elapsed() < self.config.render_interval
            {
                return false;
            }
        }

        let snapshot = BoardSnapshot::capture(
            &self.config.board,
            self.phase,
            &self.index,
            self.config.seeker_id,
            &self.untagged,
        );
        self.observer.render(&snapshot);
        self.last_render = Some(Instant::now());
        self.dirty = false;
        self.metrics.renders += 1;
        true
    }

    /// Move to COMPLETE once every hider is tagged; returns whether the game is over
    pub async fn check_game_over(&mut self) -> Result<bool, CoordinatorError> {
        match self.phase {
            GamePhase::Complete => return Ok(true),
            GamePhase::Running => {}
            _ => return Ok(false),
        }
        if !self.untagged.is_empty() {
            return Ok(false);
        }

        self.transition(GamePhase::Complete)?;
        self.render_view(true);
        self.broadcast_stop().await?;
        info!(tagged = self.tagged.len(), "All hiders tagged, game over");
        Ok(true)
    }

    fn transition(&mut self, next: GamePhase) -> Result<(), CoordinatorError> {
        if !self.phase.can_transition_to(next) {
            return Err(CoordinatorError::InvalidTransition { from: self.phase, to: next });
        }
        debug!(from = %self.phase, to = %next, "Coordinator::transition: called");
        self.events.phase_changed(self.phase, next);
        self.phase = next;
        Ok(())
    }

    /// Enter ERROR and tell agents to stop
    async fn fail(&mut self, err: CoordinatorError) -> CoordinatorError {
        error!(error = %err, phase = %self.phase, "Coordinator failed");
        if let Err(e) = self.transition(GamePhase::Error) {
            debug!(error = %e, "Already in ERROR");
        }
        if let Err(e) = self.broadcast_stop().await {
            warn!(error = %e, "Failed to broadcast STOP after error");
        }
        err
    }

    async fn broadcast_stop(&mut self) -> Result<(), CoordinatorError> {
        if self.stop_sent {
            return Ok(());
        }
        self.broadcast(GameMessage::Stop).await?;
        self.stop_sent = true;
        Ok(())
    }

    async fn send_freeze(&mut self, id: AgentId) -> Result<(), CoordinatorError> {
        self.broadcast(GameMessage::freeze(id)).await?;
        self.metrics.freezes_sent += 1;
        Ok(())
    }

    async fn broadcast(&self, msg: GameMessage) -> Result<(), CoordinatorError> {
        debug!(topic = %msg.topic(), "Coordinator::broadcast: called");
        self.transport.publish(&msg).await?;
        Ok(())
    }

    fn record_resync(&mut self, id: AgentId, kind: ResyncKind) {
        self.metrics.resyncs_issued += 1;
        self.events.resync_issued(id, kind);
    }

    fn outcome(&self) -> CoordinatorOutcome {
        CoordinatorOutcome {
            phase: self.phase,
            tagged: self.tagged.iter().copied().collect(),
            untagged: self.untagged.iter().copied().collect(),
            metrics: self.metrics.clone(),
        }
    }
}
