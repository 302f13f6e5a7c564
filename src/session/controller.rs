//! Session controller: the state machine between UI intents and engine events.
//!
//! Intents turn into protocol commands; engine events are the only thing
//! that changes the board. The engine protocol carries no correlation ids,
//! so superseded sessions are detected by counting the `MOVED` confirmations
//! the engine still owes each session. On reset whatever the old session is
//! still owed becomes a stale budget, and events are discarded until it is
//! drained. A `WINNER` can trail the last stale confirmation, so a verdict
//! seen before the new game's first move or `AI_THINKING` is discarded too.

use chrono::NaiveDate;

use crate::engine::{CommandSink, EngineOutput};
use crate::protocol::{Color, Command, EngineEvent, Mode, Position, Verdict};
use crate::session::{Outcome, Session, SessionCounters, SessionPhase, DEFAULT_TURN_SECONDS};
use crate::stats::{Countdown, StatsRecord, StatsStore, Theme};

/// Fixed rules for every session run by a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionRules {
    /// Clock length for one game.
    pub turn_seconds: u32,
    /// Colour played by the human in PVE.
    pub human_color: Color,
    /// Send `RESTART` before `SET_MODE` on reset.
    pub restart_handshake: bool,
}

impl Default for SessionRules {
    fn default() -> Self {
        Self {
            turn_seconds: DEFAULT_TURN_SECONDS,
            human_color: Color::White,
            restart_handshake: false,
        }
    }
}

impl SessionRules {
    #[must_use]
    pub fn ai_color(&self) -> Color {
        self.human_color.opponent()
    }

    /// The AI makes the first move of a PVE game when it plays black.
    #[must_use]
    pub fn ai_opens(&self) -> bool {
        self.ai_color() == Color::Black
    }
}

/// Why a move intent was refused locally.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveRejection {
    #[error("No game in progress")]
    NotActive,
    #[error("Coordinate off the board")]
    OutOfBounds,
    #[error("Cell already occupied")]
    Occupied,
    #[error("Not your turn")]
    InputLocked,
    #[error("Previous move not yet confirmed")]
    AwaitingConfirmation,
    #[error("Engine disconnected")]
    Disconnected,
}

/// A user request before it becomes a protocol command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Reset(Mode),
    SwitchMode(Mode),
    Move { x: u8, y: u8 },
    SetTheme(Theme),
    SetCountdown { name: String, date: Option<NaiveDate> },
}

/// A state change the presentation layer can render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    SessionStarted { generation: u64, mode: Mode },
    StonePlaced { position: Position, color: Color },
    TurnChanged { turn: Color, input_locked: bool },
    Thinking,
    Clock { remaining_seconds: u32 },
    GameEnded { outcome: Outcome },
    StatsChanged(StatsRecord),
    MoveRejected { x: u8, y: u8, reason: MoveRejection },
    EngineDisconnected,
}

/// Owns the session, the board mirror and the stats store.
#[derive(Debug)]
pub struct SessionController<S> {
    sink: S,
    stats: StatsStore,
    rules: SessionRules,
    session: Session,
    owed_moves: u32,
    stale_moves: u32,
    stale_verdict_possible: bool,
    connected: bool,
    counters: SessionCounters,
}

impl<S: CommandSink> SessionController<S> {
    #[must_use]
    pub fn new(sink: S, stats: StatsStore, rules: SessionRules) -> Self {
        Self {
            sink,
            stats,
            session: Session::idle(Mode::default(), rules.turn_seconds),
            rules,
            owed_moves: 0,
            stale_moves: 0,
            stale_verdict_possible: false,
            connected: true,
            counters: SessionCounters::default(),
        }
    }

    /// Apply any user intent.
    pub fn apply_intent(&mut self, intent: Intent) -> Vec<Update> {
        match intent {
            Intent::Reset(mode) => self.reset(mode),
            Intent::SwitchMode(mode) => self.switch_mode(mode),
            Intent::Move { x, y } => self
                .request_move(x, y)
                .unwrap_or_else(|reason| vec![Update::MoveRejected { x, y, reason }]),
            Intent::SetTheme(theme) => self.update_preferences(|r| r.theme = theme),
            Intent::SetCountdown { name, date } => {
                self.update_preferences(|r| r.countdown = Countdown { name, date })
            }
        }
    }

    /// Start a new game in `mode`, superseding whatever was running.
    pub fn reset(&mut self, mode: Mode) -> Vec<Update> {
        let generation = self.session.generation + 1;

        self.stale_moves = self.stale_moves.saturating_add(self.owed_moves);
        // The superseded game may still announce its verdict.
        self.stale_verdict_possible =
            self.session.phase != SessionPhase::Idle && self.stale_moves == 0;
        self.owed_moves = u32::from(mode == Mode::Pve && self.rules.ai_opens());
        self.session = Session::start(generation, mode, self.rules.turn_seconds);

        tracing::info!(
            generation,
            %mode,
            stale_moves = self.stale_moves,
            "Session reset"
        );

        let mut updates = vec![
            Update::SessionStarted { generation, mode },
            Update::Clock {
                remaining_seconds: self.session.remaining_seconds,
            },
            self.turn_update(),
        ];

        if self.rules.restart_handshake {
            self.dispatch(Command::Restart, &mut updates);
        }
        self.dispatch(Command::SetMode(mode), &mut updates);
        updates
    }

    /// Switching mode always starts a fresh game.
    pub fn switch_mode(&mut self, mode: Mode) -> Vec<Update> {
        self.reset(mode)
    }

    /// Ask the engine to place a stone at `(x, y)`.
    ///
    /// The board is not touched; it changes only when the engine confirms.
    ///
    /// # Errors
    ///
    /// Returns a `MoveRejection` when the local input lock refuses the move.
    pub fn request_move(&mut self, x: u8, y: u8) -> Result<Vec<Update>, MoveRejection> {
        let checked = self.check_move(x, y);
        let position = match checked {
            Ok(position) => position,
            Err(reason) => {
                self.counters.record_rejection();
                tracing::debug!(x, y, %reason, "Move rejected");
                return Err(reason);
            }
        };

        let mut updates = Vec::new();
        if self.dispatch(Command::Move(position), &mut updates) {
            self.session.pending_move = Some(position);
            let owed = if self.session.mode == Mode::Pve { 2 } else { 1 };
            self.owed_moves = self.owed_moves.saturating_add(owed);
        }
        Ok(updates)
    }

    fn check_move(&self, x: u8, y: u8) -> Result<Position, MoveRejection> {
        if !self.session.is_active() {
            return Err(MoveRejection::NotActive);
        }
        if !self.connected {
            return Err(MoveRejection::Disconnected);
        }
        let position = Position::new(x, y).ok_or(MoveRejection::OutOfBounds)?;
        if self.session.pending_move.is_some() {
            return Err(MoveRejection::AwaitingConfirmation);
        }
        if self.input_locked() {
            return Err(MoveRejection::InputLocked);
        }
        if !self.session.board.is_empty_at(position) {
            return Err(MoveRejection::Occupied);
        }
        Ok(position)
    }

    /// One second of the local clock elapsed for session `generation`.
    ///
    /// The clock is frozen while the engine is disconnected.
    pub fn tick(&mut self, generation: u64) -> Vec<Update> {
        if generation != self.session.generation || !self.clock_running() {
            return Vec::new();
        }

        self.session.remaining_seconds = self.session.remaining_seconds.saturating_sub(1);
        let mut updates = vec![Update::Clock {
            remaining_seconds: self.session.remaining_seconds,
        }];

        if self.session.remaining_seconds == 0 {
            tracing::info!(generation, "Clock expired");
            self.end_game(Outcome::Timeout, &mut updates);
        }
        updates
    }

    /// Feed something observed on the engine's stdout.
    pub fn handle_output(&mut self, output: EngineOutput) -> Vec<Update> {
        match output {
            EngineOutput::Line(line) => self.handle_line(&line),
            EngineOutput::Exited => self.engine_exited(),
        }
    }

    /// Parse and apply one protocol line.
    pub fn handle_line(&mut self, line: &str) -> Vec<Update> {
        self.apply_event(EngineEvent::from_line(line))
    }

    /// Apply one engine event.
    pub fn apply_event(&mut self, event: EngineEvent) -> Vec<Update> {
        self.counters.record_event();

        match event {
            EngineEvent::Unknown { line } => {
                self.counters.record_unknown();
                tracing::debug!(%line, "Ignoring unknown engine event");
                Vec::new()
            }
            EngineEvent::GameStarted => {
                tracing::debug!("Engine acknowledged restart");
                Vec::new()
            }
            event if self.stale_moves > 0 => {
                self.discard_stale(&event);
                Vec::new()
            }
            event @ EngineEvent::GameOver(_) if self.stale_verdict_possible => {
                self.discard_stale(&event);
                Vec::new()
            }
            EngineEvent::MoveConfirmed { position, color } => {
                self.stale_verdict_possible = false;
                self.on_move_confirmed(position, color)
            }
            EngineEvent::AiThinking => {
                self.stale_verdict_possible = false;
                if !self.session.is_active() {
                    return Vec::new();
                }
                self.session.thinking = true;
                vec![Update::Thinking]
            }
            EngineEvent::GameOver(verdict) => self.on_game_over(verdict),
        }
    }

    fn discard_stale(&mut self, event: &EngineEvent) {
        self.counters.record_stale();
        match event {
            EngineEvent::MoveConfirmed { .. } => {
                self.stale_moves -= 1;
                self.stale_verdict_possible = self.stale_moves == 0;
            }
            EngineEvent::GameOver(_) => {
                self.stale_moves = 0;
                self.stale_verdict_possible = false;
            }
            _ => {}
        }
        tracing::debug!(
            ?event,
            stale_moves = self.stale_moves,
            "Discarding event from superseded session"
        );
    }

    fn on_move_confirmed(&mut self, position: Position, color: Color) -> Vec<Update> {
        self.owed_moves = self.owed_moves.saturating_sub(1);

        if !self.session.is_active() {
            tracing::debug!(%position, %color, "Ignoring move, no game in progress");
            return Vec::new();
        }

        if self.is_human(color) {
            self.session.pending_move = None;
        }

        if let Err(e) = self.session.board.place(position, color) {
            tracing::warn!(error = %e, "Ignoring confirmation for occupied cell");
            return Vec::new();
        }

        self.session.turn = color.opponent();
        self.session.thinking = false;
        self.session.last_move = Some((position, color));
        tracing::debug!(%position, %color, turn = %self.session.turn, "Move confirmed");

        vec![Update::StonePlaced { position, color }, self.turn_update()]
    }

    fn on_game_over(&mut self, verdict: Verdict) -> Vec<Update> {
        self.owed_moves = 0;

        if !self.session.is_active() {
            tracing::debug!(?verdict, "Ignoring verdict, no game in progress");
            return Vec::new();
        }

        let mut updates = Vec::new();
        self.end_game(verdict.into(), &mut updates);
        updates
    }

    fn end_game(&mut self, outcome: Outcome, updates: &mut Vec<Update>) {
        self.session.outcome = Some(outcome);
        self.session.thinking = false;
        self.session.pending_move = None;
        self.session.transition(SessionPhase::Ended);

        tracing::info!(?outcome, mode = %self.session.mode, "Game over");
        updates.push(Update::GameEnded { outcome });

        let result = match self.session.mode {
            Mode::Pve => {
                let human_won = outcome == Outcome::Winner(self.rules.human_color);
                self.stats.update(|r| r.record_pve(human_won))
            }
            Mode::Pvp => self.stats.update(StatsRecord::record_pvp),
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to persist stats");
        }
        updates.push(Update::StatsChanged(self.stats.record().clone()));
    }

    /// The engine's stdout closed.
    pub fn engine_exited(&mut self) -> Vec<Update> {
        if !self.connected {
            return Vec::new();
        }
        tracing::warn!(generation = self.session.generation, "Engine exited");
        self.connected = false;
        vec![Update::EngineDisconnected]
    }

    fn update_preferences(&mut self, mutate: impl FnOnce(&mut StatsRecord)) -> Vec<Update> {
        if let Err(e) = self.stats.update(mutate) {
            tracing::warn!(error = %e, "Failed to persist preferences");
        }
        vec![Update::StatsChanged(self.stats.record().clone())]
    }

    /// Send a command, marking the engine disconnected if it is gone.
    fn dispatch(&mut self, command: Command, updates: &mut Vec<Update>) -> bool {
        match self.sink.send(&command) {
            Ok(()) => true,
            Err(e) => {
                self.counters.record_dropped();
                tracing::warn!(%command, error = %e, "Command dropped");
                if self.connected {
                    self.connected = false;
                    updates.push(Update::EngineDisconnected);
                }
                false
            }
        }
    }

    fn is_human(&self, color: Color) -> bool {
        self.session.mode == Mode::Pvp || color == self.rules.human_color
    }

    fn turn_update(&self) -> Update {
        Update::TurnChanged {
            turn: self.session.turn,
            input_locked: self.input_locked(),
        }
    }

    /// Whether the local player may not click right now.
    ///
    /// Derived from the last confirmed move: in PVE the human is locked out
    /// while the turn belongs to the AI colour.
    #[must_use]
    pub fn input_locked(&self) -> bool {
        !self.connected
            || !self.session.is_active()
            || (self.session.mode == Mode::Pve && self.session.turn != self.rules.human_color)
    }

    /// Whether the local clock should be counting down.
    #[must_use]
    pub fn clock_running(&self) -> bool {
        self.connected && self.session.is_active()
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn stats(&self) -> &StatsRecord {
        self.stats.record()
    }

    #[must_use]
    pub fn counters(&self) -> SessionCounters {
        self.counters
    }

    #[must_use]
    pub fn rules(&self) -> SessionRules {
        self.rules
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// The command sink, mostly useful for inspecting it in tests.
    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }
}
