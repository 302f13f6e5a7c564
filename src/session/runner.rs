//! Session runner: the single queue every producer posts into.
//!
//! Engine output, clock ticks and UI intents are all messages on one
//! channel, drained by one task into the controller. Nothing else touches
//! session state, so events are applied strictly in arrival order.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;

use crate::engine::{CommandSink, EngineOutput};
use crate::session::{Intent, SessionController, Update};

/// Default interval between clock ticks.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(1);

/// A message on the session queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionMessage {
    Intent(Intent),
    Engine(EngineOutput),
    /// One clock period elapsed for the given session generation.
    Tick { generation: u64 },
    Shutdown,
}

impl From<EngineOutput> for SessionMessage {
    fn from(output: EngineOutput) -> Self {
        Self::Engine(output)
    }
}

impl From<Intent> for SessionMessage {
    fn from(intent: Intent) -> Self {
        Self::Intent(intent)
    }
}

/// Create the session queue.
#[must_use]
pub fn session_queue() -> (
    mpsc::UnboundedSender<SessionMessage>,
    mpsc::UnboundedReceiver<SessionMessage>,
) {
    mpsc::unbounded_channel()
}

/// Cloneable handle for the presentation side.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionMessage>,
}

impl SessionHandle {
    /// Post an intent. Returns false once the runner is gone.
    pub fn post(&self, intent: Intent) -> bool {
        self.tx.send(SessionMessage::Intent(intent)).is_ok()
    }

    /// Ask the runner to stop after the messages already queued.
    pub fn shutdown(&self) {
        let _ = self.tx.send(SessionMessage::Shutdown);
    }
}

/// Drains the session queue into a controller and publishes updates.
pub struct SessionRunner<S> {
    controller: SessionController<S>,
    tx: mpsc::UnboundedSender<SessionMessage>,
    rx: mpsc::UnboundedReceiver<SessionMessage>,
    updates: mpsc::UnboundedSender<Update>,
    cancel: CancellationToken,
    ticker: Option<(u64, CancellationToken)>,
    tick_period: Duration,
}

impl<S: CommandSink + Send + 'static> SessionRunner<S> {
    #[must_use]
    pub fn new(
        controller: SessionController<S>,
        tx: mpsc::UnboundedSender<SessionMessage>,
        rx: mpsc::UnboundedReceiver<SessionMessage>,
        updates: mpsc::UnboundedSender<Update>,
    ) -> Self {
        Self {
            controller,
            tx,
            rx,
            updates,
            cancel: CancellationToken::new(),
            ticker: None,
            tick_period: DEFAULT_TICK_PERIOD,
        }
    }

    /// Set a cancellation token for shutdown.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Override the clock period.
    #[must_use]
    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }

    #[must_use]
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            tx: self.tx.clone(),
        }
    }

    /// Run until cancelled or shut down, then hand the controller back.
    pub async fn run(mut self) -> SessionController<S> {
        loop {
            tokio::select! {
                biased;

                () = self.cancel.cancelled() => {
                    tracing::info!("Session runner cancelled");
                    break;
                }
                message = self.rx.recv() => {
                    let Some(message) = message else { break };
                    if message == SessionMessage::Shutdown {
                        tracing::debug!("Session runner shutting down");
                        break;
                    }
                    let updates = self.dispatch(message);
                    self.sync_ticker();
                    for update in updates {
                        let _ = self.updates.send(update);
                    }
                }
            }
        }

        self.stop_ticker();
        self.controller
    }

    fn dispatch(&mut self, message: SessionMessage) -> Vec<Update> {
        match message {
            SessionMessage::Intent(intent) => self.controller.apply_intent(intent),
            SessionMessage::Engine(output) => self.controller.handle_output(output),
            SessionMessage::Tick { generation } => self.controller.tick(generation),
            SessionMessage::Shutdown => Vec::new(),
        }
    }

    /// Keep exactly one ticker running, for the active connected session only.
    fn sync_ticker(&mut self) {
        let wanted = self
            .controller
            .clock_running()
            .then(|| self.controller.session().generation());
        let current = self.ticker.as_ref().map(|(generation, _)| *generation);
        if wanted == current {
            return;
        }

        self.stop_ticker();
        if let Some(generation) = wanted {
            let token = self.cancel.child_token();
            tokio::spawn(run_ticker(
                self.tx.clone(),
                generation,
                self.tick_period,
                token.clone(),
            ));
            tracing::debug!(generation, "Clock started");
            self.ticker = Some((generation, token));
        }
    }

    fn stop_ticker(&mut self) {
        if let Some((generation, token)) = self.ticker.take() {
            token.cancel();
            tracing::debug!(generation, "Clock stopped");
        }
    }
}

async fn run_ticker(
    tx: mpsc::UnboundedSender<SessionMessage>,
    generation: u64,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut interval = interval_at(Instant::now() + period, period);
    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if tx.send(SessionMessage::Tick { generation }).is_err() {
                    break;
                }
            }
        }
    }
}
