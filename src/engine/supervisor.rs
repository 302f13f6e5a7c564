//! Engine process supervisor.
//!
//! Owns the engine process and the three I/O tasks around it: a writer
//! draining queued command lines into stdin, a reader decoding stdout into
//! lines, and a stderr logger. Decoded lines are forwarded in arrival order
//! into the caller's queue.

use std::ffi::OsStr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStderr, ChildStdin, ChildStdout};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::engine::{EngineProcess, SpawnError};
use crate::protocol::{encode, Command, LineDecoder};

/// Default grace period between the termination request and a forced kill.
pub const DEFAULT_TERMINATE_TIMEOUT: Duration = Duration::from_secs(2);

const READ_CHUNK: usize = 4096;

/// Error type for engine I/O.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    /// The engine has exited; the command was dropped.
    #[error("Engine is not running")]
    Unavailable,
}

/// Something observed on the engine's stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineOutput {
    /// One complete protocol line.
    Line(String),
    /// Stdout reached end of stream; the engine is gone.
    Exited,
}

/// Destination for outbound protocol commands.
pub trait CommandSink {
    /// Queue a command for the engine without waiting for it to be written.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Unavailable` if the engine can no longer accept
    /// commands.
    fn send(&mut self, command: &Command) -> Result<(), EngineError>;
}

/// Collects commands in memory, for running a controller without an engine.
impl CommandSink for Vec<Command> {
    fn send(&mut self, command: &Command) -> Result<(), EngineError> {
        self.push(*command);
        Ok(())
    }
}

/// Cloneable, non-blocking handle for writing commands to the engine.
#[derive(Debug, Clone)]
pub struct EngineSender {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    alive: Arc<AtomicBool>,
}

impl EngineSender {
    /// Returns true while the engine is believed to be running.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Encode and queue a command.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Unavailable` once the engine has exited.
    pub fn send(&self, command: &Command) -> Result<(), EngineError> {
        if !self.is_alive() {
            tracing::debug!(%command, "Dropping command, engine unavailable");
            return Err(EngineError::Unavailable);
        }
        tracing::debug!(%command, "Sending command");
        self.tx
            .send(encode(command))
            .map_err(|_| EngineError::Unavailable)
    }
}

impl CommandSink for EngineSender {
    fn send(&mut self, command: &Command) -> Result<(), EngineError> {
        EngineSender::send(self, command)
    }
}

/// Supervisor for a running engine process.
#[derive(Debug)]
pub struct EngineSupervisor {
    process: EngineProcess,
    sender: EngineSender,
    writer: JoinHandle<()>,
    reader: JoinHandle<()>,
    stderr: JoinHandle<()>,
    grace: Duration,
}

impl EngineSupervisor {
    /// Spawn the engine and start forwarding its output into `output`.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `SpawnError` if the engine cannot be launched. There is no
    /// retry: the engine is required for a session to exist at all.
    pub fn start<T>(
        path: impl AsRef<Path>,
        output: mpsc::UnboundedSender<T>,
    ) -> Result<Self, SpawnError>
    where
        T: From<EngineOutput> + Send + 'static,
    {
        Self::start_with_args(path, Vec::<String>::new(), output)
    }

    /// Like [`EngineSupervisor::start`], passing `args` to the engine.
    ///
    /// # Errors
    ///
    /// Returns `SpawnError` if the engine cannot be launched.
    pub fn start_with_args<T, I, A>(
        path: impl AsRef<Path>,
        args: I,
        output: mpsc::UnboundedSender<T>,
    ) -> Result<Self, SpawnError>
    where
        T: From<EngineOutput> + Send + 'static,
        I: IntoIterator<Item = A>,
        A: AsRef<OsStr>,
    {
        let mut process = EngineProcess::spawn(path, args)?;
        let stdin = process
            .take_stdin()
            .ok_or(SpawnError::MissingStream("stdin"))?;
        let stdout = process
            .take_stdout()
            .ok_or(SpawnError::MissingStream("stdout"))?;
        let stderr = process
            .take_stderr()
            .ok_or(SpawnError::MissingStream("stderr"))?;

        let alive = Arc::new(AtomicBool::new(true));
        let (tx, rx) = mpsc::unbounded_channel();

        let writer = tokio::spawn(write_loop(stdin, rx, Arc::clone(&alive)));
        let reader = tokio::spawn(read_loop(stdout, output, Arc::clone(&alive)));
        let stderr = tokio::spawn(log_stderr(stderr));

        Ok(Self {
            process,
            sender: EngineSender { tx, alive },
            writer,
            reader,
            stderr,
            grace: DEFAULT_TERMINATE_TIMEOUT,
        })
    }

    /// Set the grace period used by [`EngineSupervisor::stop`].
    #[must_use]
    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// A handle for sending commands.
    #[must_use]
    pub fn sender(&self) -> EngineSender {
        self.sender.clone()
    }

    /// Queue a command for the engine.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Unavailable` once the engine has exited.
    pub fn send(&self, command: &Command) -> Result<(), EngineError> {
        self.sender.send(command)
    }

    /// Returns true while the engine is believed to be running.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.sender.is_alive()
    }

    /// Get the engine process ID, if still running.
    #[must_use]
    pub fn id(&self) -> Option<u32> {
        self.process.id()
    }

    /// Shut the engine down.
    ///
    /// Closes stdin, asks the engine to terminate and kills it if it has
    /// not exited within the grace period. Consumes the supervisor, so it
    /// runs once per engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be terminated.
    pub async fn stop(mut self) -> std::io::Result<()> {
        tracing::info!(pid = ?self.process.id(), "Stopping engine");
        self.sender.alive.store(false, Ordering::SeqCst);

        // Dropping the writer task drops stdin, which closes the pipe.
        self.writer.abort();
        let _ = (&mut self.writer).await;

        let result = self.process.graceful_terminate(self.grace).await;

        // Both streams hit EOF once the process is gone.
        let _ = tokio::time::timeout(self.grace, &mut self.reader).await;
        self.reader.abort();
        self.stderr.abort();

        result
    }
}

async fn write_loop(
    mut stdin: ChildStdin,
    mut rx: mpsc::UnboundedReceiver<Vec<u8>>,
    alive: Arc<AtomicBool>,
) {
    while let Some(line) = rx.recv().await {
        let written = async {
            stdin.write_all(&line).await?;
            stdin.flush().await
        }
        .await;

        if let Err(e) = written {
            tracing::warn!(error = %e, "Engine stdin closed");
            alive.store(false, Ordering::SeqCst);
            break;
        }
    }
}

async fn read_loop<T>(mut stdout: ChildStdout, output: mpsc::UnboundedSender<T>, alive: Arc<AtomicBool>)
where
    T: From<EngineOutput> + Send + 'static,
{
    let mut decoder = LineDecoder::new();
    let mut buf = vec![0u8; READ_CHUNK];

    loop {
        match stdout.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                for line in decoder.decode(&buf[..n]) {
                    tracing::trace!(%line, "Engine line");
                    if output.send(EngineOutput::Line(line).into()).is_err() {
                        return;
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed reading engine stdout");
                break;
            }
        }
    }

    if let Some(line) = decoder.finish() {
        let _ = output.send(EngineOutput::Line(line).into());
    }

    alive.store(false, Ordering::SeqCst);
    tracing::info!("Engine stdout closed");
    let _ = output.send(EngineOutput::Exited.into());
}

async fn log_stderr(stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if !line.trim().is_empty() {
            tracing::warn!(target: "engine", "{line}");
        }
    }
}
