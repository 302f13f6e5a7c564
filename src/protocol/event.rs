//! Inbound events emitted by the engine.
//!
//! Two generations of engines exist. Older ones report moves as
//! `PLAYER_MOVED x,y` (black) and `AI_MOVED x,y` (white); current ones send
//! `MOVED x,y,color`. Both shapes decode to [`EngineEvent::MoveConfirmed`].

use super::{Color, Position};

/// Error produced when a line uses a known keyword with bad arguments.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Malformed engine line '{line}': {reason}")]
    Malformed { line: String, reason: String },
}

impl ProtocolError {
    fn malformed(line: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            line: line.to_string(),
            reason: reason.into(),
        }
    }
}

/// Terminal verdict announced by `WINNER`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Winner(Color),
    Draw,
}

/// An event read from the engine's stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// The engine accepted a stone at `position` for `color`.
    MoveConfirmed { position: Position, color: Color },
    /// The AI started searching.
    AiThinking,
    /// The game is over.
    GameOver(Verdict),
    /// Legacy acknowledgement of `RESTART`.
    GameStarted,
    /// Anything not understood, kept verbatim for diagnostics.
    Unknown { line: String },
}

impl EngineEvent {
    /// Parse a line, folding malformed input into [`EngineEvent::Unknown`].
    #[must_use]
    pub fn from_line(line: &str) -> Self {
        parse_line(line).unwrap_or_else(|err| {
            tracing::debug!(error = %err, "Treating malformed line as unknown event");
            Self::Unknown {
                line: line.to_string(),
            }
        })
    }

    /// Returns true if this event ends the game.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::GameOver(_))
    }
}

/// Parse a single trimmed protocol line.
///
/// Unknown keywords are not an error; they come back as
/// [`EngineEvent::Unknown`].
///
/// # Errors
///
/// Returns `ProtocolError::Malformed` when a known keyword carries missing
/// or invalid arguments.
pub fn parse_line(line: &str) -> Result<EngineEvent, ProtocolError> {
    let line = line.trim();
    let mut parts = line.split_whitespace();
    let keyword = parts.next().unwrap_or_default();
    let args = parts.next();

    match keyword {
        "MOVED" => {
            let fields = split_fields(line, args, 3)?;
            let position = parse_position(line, fields[0], fields[1])?;
            let color = fields[2]
                .parse::<u8>()
                .ok()
                .and_then(Color::from_code)
                .ok_or_else(|| ProtocolError::malformed(line, "color must be 1 or 2"))?;
            Ok(EngineEvent::MoveConfirmed { position, color })
        }
        "PLAYER_MOVED" | "AI_MOVED" => {
            let fields = split_fields(line, args, 2)?;
            let position = parse_position(line, fields[0], fields[1])?;
            let color = if keyword == "PLAYER_MOVED" {
                Color::Black
            } else {
                Color::White
            };
            Ok(EngineEvent::MoveConfirmed { position, color })
        }
        "AI_THINKING" => Ok(EngineEvent::AiThinking),
        "WINNER" => match args {
            Some("BLACK") => Ok(EngineEvent::GameOver(Verdict::Winner(Color::Black))),
            Some("WHITE") => Ok(EngineEvent::GameOver(Verdict::Winner(Color::White))),
            Some("DRAW") => Ok(EngineEvent::GameOver(Verdict::Draw)),
            _ => Err(ProtocolError::malformed(
                line,
                "expected BLACK, WHITE or DRAW",
            )),
        },
        "GAME_STARTED" => Ok(EngineEvent::GameStarted),
        _ => Ok(EngineEvent::Unknown {
            line: line.to_string(),
        }),
    }
}

fn split_fields<'a>(
    line: &str,
    args: Option<&'a str>,
    expected: usize,
) -> Result<Vec<&'a str>, ProtocolError> {
    let args = args.ok_or_else(|| ProtocolError::malformed(line, "missing arguments"))?;
    let fields: Vec<&str> = args.split(',').map(str::trim).collect();
    if fields.len() == expected {
        Ok(fields)
    } else {
        Err(ProtocolError::malformed(
            line,
            format!("expected {expected} comma-separated fields"),
        ))
    }
}

fn parse_position(line: &str, x: &str, y: &str) -> Result<Position, ProtocolError> {
    let x = x
        .parse::<u8>()
        .map_err(|_| ProtocolError::malformed(line, "x is not a number"))?;
    let y = y
        .parse::<u8>()
        .map_err(|_| ProtocolError::malformed(line, "y is not a number"))?;
    Position::new(x, y).ok_or_else(|| ProtocolError::malformed(line, "coordinate off the board"))
}
