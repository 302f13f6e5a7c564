//! Line codec for the engine's standard streams.
//!
//! Outbound commands become one `\n`-terminated line each. Inbound bytes
//! arrive in arbitrary chunks; the decoder keeps the unfinished tail in an
//! explicit carry buffer so a line split across reads is never lost or
//! reordered.

use super::Command;

/// Encode a command as a single newline-terminated line.
#[must_use]
pub fn encode(command: &Command) -> Vec<u8> {
    let mut line = command.to_string().into_bytes();
    line.push(b'\n');
    line
}

/// Append `chunk` to `carry` and drain every complete line from it.
///
/// Lines end at `\n`; a preceding `\r` is dropped with the rest of the
/// surrounding whitespace. Blank lines are skipped. Whatever follows the
/// last newline stays in `carry`.
pub fn decode(chunk: &[u8], carry: &mut Vec<u8>) -> Vec<String> {
    carry.extend_from_slice(chunk);

    let Some(last_newline) = carry.iter().rposition(|&b| b == b'\n') else {
        return Vec::new();
    };

    let complete: Vec<u8> = carry.drain(..=last_newline).collect();
    complete
        .split(|&b| b == b'\n')
        .filter_map(normalize)
        .collect()
}

/// Take the remaining partial line at end of stream, if it holds anything.
pub fn finish(carry: &mut Vec<u8>) -> Option<String> {
    let rest = std::mem::take(carry);
    normalize(&rest)
}

fn normalize(raw: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(raw);
    let line = line.trim();
    (!line.is_empty()).then(|| line.to_string())
}

/// Stateful wrapper owning the carry buffer for one stream.
#[derive(Debug, Default)]
pub struct LineDecoder {
    carry: Vec<u8>,
}

impl LineDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return the lines it completed.
    pub fn decode(&mut self, chunk: &[u8]) -> Vec<String> {
        decode(chunk, &mut self.carry)
    }

    /// Flush the trailing partial line at end of stream.
    pub fn finish(&mut self) -> Option<String> {
        finish(&mut self.carry)
    }

    /// Bytes waiting for a newline.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.carry.len()
    }
}
