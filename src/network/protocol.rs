//! Protocol Messages
//!
//! Wire format over plain TCP.
//!
//! Client to server: newline-terminated text commands, tokens separated
//! by spaces (`POINT_AT 50 50\n`). Reads are not line-aligned, so the
//! [`LineFramer`] buffers bytes and hands out the most recent complete
//! line; older complete lines in the same read are dropped, matching
//! the overwrite semantics of the mailbox.
//!
//! Server to client: one JSON object per line, tagged by `type`.

use serde::{Serialize, Deserialize};

use crate::game::input::CommandLine;
use crate::game::player::PlayerSnapshot;
use crate::game::tick::WorldUpdate;

// =============================================================================
// CLIENT -> SERVER FRAMING
// =============================================================================

/// Framing errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// Unterminated data exceeded the line limit; the buffer was dropped.
    #[error("line exceeds {limit} bytes without a terminator ({buffered} buffered)")]
    LineTooLong {
        /// Configured limit
        limit: usize,
        /// Bytes buffered when the limit tripped
        buffered: usize,
    },
}

/// Accumulates raw reads and extracts the last complete line.
#[derive(Debug)]
pub struct LineFramer {
    buffer: Vec<u8>,
    max_line_bytes: usize,
}

impl LineFramer {
    /// Framer rejecting unterminated input longer than `max_line_bytes`.
    pub fn new(max_line_bytes: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_line_bytes,
        }
    }

    /// Feed a chunk. Returns the last complete line in the buffer, if any,
    /// and keeps the unterminated tail for the next read.
    pub fn push(&mut self, bytes: &[u8]) -> Result<Option<String>, FrameError> {
        self.buffer.extend_from_slice(bytes);

        let Some(last_newline) = self.buffer.iter().rposition(|&b| b == b'\n') else {
            if self.buffer.len() > self.max_line_bytes {
                let buffered = self.buffer.len();
                self.buffer.clear();
                return Err(FrameError::LineTooLong {
                    limit: self.max_line_bytes,
                    buffered,
                });
            }
            return Ok(None);
        };

        let start = self.buffer[..last_newline]
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |i| i + 1);

        let line = String::from_utf8_lossy(&self.buffer[start..last_newline])
            .trim_end_matches('\r')
            .to_string();
        self.buffer.drain(..=last_newline);

        Ok(Some(line))
    }

    /// Feed a chunk and tokenize the resulting line. Blank lines yield `None`.
    pub fn push_command(&mut self, bytes: &[u8]) -> Result<Option<CommandLine>, FrameError> {
        Ok(self.push(bytes)?.and_then(|line| CommandLine::tokenize(&line)))
    }

    /// Bytes waiting for a terminator.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Per-tick state for one player.
    Update {
        /// The recipient
        you: PlayerSnapshot,
        /// Everything else the recipient is told about
        world: WorldView,
    },
}

/// World section of an update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldView {
    /// Other living players
    pub others: Vec<PlayerSnapshot>,
}

impl From<WorldUpdate> for ServerMessage {
    fn from(update: WorldUpdate) -> Self {
        ServerMessage::Update {
            you: update.you,
            world: WorldView {
                others: update.others,
            },
        }
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize as one newline-terminated wire line.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        let mut line = self.to_json()?;
        line.push('\n');
        Ok(line)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
