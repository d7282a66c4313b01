//! Player Commands and Mailbox
//!
//! Text commands arrive from the network as a name plus string arguments.
//! The I/O side stores the latest one in the player's [`Mailbox`]; the tick
//! loop takes it out once per tick and parses it into a [`Command`].
//!
//! The mailbox holds a single command and is overwritten, not queued:
//! several commands arriving within one tick collapse to the last one.

use std::fmt;
use parking_lot::Mutex;

use crate::core::vec2::Vec2;

// =============================================================================
// RAW COMMAND LINE
// =============================================================================

/// One tokenized protocol line: command name and its arguments.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandLine {
    /// Command name (first token)
    pub name: String,
    /// Remaining tokens
    pub args: Vec<String>,
}

impl CommandLine {
    /// Build from a name and arguments.
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Split a line on single spaces. Returns `None` for blank lines.
    ///
    /// Runs of spaces yield empty tokens (`NAME  Bot` has two arguments);
    /// one trailing space does not add a token.
    pub fn tokenize(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return None;
        }

        let mut tokens: Vec<&str> = line.split(' ').collect();
        if tokens.len() > 1 && tokens.last() == Some(&"") {
            tokens.pop();
        }
        let mut tokens = tokens.into_iter();
        let name = tokens.next()?;

        Some(Self {
            name: name.to_string(),
            args: tokens.map(str::to_string).collect(),
        })
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

// =============================================================================
// COMMANDS
// =============================================================================

/// Movement request relative to the player's facing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Motion {
    /// No displacement; only facing is refreshed.
    Stay,
    /// Along facing.
    Forward,
    /// Against facing.
    Backward,
    /// Perpendicular to facing, negative side.
    StrafeLeft,
    /// Perpendicular to facing, positive side.
    StrafeRight,
}

/// A recognized player command.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// `NAME <name>`
    Name(String),
    /// `POINT_AT <x> <y>`
    PointAt(Vec2),
    /// `FIRE`
    Fire,
    /// `FORWARD` / `BACKWARD` / `STRAFE_LEFT` / `STRAFE_RIGHT`
    Move(Motion),
}

/// Why a command was not applied.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    /// Name outside the command vocabulary.
    #[error("unknown command '{0}'")]
    Unknown(String),

    /// Wrong number of arguments.
    #[error("{command} expects {expected} argument(s), got {got}")]
    ArgumentCount {
        /// Command name
        command: &'static str,
        /// Required count
        expected: usize,
        /// Supplied count
        got: usize,
    },

    /// Argument is not a finite number.
    #[error("{command}: '{value}' is not a number")]
    InvalidNumber {
        /// Command name
        command: &'static str,
        /// Offending token
        value: String,
    },

    /// Dead players accept no commands.
    #[error("player is dead")]
    PlayerDead,
}

impl Command {
    /// Parse a tokenized line into a command.
    pub fn parse(line: &CommandLine) -> Result<Self, CommandError> {
        let args = &line.args;
        match line.name.as_str() {
            "NAME" => {
                expect_args("NAME", args, 1)?;
                Ok(Command::Name(args[0].clone()))
            }
            "POINT_AT" => {
                expect_args("POINT_AT", args, 2)?;
                let x = parse_coordinate("POINT_AT", &args[0])?;
                let y = parse_coordinate("POINT_AT", &args[1])?;
                Ok(Command::PointAt(Vec2::new(x, y)))
            }
            "FIRE" => Ok(Command::Fire),
            "FORWARD" => Ok(Command::Move(Motion::Forward)),
            "BACKWARD" => Ok(Command::Move(Motion::Backward)),
            "STRAFE_LEFT" => Ok(Command::Move(Motion::StrafeLeft)),
            "STRAFE_RIGHT" => Ok(Command::Move(Motion::StrafeRight)),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

fn expect_args(command: &'static str, args: &[String], expected: usize) -> Result<(), CommandError> {
    if args.len() != expected {
        return Err(CommandError::ArgumentCount {
            command,
            expected,
            got: args.len(),
        });
    }
    Ok(())
}

fn parse_coordinate(command: &'static str, token: &str) -> Result<f32, CommandError> {
    token
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| CommandError::InvalidNumber {
            command,
            value: token.to_string(),
        })
}

// =============================================================================
// MAILBOX
// =============================================================================

/// Single-slot, overwrite-on-write command holder.
///
/// Shared between the connection reader (writer side) and the tick
/// loop (taker side); both go through the same lock.
#[derive(Debug, Default)]
pub struct Mailbox {
    slot: Mutex<Option<CommandLine>>,
}

impl Mailbox {
    /// Create an empty mailbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a command, replacing any unread one.
    /// Returns true if an unread command was overwritten.
    pub fn put(&self, line: CommandLine) -> bool {
        self.slot.lock().replace(line).is_some()
    }

    /// Take the pending command and leave the mailbox empty.
    pub fn take(&self) -> Option<CommandLine> {
        self.slot.lock().take()
    }

    /// Drop any pending command.
    pub fn clear(&self) {
        self.slot.lock().take();
    }

    /// True if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.slot.lock().is_none()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str) -> CommandLine {
        CommandLine::tokenize(text).unwrap()
    }

    #[test]
    fn test_tokenize() {
        let parsed = line("POINT_AT 50 60\r");
        assert_eq!(parsed.name, "POINT_AT");
        assert_eq!(parsed.args, vec!["50", "60"]);

        assert_eq!(line("FIRE").args.len(), 0);
        assert_eq!(line("FIRE ").args.len(), 0);
        assert_eq!(line("NAME  Bot").args, vec!["", "Bot"]);
        assert_eq!(line(" FIRE").name, "");
        assert!(CommandLine::tokenize("").is_none());
        assert!(CommandLine::tokenize("   \r").is_none());
    }

    #[test]
    fn test_doubled_space_counts_as_argument() {
        assert_eq!(
            Command::parse(&line("NAME  Bot")),
            Err(CommandError::ArgumentCount { command: "NAME", expected: 1, got: 2 })
        );
        assert!(matches!(
            Command::parse(&line("POINT_AT 50  50")),
            Err(CommandError::ArgumentCount { got: 3, .. })
        ));
        assert_eq!(Command::parse(&line("FIRE ")), Ok(Command::Fire));
    }

    #[test]
    fn test_parse_vocabulary() {
        assert_eq!(Command::parse(&line("NAME Bot")), Ok(Command::Name("Bot".into())));
        assert_eq!(
            Command::parse(&line("POINT_AT 50 50.5")),
            Ok(Command::PointAt(Vec2::new(50.0, 50.5)))
        );
        assert_eq!(Command::parse(&line("FIRE")), Ok(Command::Fire));
        assert_eq!(Command::parse(&line("FORWARD")), Ok(Command::Move(Motion::Forward)));
        assert_eq!(Command::parse(&line("BACKWARD")), Ok(Command::Move(Motion::Backward)));
        assert_eq!(Command::parse(&line("STRAFE_LEFT")), Ok(Command::Move(Motion::StrafeLeft)));
        assert_eq!(Command::parse(&line("STRAFE_RIGHT")), Ok(Command::Move(Motion::StrafeRight)));
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert_eq!(
            Command::parse(&line("JUMP")),
            Err(CommandError::Unknown("JUMP".into()))
        );
        // Vocabulary is case sensitive
        assert!(matches!(Command::parse(&line("fire")), Err(CommandError::Unknown(_))));
    }

    #[test]
    fn test_parse_rejects_bad_arguments() {
        assert_eq!(
            Command::parse(&line("POINT_AT 50")),
            Err(CommandError::ArgumentCount { command: "POINT_AT", expected: 2, got: 1 })
        );
        assert!(matches!(
            Command::parse(&line("POINT_AT 1 2 3")),
            Err(CommandError::ArgumentCount { got: 3, .. })
        ));
        assert!(matches!(
            Command::parse(&line("POINT_AT abc 2")),
            Err(CommandError::InvalidNumber { .. })
        ));
        assert!(matches!(
            Command::parse(&line("POINT_AT NaN 2")),
            Err(CommandError::InvalidNumber { .. })
        ));
        assert!(matches!(
            Command::parse(&line("NAME")),
            Err(CommandError::ArgumentCount { command: "NAME", .. })
        ));
        assert!(matches!(
            Command::parse(&line("NAME two words")),
            Err(CommandError::ArgumentCount { got: 2, .. })
        ));
    }

    #[test]
    fn test_mailbox_overwrites() {
        let mailbox = Mailbox::new();
        assert!(mailbox.is_empty());

        assert!(!mailbox.put(line("FORWARD")));
        assert!(mailbox.put(line("FIRE")));

        assert_eq!(mailbox.take(), Some(line("FIRE")));
        assert_eq!(mailbox.take(), None);
    }

    #[test]
    fn test_mailbox_clear() {
        let mailbox = Mailbox::new();
        mailbox.put(line("FIRE"));
        mailbox.clear();
        assert!(mailbox.is_empty());
    }

    #[test]
    fn test_display_round_trip() {
        let parsed = line("POINT_AT 1 2");
        assert_eq!(parsed.to_string(), "POINT_AT 1 2");
    }
}
