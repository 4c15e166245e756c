//! Command graph error model.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across the command graph layers.
pub type CommandResult<T> = Result<T, CommandGraphError>;

/// Discriminant of a [`CommandGraphError`].
///
/// This is what crosses a process boundary; the receiving side rebuilds the
/// matching local error from `(kind, message, origin)` instead of trying to
/// reconstruct the remote error type.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidPath,
    ObjectResolution,
    Command,
    Execution,
    Transport,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidPath => "invalid_path",
            ErrorKind::ObjectResolution => "object_resolution",
            ErrorKind::Command => "command",
            ErrorKind::Execution => "execution",
            ErrorKind::Transport => "transport",
        }
    }
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure taxonomy shared by every command interface.
///
/// - `InvalidPath`: navigation to a category that is not a valid child of the
///   current node type (structural, never depends on live state).
/// - `ObjectResolution`: the path is well formed but the addressed instance does
///   not exist right now.
/// - `Command`: the object resolved but does not offer the named command.
/// - `Execution`: the command ran and its body failed.
/// - `Transport`: the channel to a remote process failed. Never produced by
///   in-process strategies.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandGraphError {
    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("object not found: {0}")]
    ObjectResolution(String),

    #[error("no such command: {0}")]
    Command(String),

    #[error("command failed: {message}")]
    Execution {
        message: String,
        /// Classification of the original failure, when the target supplied one.
        origin: Option<String>,
    },

    #[error("transport failure: {0}")]
    Transport(String),
}

impl CommandGraphError {
    pub fn invalid_path(msg: impl Into<String>) -> Self {
        Self::InvalidPath(msg.into())
    }

    pub fn object_resolution(msg: impl Into<String>) -> Self {
        Self::ObjectResolution(msg.into())
    }

    pub fn command(msg: impl Into<String>) -> Self {
        Self::Command(msg.into())
    }

    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution {
            message: msg.into(),
            origin: None,
        }
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Rebuild an error from its transported parts.
    pub fn from_parts(kind: ErrorKind, message: impl Into<String>, origin: Option<String>) -> Self {
        let message = message.into();
        match kind {
            ErrorKind::InvalidPath => Self::InvalidPath(message),
            ErrorKind::ObjectResolution => Self::ObjectResolution(message),
            ErrorKind::Command => Self::Command(message),
            ErrorKind::Execution => Self::Execution { message, origin },
            ErrorKind::Transport => Self::Transport(message),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidPath(_) => ErrorKind::InvalidPath,
            Self::ObjectResolution(_) => ErrorKind::ObjectResolution,
            Self::Command(_) => ErrorKind::Command,
            Self::Execution { .. } => ErrorKind::Execution,
            Self::Transport(_) => ErrorKind::Transport,
        }
    }

    /// The message without the kind prefix added by `Display`.
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidPath(m)
            | Self::ObjectResolution(m)
            | Self::Command(m)
            | Self::Transport(m) => m,
            Self::Execution { message, .. } => message,
        }
    }

    pub fn origin(&self) -> Option<&str> {
        match self {
            Self::Execution { origin, .. } => origin.as_deref(),
            _ => None,
        }
    }

    /// The addressed target or action does not exist (any more).
    pub fn is_gone(&self) -> bool {
        matches!(self, Self::ObjectResolution(_) | Self::Command(_))
    }

    /// The controlled process could not be reached.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Short message for human-facing tooling.
    ///
    /// "Gone" and "unreachable" failures render differently so a user can tell
    /// a stale target apart from a dead connection.
    pub fn user_message(&self) -> String {
        if self.is_gone() {
            format!("that target or action no longer exists ({})", self.message())
        } else if self.is_unreachable() {
            format!("could not reach the controlled process ({})", self.message())
        } else {
            self.to_string()
        }
    }
}

/// Failure raised by a command body.
///
/// Command implementations return this; every strategy surfaces it to callers
/// as [`CommandGraphError::Execution`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct CommandFailure {
    pub message: String,
    pub origin: Option<String>,
}

impl CommandFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            origin: None,
        }
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }
}

impl From<CommandFailure> for CommandGraphError {
    fn from(value: CommandFailure) -> Self {
        Self::Execution {
            message: value.message,
            origin: value.origin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_parts_rebuilds_every_kind() {
        for kind in [
            ErrorKind::InvalidPath,
            ErrorKind::ObjectResolution,
            ErrorKind::Command,
            ErrorKind::Execution,
            ErrorKind::Transport,
        ] {
            let err = CommandGraphError::from_parts(kind, "boom", None);
            assert_eq!(err.kind(), kind);
            assert_eq!(err.message(), "boom");
        }
    }

    #[test]
    fn execution_keeps_origin() {
        let err: CommandGraphError = CommandFailure::new("bad index").with_origin("IndexError").into();
        assert_eq!(err.kind(), ErrorKind::Execution);
        assert_eq!(err.origin(), Some("IndexError"));
        assert_eq!(err.to_string(), "command failed: bad index");
    }

    #[test]
    fn gone_and_unreachable_render_differently() {
        let gone = CommandGraphError::object_resolution("window[7]");
        let down = CommandGraphError::transport("connection refused");

        assert!(gone.is_gone());
        assert!(!gone.is_unreachable());
        assert!(down.is_unreachable());
        assert!(!down.is_gone());
        assert_ne!(
            gone.user_message().split(" (").next(),
            down.user_message().split(" (").next()
        );
    }
}
