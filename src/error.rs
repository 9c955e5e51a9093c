//! Unified error handling for slirc-bot.
//!
//! Each layer owns a small `thiserror` enum. None of these ever reach the
//! sender of a chat line: dispatch-time failures are logged and swallowed,
//! registration-time failures are returned to the caller building the registry.

use thiserror::Error;

// ============================================================================
// Command Registration Errors
// ============================================================================

/// Errors reported while registering a command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("invalid argument bounds: min {min} > max {max}")]
    InvalidArity { min: usize, max: usize },

    #[error("command name is empty and no prefix function was given")]
    EmptyName,
}

// ============================================================================
// Handler Errors (command execution)
// ============================================================================

/// Errors that can occur while a command handler runs.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("send error: {0}")]
    Send(#[from] ConnectionError),

    #[error("invalid target: {0:?}")]
    InvalidTarget(String),
}

impl HandlerError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Send(_) => "send_error",
            Self::InvalidTarget(_) => "invalid_target",
        }
    }
}

/// Result type for command handlers.
pub type HandlerResult = Result<(), HandlerError>;

// ============================================================================
// Wire and Connection Errors
// ============================================================================

/// Errors produced while framing or parsing IRC lines.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("empty message")]
    EmptyMessage,

    #[error("missing command in line: {0:?}")]
    MissingCommand(String),

    #[error("illegal control character: {0:?}")]
    IllegalControlChar(char),

    #[error("invalid target: {0:?}")]
    InvalidTarget(String),
}

/// Errors on a live server connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("connection closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_error_codes_are_stable() {
        assert_eq!(HandlerError::Send(ConnectionError::Closed).error_code(), "send_error");
        assert_eq!(
            HandlerError::InvalidTarget("#a #b".into()).error_code(),
            "invalid_target"
        );
    }

    #[test]
    fn arity_error_mentions_bounds() {
        let err = CommandError::InvalidArity { min: 3, max: 1 };
        assert_eq!(err.to_string(), "invalid argument bounds: min 3 > max 1");
    }
}
