//! Error types for the client and responder.

use thiserror::Error;

/// Result type for fallible crate operations.
pub type Result<T> = std::result::Result<T, RudpError>;

/// Errors surfaced to callers.
///
/// Timeouts, mismatched acks and short datagrams are part of normal operation
/// and never show up here; only setup problems do.
#[derive(Error, Debug)]
pub enum RudpError {
    /// Socket creation, bind, or other OS-level failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl RudpError {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        RudpError::Config {
            message: message.into(),
        }
    }
}

/// `true` when a receive error only means "nothing arrived in time".
pub fn is_timeout(e: &std::io::Error) -> bool {
    use std::io::ErrorKind;
    matches!(
        e.kind(),
        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn timeout_kinds_are_recognised() {
        assert!(is_timeout(&io::Error::from(io::ErrorKind::WouldBlock)));
        assert!(is_timeout(&io::Error::from(io::ErrorKind::TimedOut)));
        assert!(!is_timeout(&io::Error::from(io::ErrorKind::ConnectionRefused)));
    }

    #[test]
    fn config_error_displays_message() {
        let e = RudpError::config("payload_len must be in 1..=60000");
        assert_eq!(
            e.to_string(),
            "configuration error: payload_len must be in 1..=60000"
        );
    }
}
