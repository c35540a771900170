//! Application error types with recoverable/fatal classification

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Transport/Backend Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Backend reported failure: {message}")]
    Backend { message: String },

    #[error("Not authorized — the session token was rejected")]
    Unauthorized,

    #[error("Process '{id}' is not running or does not exist")]
    ProcessNotFound { id: String },

    #[error("Could not determine status of process '{id}'")]
    StatusUnavailable { id: String },

    // ─────────────────────────────────────────────────────────────
    // Stream Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Stream protocol error: {message}")]
    Protocol { message: String },

    #[error("Connection retry limit exceeded after {attempts} attempts")]
    RetryExhausted { attempts: u32 },

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid backend URL: {url}")]
    InvalidUrl { url: String },

    // ─────────────────────────────────────────────────────────────
    // Channel/Communication Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Channel send error: {message}")]
    ChannelSend { message: String },

    #[error("Channel closed unexpectedly")]
    ChannelClosed,
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn channel_send(message: impl Into<String>) -> Self {
        Self::ChannelSend {
            message: message.into(),
        }
    }

    pub fn process_not_found(id: impl Into<String>) -> Self {
        Self::ProcessNotFound { id: id.into() }
    }

    pub fn status_unavailable(id: impl Into<String>) -> Self {
        Self::StatusUnavailable { id: id.into() }
    }

    /// Check if this is a recoverable error.
    ///
    /// Recoverable errors may be retried or reported inline without tearing
    /// down the session; fatal errors end the session until the user
    /// explicitly reconnects.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Transport { .. }
                | Error::Backend { .. }
                | Error::Protocol { .. }
                | Error::ChannelSend { .. }
        )
    }

    /// Check if this error is fatal for the session it occurred in
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Unauthorized
                | Error::RetryExhausted { .. }
                | Error::ProcessNotFound { .. }
                | Error::StatusUnavailable { .. }
                | Error::Config { .. }
                | Error::InvalidUrl { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = Error::transport("connection reset");
        assert_eq!(err.to_string(), "Transport error: connection reset");

        let err = Error::Unauthorized;
        assert!(err.to_string().contains("token was rejected"));

        let err = Error::RetryExhausted { attempts: 3 };
        assert!(err.to_string().contains("3 attempts"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_error_is_fatal() {
        assert!(Error::Unauthorized.is_fatal());
        assert!(Error::RetryExhausted { attempts: 3 }.is_fatal());
        assert!(Error::process_not_found("mc-server").is_fatal());
        assert!(!Error::transport("blip").is_fatal());
    }

    #[test]
    fn test_error_is_recoverable() {
        assert!(Error::transport("blip").is_recoverable());
        assert!(Error::protocol("bad payload").is_recoverable());
        assert!(Error::backend("install already running").is_recoverable());
        assert!(!Error::Unauthorized.is_recoverable());
        assert!(!Error::RetryExhausted { attempts: 3 }.is_recoverable());
    }

    #[test]
    fn test_error_constructors() {
        let _ = Error::transport("test");
        let _ = Error::backend("test");
        let _ = Error::protocol("test");
        let _ = Error::config("test");
        let _ = Error::channel_send("test");
        let _ = Error::status_unavailable("id");
    }

    #[test]
    fn test_process_not_found_names_the_process() {
        let err = Error::process_not_found("valheim");
        assert!(err.to_string().contains("valheim"));
    }
}
