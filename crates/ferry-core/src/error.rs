//! Core error types for ferry

use std::path::PathBuf;
use thiserror::Error;

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No host alias was given
    #[error("ssh host is needed")]
    MissingHost,

    /// The invoking user's home directory could not be determined
    #[error("Cannot resolve home directory to expand {0:?}")]
    HomeDirUnavailable(String),

    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// Port value is not a valid TCP port
    #[error("Invalid port {0:?}")]
    InvalidPort(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Errors returned by a container engine endpoint
#[derive(Error, Debug)]
pub enum EngineError {
    /// The endpoint could not be reached
    #[error("Cannot connect to engine at {address}: {message}")]
    Connect {
        /// Address that was dialed
        address: String,
        /// Underlying failure
        message: String,
    },

    /// The endpoint speaks an API version we cannot use
    #[error("Unsupported engine API version {server} (minimum {minimum})")]
    UnsupportedVersion {
        /// Version reported by the server
        server: String,
        /// Oldest version this client supports
        minimum: String,
    },

    /// The requested object does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The request conflicts with existing engine state
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The engine rejected the request
    #[error("Engine returned {status}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Message reported by the engine
        message: String,
    },

    /// An image load stream reported a failure
    #[error("Image load failed: {0}")]
    Load(String),

    /// HTTP-level failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// Response body could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Request did not complete in time
    #[error("Engine request timed out")]
    Timeout,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Whether this error reports a missing object
    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        assert!(EngineError::NotFound("c123".into()).is_not_found());
        assert!(!EngineError::Timeout.is_not_found());
        assert!(!EngineError::Conflict("name in use".into()).is_not_found());
    }

    #[test]
    fn test_error_messages() {
        let err = EngineError::Api {
            status: 500,
            message: "disk full".into(),
        };
        assert_eq!(err.to_string(), "Engine returned 500: disk full");
        assert_eq!(ConfigError::MissingHost.to_string(), "ssh host is needed");
    }
}
