//! Transport error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while opening or using the tunnel
#[derive(Debug, Error)]
pub enum TransportError {
    /// No private key path was configured
    #[error("No private key configured (set IdentityFile or pass --identity)")]
    MissingKey,

    /// Private key file could not be read
    #[error("Cannot read private key {path}: {source}")]
    KeyUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Private key file could not be parsed
    #[error("Cannot parse private key {path}: {message}")]
    KeyInvalid { path: PathBuf, message: String },

    /// The server refused the key
    #[error("Public key authentication rejected for user '{user}'")]
    AuthRejected { user: String },

    /// Port is not a valid TCP port
    #[error("Invalid ssh port {0:?}")]
    InvalidPort(String),

    /// TCP connect or SSH handshake failed
    #[error("Failed to connect to {address}: {message}")]
    Connect { address: String, message: String },

    /// Connecting took longer than the configured timeout
    #[error("Connection to {0} timed out")]
    Timeout(String),

    /// Opening or using a channel failed
    #[error("Channel error: {0}")]
    Channel(String),
}

impl TransportError {
    /// Whether this failure is about credentials rather than reachability
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            TransportError::MissingKey
                | TransportError::KeyUnreadable { .. }
                | TransportError::KeyInvalid { .. }
                | TransportError::AuthRejected { .. }
        )
    }
}
