//! Deployment error types

use thiserror::Error;

use ferry_core::{ConfigError, EngineError};
use ferry_transport::TransportError;

use crate::stage::Stage;

/// Failure of a deployment run, tagged by the stage that failed
#[derive(Debug, Error)]
pub enum DeployError {
    /// Bad or incomplete connection parameters
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Private key unusable or rejected
    #[error("Authentication failed: {0}")]
    Auth(#[source] TransportError),

    /// Tunnel could not be established
    #[error("Tunnel error: {0}")]
    Tunnel(#[source] TransportError),

    /// An engine endpoint is unreachable or incompatible
    #[error("Cannot reach {endpoint} engine: {source}")]
    EngineConnect {
        endpoint: String,
        #[source]
        source: EngineError,
    },

    /// Export or import failed
    #[error("Failed to transfer image {image}: {source}")]
    Transfer {
        image: String,
        #[source]
        source: EngineError,
    },

    /// Listing remote containers failed
    #[error("Failed to list remote containers: {0}")]
    Discover(#[source] EngineError),

    /// Stopping the incumbent container failed
    #[error("Failed to stop container {id}: {source}")]
    Stop {
        id: String,
        #[source]
        source: EngineError,
    },

    /// Creating or starting the new container failed
    #[error("Failed to start container {name}: {source}")]
    Start {
        name: String,
        #[source]
        source: EngineError,
    },

    /// The run was cancelled before this stage finished
    #[error("Deployment cancelled during {stage}")]
    Cancelled { stage: Stage },
}

impl DeployError {
    /// Stage that produced this error
    pub fn stage(&self) -> Stage {
        match self {
            DeployError::Config(_)
            | DeployError::Auth(_)
            | DeployError::Tunnel(_)
            | DeployError::EngineConnect { .. } => Stage::Connect,
            DeployError::Transfer { .. } => Stage::Transfer,
            DeployError::Discover(_) => Stage::Discover,
            DeployError::Stop { .. } => Stage::Stop,
            DeployError::Start { .. } => Stage::Start,
            DeployError::Cancelled { stage } => *stage,
        }
    }
}

impl From<TransportError> for DeployError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::InvalidPort(port) => {
                DeployError::Config(ConfigError::InvalidPort(port))
            }
            err if err.is_auth() => DeployError::Auth(err),
            err => DeployError::Tunnel(err),
        }
    }
}
