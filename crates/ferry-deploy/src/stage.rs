//! Deployment stages

use std::fmt;

/// One step of a deployment run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Resolve connection parameters, open the tunnel and both engines
    Connect,
    /// Copy the image from the local engine to the remote one
    Transfer,
    /// Find the container publishing the target port
    Discover,
    /// Stop the incumbent container
    Stop,
    /// Create and start the replacement
    Start,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Connect => write!(f, "connect"),
            Stage::Transfer => write!(f, "transfer"),
            Stage::Discover => write!(f, "discover"),
            Stage::Stop => write!(f, "stop"),
            Stage::Start => write!(f, "start"),
        }
    }
}

/// Progress notification emitted while a deployment runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageEvent {
    /// A stage began
    Started(Stage),
    /// A stage finished successfully
    Completed(Stage),
    /// A stage was not needed
    Skipped(Stage),
}
