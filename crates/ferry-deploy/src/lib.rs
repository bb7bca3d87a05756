//! ferry-deploy: Remote deployment orchestration
//!
//! Ships a locally built image to a remote engine through an SSH tunnel,
//! retires whatever container holds the target port, and starts the new
//! image in its place.
//!
//! The sequence is a linear state machine that stops at the first failure:
//!
//! ```text
//! Connect -> Transfer -> Discover -> (Stop if found) -> Start -> Done
//! ```

mod connector;
mod deployer;
mod error;
mod stage;
mod swap;
mod transfer;

pub use connector::{Connector, EnginePair, SshConnector};
pub use deployer::{DeployReport, Deployer};
pub use error::DeployError;
pub use stage::{Stage, StageEvent};
pub use swap::ContainerSwap;
pub use transfer::ImageTransfer;
