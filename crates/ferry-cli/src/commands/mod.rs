//! CLI command implementations

mod deploy;

pub use deploy::{deploy_command, DeployOptions};
