//! ferry-core: Core abstractions and configuration for ferry
//!
//! This crate provides the domain types, connection configuration and the
//! capability traits (dialing, container engine, tunnel session) shared by
//! the transport, engine, deploy and CLI crates.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::{ConfigResolver, ConnectionDescriptor, DeploySettings, HostLookup};
pub use error::{ConfigError, EngineError};
pub use types::{
    ConnectionOverrides, ContainerRecord, ContainerSpec, DeploymentRequest, ImageReference,
    ImageSummary, PortMapping,
};
