//! Core domain types

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;

/// Container name used when the caller does not pick one
pub const DEFAULT_CONTAINER_NAME: &str = "NewContainer";

/// Container-side port used when the caller does not pick one
pub const DEFAULT_CONTAINER_PORT: u16 = 80;

/// A container image named as `repository[:tag]`
///
/// The repository is everything before the first `:`. The original string
/// is kept so the image can be exported under exactly the name it was
/// built with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageReference {
    raw: String,
    repository: String,
    tag: Option<String>,
}

impl ImageReference {
    /// Parse a `repository[:tag]` string
    pub fn parse(reference: &str) -> Result<Self, ConfigError> {
        let raw = reference.trim();
        if raw.is_empty() {
            return Err(ConfigError::Invalid("image reference is empty".to_string()));
        }

        let (repository, tag) = match raw.split_once(':') {
            Some((repo, tag)) => (repo, Some(tag)),
            None => (raw, None),
        };

        if repository.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "image reference {:?} has no repository",
                raw
            )));
        }
        if tag == Some("") {
            return Err(ConfigError::Invalid(format!(
                "image reference {:?} has an empty tag",
                raw
            )));
        }

        Ok(Self {
            raw: raw.to_string(),
            repository: repository.to_string(),
            tag: tag.map(str::to_string),
        })
    }

    /// The reference exactly as given
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Repository part (before the first `:`)
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Tag part, if one was given
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// The `repository:tag` the engine lists for this image
    pub fn repo_tag(&self) -> String {
        format!("{}:{}", self.repository, self.tag().unwrap_or("latest"))
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl FromStr for ImageReference {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Remote-observed container state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerRecord {
    /// Engine container id
    pub id: String,
    /// Container names as reported by the engine
    pub names: Vec<String>,
    /// Host-side ports published by this container
    pub published_ports: BTreeSet<u16>,
}

impl ContainerRecord {
    /// Create a record with the given published ports
    pub fn new(id: impl Into<String>, ports: impl IntoIterator<Item = u16>) -> Self {
        Self {
            id: id.into(),
            names: vec![],
            published_ports: ports.into_iter().collect(),
        }
    }

    /// Whether this container publishes the given host port
    pub fn publishes(&self, port: u16) -> bool {
        self.published_ports.contains(&port)
    }
}

/// An image as listed by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSummary {
    /// Engine image id
    pub id: String,
    /// `repository:tag` names pointing at this image
    pub repo_tags: Vec<String>,
}

/// Host port to container port mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMapping {
    /// Host interface to bind
    pub host_ip: String,
    /// Host-side (published) port
    pub host_port: u16,
    /// Container-side port
    pub container_port: u16,
}

impl PortMapping {
    /// Publish `container_port` as `host_port` on every host interface
    pub fn all_interfaces(host_port: u16, container_port: u16) -> Self {
        Self {
            host_ip: "0.0.0.0".to_string(),
            host_port,
            container_port,
        }
    }
}

/// Everything needed to create a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    /// Image to run
    pub image: String,
    /// Container name
    pub name: String,
    /// Published ports
    pub ports: Vec<PortMapping>,
}

/// Explicit connection parameters that take precedence over ssh config
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionOverrides {
    /// Login user
    pub user: Option<String>,
    /// SSH port
    pub port: Option<u16>,
    /// Private key path
    pub identity_file: Option<PathBuf>,
}

/// A single deployment run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentRequest {
    /// Host alias to deploy to
    pub host_alias: String,
    /// Image to ship and run
    pub image: ImageReference,
    /// Host port the new container takes over
    pub target_port: u16,
    /// Port the application listens on inside the container
    pub container_port: u16,
    /// Name given to the new container
    pub container_name: String,
    /// Connection parameter overrides
    pub overrides: ConnectionOverrides,
}

impl DeploymentRequest {
    /// Create a request with the default container name and port
    pub fn new(host_alias: impl Into<String>, image: ImageReference, target_port: u16) -> Self {
        Self {
            host_alias: host_alias.into(),
            image,
            target_port,
            container_port: DEFAULT_CONTAINER_PORT,
            container_name: DEFAULT_CONTAINER_NAME.to_string(),
            overrides: ConnectionOverrides::default(),
        }
    }

    /// Set the container-side port
    pub fn with_container_port(mut self, port: u16) -> Self {
        self.container_port = port;
        self
    }

    /// Set the container name
    pub fn with_container_name(mut self, name: impl Into<String>) -> Self {
        self.container_name = name.into();
        self
    }

    /// Set connection overrides
    pub fn with_overrides(mut self, overrides: ConnectionOverrides) -> Self {
        self.overrides = overrides;
        self
    }
}
