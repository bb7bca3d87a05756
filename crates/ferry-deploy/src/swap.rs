//! Replacing the container that holds a published port

use ferry_core::traits::ContainerEngine;
use ferry_core::{ContainerSpec, PortMapping};

use crate::error::DeployError;

/// Port-based discovery and replacement of containers on one engine
pub struct ContainerSwap<'a> {
    engine: &'a dyn ContainerEngine,
}

impl<'a> ContainerSwap<'a> {
    pub fn new(engine: &'a dyn ContainerEngine) -> Self {
        Self { engine }
    }

    /// Find a running container publishing `port` on the host
    ///
    /// Read-only. When several containers publish the port, the first one
    /// in engine order is returned and the others are left alone.
    pub async fn find_by_port(&self, port: u16) -> Result<Option<String>, DeployError> {
        let containers = self
            .engine
            .list_containers()
            .await
            .map_err(DeployError::Discover)?;

        let mut matching = containers.into_iter().filter(|c| c.publishes(port));
        let first = matching.next();
        let others: Vec<String> = matching.map(|c| c.id).collect();
        if !others.is_empty() {
            tracing::warn!(
                port,
                "Several containers publish port {}; leaving {:?} running",
                port,
                others
            );
        }

        if let Some(container) = &first {
            tracing::debug!(port, container_id = %container.id, "Found container on port");
        }
        Ok(first.map(|c| c.id))
    }

    /// Stop the container `id` with the engine's default grace period
    pub async fn stop(&self, id: &str) -> Result<(), DeployError> {
        tracing::info!(container_id = %id, "Stopping container");
        self.engine
            .stop_container(id)
            .await
            .map_err(|source| DeployError::Stop {
                id: id.to_string(),
                source,
            })
    }

    /// Create and start a container from `image`
    ///
    /// `container_port` inside the container is bound to `publish_port` on
    /// all host interfaces. Returns the new container id.
    pub async fn start(
        &self,
        image: &str,
        name: &str,
        container_port: u16,
        publish_port: u16,
    ) -> Result<String, DeployError> {
        let failed = |source| DeployError::Start {
            name: name.to_string(),
            source,
        };

        let spec = ContainerSpec {
            image: image.to_string(),
            name: name.to_string(),
            ports: vec![PortMapping::all_interfaces(publish_port, container_port)],
        };

        let id = self.engine.create_container(&spec).await.map_err(failed)?;
        tracing::debug!(container_id = %id, "Created container {}", name);
        self.engine.start_container(&id).await.map_err(failed)?;
        tracing::info!(
            container_id = %id,
            "Started {} from {} on port {} -> {}",
            name,
            image,
            publish_port,
            container_port
        );
        Ok(id)
    }
}
