//! Container engine traits

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use crate::error::EngineError;
use crate::types::{ContainerRecord, ContainerSpec, ImageSummary};

/// Streamed image archive, as produced by an export
pub type ImageArchive = BoxStream<'static, Result<Bytes, EngineError>>;

/// Capabilities of a container engine endpoint
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Human-readable endpoint label used in logs
    fn endpoint(&self) -> &str;

    /// Export an image as a streamed archive
    async fn export_image(&self, image: &str) -> Result<ImageArchive, EngineError>;

    /// Import a streamed archive
    ///
    /// The archive is consumed whether or not the import succeeds.
    async fn import_image(&self, archive: ImageArchive, quiet: bool) -> Result<(), EngineError>;

    /// List images
    async fn list_images(&self) -> Result<Vec<ImageSummary>, EngineError>;

    /// List running containers in engine order
    async fn list_containers(&self) -> Result<Vec<ContainerRecord>, EngineError>;

    /// Gracefully stop a container with the engine-default timeout
    async fn stop_container(&self, id: &str) -> Result<(), EngineError>;

    /// Create a container and return its id
    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, EngineError>;

    /// Start a created container
    async fn start_container(&self, id: &str) -> Result<(), EngineError>;
}
