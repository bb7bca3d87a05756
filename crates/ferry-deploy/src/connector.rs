//! Opening the tunnel and the engine client pair

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use ferry_core::traits::{ContainerEngine, TunnelSession};
use ferry_core::{ConnectionDescriptor, DeploySettings};
use ferry_engine::{DockerEngine, UnixDialer};
use ferry_transport::SshSession;

use crate::error::DeployError;

/// The local and remote engines used by one deployment
#[derive(Clone)]
pub struct EnginePair {
    pub local: Arc<dyn ContainerEngine>,
    pub remote: Arc<dyn ContainerEngine>,
}

/// Establishes the connections a deployment runs over
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open an authenticated tunnel to the target host
    ///
    /// Implementations release any partial state before returning an error.
    async fn open_tunnel(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<Box<dyn TunnelSession>, DeployError>;

    /// Connect to the local engine and to the remote engine through `tunnel`
    async fn open_engines(&self, tunnel: &dyn TunnelSession) -> Result<EnginePair, DeployError>;
}

/// Connector for real hosts: russh tunnel plus Docker engine clients
#[derive(Debug, Clone)]
pub struct SshConnector {
    local_socket: String,
    remote_socket: String,
    connect_timeout: Duration,
    request_timeout: Duration,
}

impl SshConnector {
    pub fn new(settings: &DeploySettings) -> Self {
        Self {
            local_socket: settings.local_socket.clone(),
            remote_socket: settings.remote_socket.clone(),
            connect_timeout: settings.connect_timeout,
            request_timeout: settings.request_timeout,
        }
    }

    /// Use a different local engine socket
    pub fn with_local_socket(mut self, socket: impl Into<String>) -> Self {
        self.local_socket = socket.into();
        self
    }
}

#[async_trait]
impl Connector for SshConnector {
    async fn open_tunnel(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<Box<dyn TunnelSession>, DeployError> {
        let session = SshSession::connect(descriptor, self.connect_timeout).await?;
        Ok(Box::new(session))
    }

    async fn open_engines(&self, tunnel: &dyn TunnelSession) -> Result<EnginePair, DeployError> {
        let local = DockerEngine::connect(
            "local",
            Arc::new(UnixDialer),
            self.local_socket.clone(),
            self.request_timeout,
        )
        .await
        .map_err(|source| DeployError::EngineConnect {
            endpoint: format!("local ({})", self.local_socket),
            source,
        })?;

        let remote = DockerEngine::connect(
            tunnel.remote_url(),
            tunnel.dialer(),
            self.remote_socket.clone(),
            self.request_timeout,
        )
        .await
        .map_err(|source| DeployError::EngineConnect {
            endpoint: format!("remote ({})", tunnel.remote_url()),
            source,
        })?;

        Ok(EnginePair {
            local: Arc::new(local),
            remote: Arc::new(remote),
        })
    }
}
