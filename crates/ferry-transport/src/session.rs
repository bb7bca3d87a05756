//! Authenticated SSH session
//!
//! Establishes the connection used for one deployment: public-key auth,
//! accept-any host key policy, a file-transfer channel, and a dialer for
//! the remote engine socket.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::client::{self, Config, Handle, Msg};
use russh::{Channel, Disconnect};
use russh_keys::key::{KeyPair, PublicKey};

use ferry_core::traits::{Dialer, TunnelSession};
use ferry_core::ConnectionDescriptor;

use crate::dialer::SshDialer;
use crate::error::TransportError;

/// Port used when the descriptor leaves it empty
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Subsystem requested on the file-transfer channel
const FILE_TRANSFER_SUBSYSTEM: &str = "sftp";

/// Read and parse an unencrypted private key
pub fn load_private_key(path: &Path) -> Result<KeyPair, TransportError> {
    if path.as_os_str().is_empty() {
        return Err(TransportError::MissingKey);
    }

    let pem = std::fs::read_to_string(path).map_err(|source| TransportError::KeyUnreadable {
        path: path.to_path_buf(),
        source,
    })?;

    russh_keys::decode_secret_key(&pem, None).map_err(|e| TransportError::KeyInvalid {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn parse_port(port: &str) -> Result<u16, TransportError> {
    if port.is_empty() {
        return Ok(DEFAULT_SSH_PORT);
    }
    port.parse::<u16>()
        .ok()
        .filter(|p| *p != 0)
        .ok_or_else(|| TransportError::InvalidPort(port.to_string()))
}

/// An open tunnel to the deployment target
///
/// Owns the SSH connection and a file-transfer channel derived from it.
/// [`SshSession::close`] releases the channel, then the connection.
pub struct SshSession {
    remote_url: String,
    handle: Option<Arc<Handle<TunnelHandler>>>,
    file_transfer: Option<Channel<Msg>>,
}

impl SshSession {
    /// Connect and authenticate to the host described by `descriptor`
    pub async fn connect(
        descriptor: &ConnectionDescriptor,
        connect_timeout: Duration,
    ) -> Result<Self, TransportError> {
        // Key problems are reported before touching the network
        let key = load_private_key(&descriptor.private_key_path)?;
        let port = parse_port(&descriptor.port)?;
        let user = if descriptor.user.is_empty() {
            whoami::username()
        } else {
            descriptor.user.clone()
        };

        let host = descriptor.dial_host().to_string();
        let address = format!("{}:{}", host, port);
        let remote_url = format!("ssh://{}@{}:{}", user, descriptor.host, port);

        tracing::debug!("Connecting to {}", address);
        let ssh_config = Arc::new(Config::default());
        let mut handle = tokio::time::timeout(
            connect_timeout,
            client::connect(ssh_config, (host.as_str(), port), TunnelHandler),
        )
        .await
        .map_err(|_| TransportError::Timeout(address.clone()))?
        .map_err(|e| TransportError::Connect {
            address: address.clone(),
            message: e.to_string(),
        })?;

        tracing::debug!("Authenticating as user '{}'", user);
        let authenticated = handle
            .authenticate_publickey(&user, Arc::new(key))
            .await
            .map_err(|e| TransportError::Connect {
                address: address.clone(),
                message: format!("Authentication error: {}", e),
            })?;

        let mut session = Self {
            remote_url,
            handle: Some(Arc::new(handle)),
            file_transfer: None,
        };

        if !authenticated {
            session.close().await;
            return Err(TransportError::AuthRejected { user });
        }

        match session.open_file_transfer().await {
            Ok(channel) => session.file_transfer = Some(channel),
            Err(e) => {
                session.close().await;
                return Err(e);
            }
        }

        tracing::info!("Connected to {}", session.remote_url);
        Ok(session)
    }

    async fn open_file_transfer(&self) -> Result<Channel<Msg>, TransportError> {
        let handle = self
            .handle
            .as_ref()
            .ok_or_else(|| TransportError::Channel("session is closed".to_string()))?;

        let mut channel = handle
            .channel_open_session()
            .await
            .map_err(|e| TransportError::Channel(format!("Failed to open session channel: {}", e)))?;
        channel
            .request_subsystem(true, FILE_TRANSFER_SUBSYSTEM)
            .await
            .map_err(|e| {
                TransportError::Channel(format!("Failed to start file transfer subsystem: {}", e))
            })?;

        Ok(channel)
    }

    /// Dialer reaching unix sockets on the remote host
    pub fn ssh_dialer(&self) -> SshDialer {
        SshDialer::new(self.handle.clone())
    }

    async fn release(&mut self) {
        if let Some(channel) = self.file_transfer.take() {
            tracing::debug!("Closing file transfer channel");
            if let Err(e) = channel.close().await {
                tracing::warn!("Failed to close file transfer channel: {}", e);
            }
        }

        if let Some(handle) = self.handle.take() {
            tracing::debug!("Disconnecting from {}", self.remote_url);
            if let Err(e) = handle
                .disconnect(Disconnect::ByApplication, "deployment finished", "en")
                .await
            {
                tracing::warn!("Failed to disconnect cleanly: {}", e);
            }
        }
    }
}

#[async_trait]
impl TunnelSession for SshSession {
    fn remote_url(&self) -> &str {
        &self.remote_url
    }

    fn dialer(&self) -> Arc<dyn Dialer> {
        Arc::new(self.ssh_dialer())
    }

    fn is_closed(&self) -> bool {
        self.handle.is_none() && self.file_transfer.is_none()
    }

    async fn close(&mut self) {
        self.release().await;
    }
}

/// SSH client handler for the tunnel
pub struct TunnelHandler;

#[async_trait]
impl client::Handler for TunnelHandler {
    type Error = anyhow::Error;

    /// Accept any host key
    ///
    /// Deployments must work without known_hosts setup, so the key is only
    /// logged. This does not protect against a man-in-the-middle.
    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        tracing::debug!("Server host key: {}", server_public_key.fingerprint());
        Ok(true)
    }
}
