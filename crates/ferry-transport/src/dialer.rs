//! Stream dialer over the tunnel

use async_trait::async_trait;
use russh::client::Handle;
use std::io;
use std::sync::Arc;

use ferry_core::traits::{BoxedStream, Dialer};

use crate::session::TunnelHandler;

/// Opens `direct-streamlocal` channels to unix sockets on the remote host
///
/// Each dial is a fresh channel on the shared session, so the remote engine
/// socket is reachable without being exposed on the network.
#[derive(Clone)]
pub struct SshDialer {
    handle: Option<Arc<Handle<TunnelHandler>>>,
}

impl SshDialer {
    pub(crate) fn new(handle: Option<Arc<Handle<TunnelHandler>>>) -> Self {
        Self { handle }
    }
}

#[async_trait]
impl Dialer for SshDialer {
    async fn dial(&self, address: &str) -> io::Result<BoxedStream> {
        let handle = self.handle.as_ref().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, "ssh tunnel is closed")
        })?;

        tracing::debug!("Opening streamlocal channel to {}", address);
        let channel = handle
            .channel_open_direct_streamlocal(address)
            .await
            .map_err(|e| {
                io::Error::new(
                    io::ErrorKind::ConnectionRefused,
                    format!("Failed to open channel to {}: {}", address, e),
                )
            })?;

        Ok(Box::pin(channel.into_stream()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_closed_dialer_refuses() {
        let dialer = SshDialer::new(None);
        let err = dialer.dial("/var/run/docker.sock").await.err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
    }
}
