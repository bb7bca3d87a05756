//! Local engine socket

use async_trait::async_trait;
use std::io;

use ferry_core::traits::{BoxedStream, Dialer};

/// Dials unix sockets on this machine
#[derive(Debug, Clone, Copy, Default)]
pub struct UnixDialer;

#[async_trait]
impl Dialer for UnixDialer {
    #[cfg(unix)]
    async fn dial(&self, address: &str) -> io::Result<BoxedStream> {
        let stream = tokio::net::UnixStream::connect(address).await?;
        Ok(Box::pin(stream))
    }

    #[cfg(not(unix))]
    async fn dial(&self, address: &str) -> io::Result<BoxedStream> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("unix sockets are not available on this platform ({})", address),
        ))
    }
}

/// Socket path from a `DOCKER_HOST` value, if it names a unix socket
pub fn socket_from_docker_host(docker_host: &str) -> Option<String> {
    docker_host
        .strip_prefix("unix://")
        .filter(|path| !path.is_empty())
        .map(str::to_string)
}
