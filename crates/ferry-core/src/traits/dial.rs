//! Dialing traits

use async_trait::async_trait;
use std::io;
use std::pin::Pin;
use tokio::io::{AsyncRead, AsyncWrite};

/// A bidirectional byte stream
pub trait DuplexStream: AsyncRead + AsyncWrite + Send {}

impl<T> DuplexStream for T where T: AsyncRead + AsyncWrite + Send {}

/// Owned, type-erased duplex stream
pub type BoxedStream = Pin<Box<dyn DuplexStream>>;

/// Opens byte streams to an address
///
/// Engine clients use this in place of a direct socket connection, so the
/// same client can reach a local daemon socket or a remote one forwarded
/// through a tunnel.
#[async_trait]
pub trait Dialer: Send + Sync {
    /// Open a new stream to `address`
    async fn dial(&self, address: &str) -> io::Result<BoxedStream>;
}
