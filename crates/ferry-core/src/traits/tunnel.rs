//! Tunnel session traits

use async_trait::async_trait;
use std::sync::Arc;

use super::Dialer;

/// An authenticated tunnel to a remote host
#[async_trait]
pub trait TunnelSession: Send + Sync {
    /// Address of the remote end, for logging
    fn remote_url(&self) -> &str;

    /// Dialer that opens streams on the remote side of the tunnel
    fn dialer(&self) -> Arc<dyn Dialer>;

    /// Whether the session has been released
    fn is_closed(&self) -> bool;

    /// Release the session
    ///
    /// Safe to call more than once and after a partial setup.
    async fn close(&mut self);
}
