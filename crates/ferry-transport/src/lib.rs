//! ferry-transport: SSH tunnel to a remote container engine
//!
//! Opens an authenticated russh client session, keeps a file-transfer
//! channel alongside it, and hands out a [`Dialer`](ferry_core::traits::Dialer)
//! that reaches unix sockets on the remote host through the tunnel.

mod dialer;
mod error;
mod session;

pub use dialer::SshDialer;
pub use error::TransportError;
pub use session::{load_private_key, SshSession, DEFAULT_SSH_PORT};
