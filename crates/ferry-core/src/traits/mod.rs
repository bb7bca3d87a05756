//! Core trait definitions

mod dial;
mod engine;
mod tunnel;

pub use dial::{BoxedStream, Dialer, DuplexStream};
pub use engine::{ContainerEngine, ImageArchive};
pub use tunnel::TunnelSession;
