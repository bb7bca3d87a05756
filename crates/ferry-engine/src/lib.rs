//! ferry-engine: Docker Engine API client
//!
//! [`DockerEngine`] speaks HTTP/1.1 to the engine over streams opened by a
//! [`Dialer`](ferry_core::traits::Dialer): a unix socket for the local
//! daemon, or a tunnel channel for the remote one.

mod api;
mod client;
mod local;
mod version;

pub use client::DockerEngine;
pub use local::{socket_from_docker_host, UnixDialer};
pub use version::ApiVersion;
