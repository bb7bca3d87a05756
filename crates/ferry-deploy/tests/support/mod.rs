//! In-memory engine, tunnel and connector used by the orchestrator tests

#![allow(dead_code)]

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, StreamExt, TryStreamExt};

use ferry_core::config::SshConfig;
use ferry_core::traits::{BoxedStream, ContainerEngine, Dialer, ImageArchive, TunnelSession};
use ferry_core::{
    ConfigResolver, ConnectionDescriptor, ContainerRecord, ContainerSpec, EngineError,
    ImageSummary,
};
use ferry_deploy::{Connector, DeployError, EnginePair};
use ferry_transport::TransportError;

const ARCHIVE_PREFIX: &str = "archive:";

#[derive(Debug, Clone)]
pub struct FakeContainer {
    pub id: String,
    pub name: String,
    pub image: String,
    pub host_port: u16,
    pub container_port: u16,
    pub running: bool,
}

#[derive(Default)]
pub struct EngineState {
    pub images: Vec<ImageSummary>,
    pub containers: Vec<FakeContainer>,
    pub calls: Vec<String>,
    /// Stop times out
    pub fail_stop: bool,
    /// Start is rejected
    pub fail_start: bool,
    /// Load reports an error in its response stream
    pub reject_import: bool,
    /// Load reports success but the image never shows up
    pub drop_imports: bool,
    /// Containers disappear right before stop
    pub vanish_on_stop: bool,
    /// Container listing never completes
    pub stall_listing: bool,
    next_id: usize,
}

/// An engine that keeps images and containers in memory
#[derive(Clone)]
pub struct FakeEngine {
    label: String,
    state: Arc<Mutex<EngineState>>,
}

impl FakeEngine {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            state: Arc::new(Mutex::new(EngineState::default())),
        }
    }

    pub fn with_image(self, repo_tag: &str) -> Self {
        self.state().images.push(ImageSummary {
            id: format!("sha256:{}", repo_tag),
            repo_tags: vec![repo_tag.to_string()],
        });
        self
    }

    pub fn with_running(self, id: &str, host_port: u16) -> Self {
        self.state().containers.push(FakeContainer {
            id: id.to_string(),
            name: format!("old-{}", id),
            image: "app".to_string(),
            host_port,
            container_port: 80,
            running: true,
        });
        self
    }

    pub fn state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn called(&self, prefix: &str) -> bool {
        self.calls().iter().any(|c| c.starts_with(prefix))
    }

    pub fn container(&self, id: &str) -> Option<FakeContainer> {
        self.state().containers.iter().find(|c| c.id == id).cloned()
    }

    pub fn running_on(&self, port: u16) -> Vec<FakeContainer> {
        self.state()
            .containers
            .iter()
            .filter(|c| c.running && c.host_port == port)
            .cloned()
            .collect()
    }

    pub fn has_image(&self, repo_tag: &str) -> bool {
        self.state()
            .images
            .iter()
            .any(|i| i.repo_tags.iter().any(|t| t == repo_tag))
    }

    fn record(&self, call: String) {
        self.state().calls.push(call);
    }
}

#[async_trait]
impl ContainerEngine for FakeEngine {
    fn endpoint(&self) -> &str {
        &self.label
    }

    async fn export_image(&self, image: &str) -> Result<ImageArchive, EngineError> {
        self.record(format!("export {}", image));
        if !self.has_image(image) {
            return Err(EngineError::NotFound(format!(
                "reference does not exist: {}",
                image
            )));
        }

        let payload = format!("{}{}", ARCHIVE_PREFIX, image).into_bytes();
        let (head, tail) = payload.split_at(ARCHIVE_PREFIX.len());
        let chunks = vec![
            Ok(Bytes::copy_from_slice(head)),
            Ok(Bytes::copy_from_slice(tail)),
        ];
        Ok(stream::iter(chunks).boxed())
    }

    async fn import_image(&self, archive: ImageArchive, quiet: bool) -> Result<(), EngineError> {
        self.record(format!("import quiet={}", quiet));
        let chunks: Vec<Bytes> = archive.try_collect().await?;
        let payload = String::from_utf8_lossy(&chunks.concat()).into_owned();

        let mut state = self.state();
        if state.reject_import {
            return Err(EngineError::Load("no space left on device".to_string()));
        }
        let repo_tag = payload
            .strip_prefix(ARCHIVE_PREFIX)
            .ok_or_else(|| EngineError::Load("archive is malformed".to_string()))?;
        if !state.drop_imports {
            state.images.push(ImageSummary {
                id: format!("sha256:{}", repo_tag),
                repo_tags: vec![repo_tag.to_string()],
            });
        }
        Ok(())
    }

    async fn list_images(&self) -> Result<Vec<ImageSummary>, EngineError> {
        self.record("list_images".to_string());
        Ok(self.state().images.clone())
    }

    async fn list_containers(&self) -> Result<Vec<ContainerRecord>, EngineError> {
        self.record("list_containers".to_string());
        let stall = self.state().stall_listing;
        if stall {
            std::future::pending::<()>().await;
        }
        Ok(self
            .state()
            .containers
            .iter()
            .filter(|c| c.running)
            .map(|c| {
                let mut record = ContainerRecord::new(c.id.clone(), [c.host_port]);
                record.names = vec![format!("/{}", c.name)];
                record
            })
            .collect())
    }

    async fn stop_container(&self, id: &str) -> Result<(), EngineError> {
        self.record(format!("stop {}", id));
        let mut state = self.state();
        if state.fail_stop {
            return Err(EngineError::Timeout);
        }
        if state.vanish_on_stop {
            state.containers.retain(|c| c.id != id);
        }
        match state.containers.iter_mut().find(|c| c.id == id) {
            Some(container) => {
                container.running = false;
                Ok(())
            }
            None => Err(EngineError::NotFound(format!("No such container: {}", id))),
        }
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, EngineError> {
        self.record(format!("create {} {}", spec.name, spec.image));
        let mut state = self.state();
        if state.containers.iter().any(|c| c.name == spec.name) {
            return Err(EngineError::Conflict(format!(
                "The container name \"/{}\" is already in use",
                spec.name
            )));
        }

        let mapping = spec
            .ports
            .first()
            .ok_or_else(|| EngineError::Api {
                status: 400,
                message: "no port binding".to_string(),
            })?;
        state.next_id += 1;
        let id = format!("new{}", state.next_id);
        state.containers.push(FakeContainer {
            id: id.clone(),
            name: spec.name.clone(),
            image: spec.image.clone(),
            host_port: mapping.host_port,
            container_port: mapping.container_port,
            running: false,
        });
        Ok(id)
    }

    async fn start_container(&self, id: &str) -> Result<(), EngineError> {
        self.record(format!("start {}", id));
        let mut state = self.state();
        if state.fail_start {
            return Err(EngineError::Api {
                status: 500,
                message: "port is already allocated".to_string(),
            });
        }
        match state.containers.iter_mut().find(|c| c.id == id) {
            Some(container) => {
                container.running = true;
                Ok(())
            }
            None => Err(EngineError::NotFound(format!("No such container: {}", id))),
        }
    }
}

struct UnusedDialer;

#[async_trait]
impl Dialer for UnusedDialer {
    async fn dial(&self, address: &str) -> io::Result<BoxedStream> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("fake tunnel cannot dial {}", address),
        ))
    }
}

pub struct FakeTunnel {
    remote_url: String,
    closed: Arc<AtomicBool>,
    close_calls: Arc<AtomicUsize>,
}

#[async_trait]
impl TunnelSession for FakeTunnel {
    fn remote_url(&self) -> &str {
        &self.remote_url
    }

    fn dialer(&self) -> Arc<dyn Dialer> {
        Arc::new(UnusedDialer)
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn close(&mut self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Hands out fake tunnels and the two fake engines
#[derive(Clone)]
pub struct FakeConnector {
    pub local: FakeEngine,
    pub remote: FakeEngine,
    pub tunnels_opened: Arc<AtomicUsize>,
    pub tunnel_closed: Arc<AtomicBool>,
    pub close_calls: Arc<AtomicUsize>,
    pub descriptors: Arc<Mutex<Vec<ConnectionDescriptor>>>,
    pub reject_auth: bool,
    pub remote_unreachable: bool,
}

impl FakeConnector {
    pub fn new(local: FakeEngine, remote: FakeEngine) -> Self {
        Self {
            local,
            remote,
            tunnels_opened: Arc::new(AtomicUsize::new(0)),
            tunnel_closed: Arc::new(AtomicBool::new(false)),
            close_calls: Arc::new(AtomicUsize::new(0)),
            descriptors: Arc::new(Mutex::new(Vec::new())),
            reject_auth: false,
            remote_unreachable: false,
        }
    }

    pub fn opened(&self) -> usize {
        self.tunnels_opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> bool {
        self.tunnel_closed.load(Ordering::SeqCst)
    }

    pub fn times_closed(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn open_tunnel(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<Box<dyn TunnelSession>, DeployError> {
        self.descriptors.lock().unwrap().push(descriptor.clone());
        if self.reject_auth {
            return Err(TransportError::AuthRejected {
                user: descriptor.user.clone(),
            }
            .into());
        }

        self.tunnels_opened.fetch_add(1, Ordering::SeqCst);
        // Fill transport defaults the way the ssh session does
        let user = if descriptor.user.is_empty() { "tester" } else { &descriptor.user };
        let port = if descriptor.port.is_empty() { "22" } else { &descriptor.port };
        Ok(Box::new(FakeTunnel {
            remote_url: format!("ssh://{}@{}:{}", user, descriptor.host, port),
            closed: Arc::clone(&self.tunnel_closed),
            close_calls: Arc::clone(&self.close_calls),
        }))
    }

    async fn open_engines(&self, tunnel: &dyn TunnelSession) -> Result<EnginePair, DeployError> {
        if self.remote_unreachable {
            return Err(DeployError::EngineConnect {
                endpoint: format!("remote ({})", tunnel.remote_url()),
                source: EngineError::Connect {
                    address: "/var/run/docker.sock".to_string(),
                    message: "connection refused".to_string(),
                },
            });
        }
        Ok(EnginePair {
            local: Arc::new(self.local.clone()),
            remote: Arc::new(self.remote.clone()),
        })
    }
}

/// Resolver over a fixed ssh config with `host1` defined
pub fn resolver() -> ConfigResolver {
    let config = SshConfig::parse(
        "Host host1\n    HostName 10.0.0.5\n    User deploy\n    IdentityFile ~/.ssh/id_ed25519\n",
    );
    ConfigResolver::new(Arc::new(config), Some(PathBuf::from("/home/deploy")))
}
