//! The deployment state machine

use std::future::Future;

use tokio_util::sync::CancellationToken;

use ferry_core::traits::TunnelSession;
use ferry_core::{ConfigResolver, DeploymentRequest, ImageReference};

use crate::connector::Connector;
use crate::error::DeployError;
use crate::stage::{Stage, StageEvent};
use crate::swap::ContainerSwap;
use crate::transfer::ImageTransfer;

type ProgressFn = Box<dyn Fn(&StageEvent) + Send + Sync>;

/// Outcome of a successful deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReport {
    /// Image that was shipped
    pub image: ImageReference,
    /// Tunnel address with transport defaults filled in
    pub remote_url: String,
    /// Container that held the port before, if one was stopped
    pub replaced: Option<String>,
    /// The new container
    pub container_id: String,
    /// Stages that ran, in order
    pub stages: Vec<Stage>,
}

/// Runs deployments over connections made by a [`Connector`]
pub struct Deployer<C> {
    resolver: ConfigResolver,
    connector: C,
    progress: Option<ProgressFn>,
}

impl<C: Connector> Deployer<C> {
    pub fn new(resolver: ConfigResolver, connector: C) -> Self {
        Self {
            resolver,
            connector,
            progress: None,
        }
    }

    /// Report stage transitions to `progress`
    pub fn with_progress(mut self, progress: impl Fn(&StageEvent) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    /// Deploy `request`, stopping at the first failure
    ///
    /// The tunnel is closed before this returns, on success, failure and
    /// cancellation alike. Committed remote changes are never undone: a
    /// failed start after a successful stop leaves the port unserved.
    pub async fn deploy(
        &self,
        request: &DeploymentRequest,
        cancel: &CancellationToken,
    ) -> Result<DeployReport, DeployError> {
        let mut stages = Vec::new();

        self.begin(Stage::Connect, cancel)?;
        let descriptor = self
            .resolver
            .resolve(&request.host_alias, &request.overrides)?;

        let mut tunnel = self
            .guarded(Stage::Connect, cancel, self.connector.open_tunnel(&descriptor))
            .await?;
        let remote_url = tunnel.remote_url().to_string();
        tracing::info!("Deploying {} to {}", request.image, remote_url);

        let outcome = self.run(tunnel.as_ref(), request, cancel, &mut stages).await;

        tunnel.close().await;
        tracing::debug!(closed = tunnel.is_closed(), "Released tunnel to {}", remote_url);

        let (replaced, container_id) = outcome?;
        Ok(DeployReport {
            image: request.image.clone(),
            remote_url,
            replaced,
            container_id,
            stages,
        })
    }

    /// Every stage after the tunnel is open; the caller owns its release
    async fn run(
        &self,
        tunnel: &dyn TunnelSession,
        request: &DeploymentRequest,
        cancel: &CancellationToken,
        stages: &mut Vec<Stage>,
    ) -> Result<(Option<String>, String), DeployError> {
        let engines = self
            .guarded(Stage::Connect, cancel, self.connector.open_engines(tunnel))
            .await?;
        self.complete(Stage::Connect, stages);

        self.begin(Stage::Transfer, cancel)?;
        let transfer = ImageTransfer::new(engines.local.as_ref(), engines.remote.as_ref());
        self.guarded(Stage::Transfer, cancel, transfer.transfer(&request.image))
            .await?;
        self.complete(Stage::Transfer, stages);

        self.begin(Stage::Discover, cancel)?;
        let swap = ContainerSwap::new(engines.remote.as_ref());
        let incumbent = self
            .guarded(Stage::Discover, cancel, swap.find_by_port(request.target_port))
            .await?;
        self.complete(Stage::Discover, stages);

        let replaced = match incumbent {
            Some(id) => {
                self.begin(Stage::Stop, cancel)?;
                let stopped = self.guarded(Stage::Stop, cancel, swap.stop(&id)).await;
                let replaced = match stopped {
                    Ok(()) => Some(id),
                    Err(DeployError::Stop { id, source }) if source.is_not_found() => {
                        tracing::warn!(container_id = %id, "Container vanished before it could be stopped");
                        None
                    }
                    Err(e) => return Err(e),
                };
                self.complete(Stage::Stop, stages);
                replaced
            }
            None => {
                tracing::info!(port = request.target_port, "No container on port, nothing to stop");
                self.emit(StageEvent::Skipped(Stage::Stop));
                None
            }
        };

        self.begin(Stage::Start, cancel)?;
        let container_id = self
            .guarded(
                Stage::Start,
                cancel,
                swap.start(
                    request.image.repository(),
                    &request.container_name,
                    request.container_port,
                    request.target_port,
                ),
            )
            .await?;
        self.complete(Stage::Start, stages);

        Ok((replaced, container_id))
    }

    /// Run `work` unless `cancel` fires first
    ///
    /// `work` is polled before the token, so a stage whose work is already
    /// finished reports its result rather than `Cancelled`. Cancellation
    /// only wins while the work is still pending.
    async fn guarded<T, F>(
        &self,
        stage: Stage,
        cancel: &CancellationToken,
        work: F,
    ) -> Result<T, DeployError>
    where
        F: Future<Output = Result<T, DeployError>>,
    {
        tokio::select! {
            biased;
            result = work => result,
            _ = cancel.cancelled() => {
                tracing::warn!("Cancelled during {}", stage);
                Err(DeployError::Cancelled { stage })
            }
        }
    }

    fn begin(&self, stage: Stage, cancel: &CancellationToken) -> Result<(), DeployError> {
        if cancel.is_cancelled() {
            return Err(DeployError::Cancelled { stage });
        }
        tracing::debug!("--- {} start ---", stage);
        self.emit(StageEvent::Started(stage));
        Ok(())
    }

    fn complete(&self, stage: Stage, stages: &mut Vec<Stage>) {
        tracing::debug!("--- {} end ---", stage);
        stages.push(stage);
        self.emit(StageEvent::Completed(stage));
    }

    fn emit(&self, event: StageEvent) {
        if let Some(progress) = &self.progress {
            progress(&event);
        }
    }
}
