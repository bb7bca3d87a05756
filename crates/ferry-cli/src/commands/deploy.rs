//! Deploy command implementation

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use ferry_core::{
    ConfigResolver, ConnectionOverrides, DeploySettings, DeploymentRequest, ImageReference,
};
use ferry_deploy::{DeployReport, Deployer, SshConnector};
use ferry_engine::socket_from_docker_host;

use crate::output::print_stage;

/// Everything the user passed on the command line
#[derive(Debug, Clone, Default)]
pub struct DeployOptions {
    pub host: String,
    pub image: String,
    pub port: u16,
    pub user: Option<String>,
    pub ssh_port: Option<u16>,
    pub identity: Option<PathBuf>,
    pub container_port: Option<u16>,
    pub name: Option<String>,
    pub config: Option<PathBuf>,
    pub docker_host: Option<String>,
    pub quiet: bool,
}

impl DeployOptions {
    /// Build the deployment request, filling gaps from `settings`
    pub fn request(&self, settings: &DeploySettings) -> Result<DeploymentRequest> {
        let image = ImageReference::parse(&self.image)
            .with_context(|| format!("Invalid image reference {:?}", self.image))?;

        let overrides = ConnectionOverrides {
            user: self.user.clone(),
            port: self.ssh_port,
            identity_file: self.identity.clone(),
        };

        Ok(DeploymentRequest::new(self.host.clone(), image, self.port)
            .with_container_port(self.container_port.unwrap_or(settings.container_port))
            .with_container_name(
                self.name
                    .clone()
                    .unwrap_or_else(|| settings.container_name.clone()),
            )
            .with_overrides(overrides))
    }
}

/// Execute the deploy command
pub async fn deploy_command(
    options: &DeployOptions,
    cancel: &CancellationToken,
) -> Result<DeployReport> {
    let settings = DeploySettings::load(options.config.as_deref())
        .context("Failed to load settings")?;
    let request = options.request(&settings)?;

    let resolver = ConfigResolver::from_user_config(settings.ssh_config.as_deref())
        .context("Failed to read ssh config")?;

    let mut connector = SshConnector::new(&settings);
    if let Some(docker_host) = options.docker_host.as_deref() {
        match socket_from_docker_host(docker_host) {
            Some(socket) => connector = connector.with_local_socket(socket),
            None => tracing::warn!(
                "Ignoring DOCKER_HOST={}: only unix:// sockets are supported",
                docker_host
            ),
        }
    }

    let quiet = options.quiet;
    let deployer = Deployer::new(resolver, connector).with_progress(move |event| {
        if !quiet {
            print_stage(event);
        }
    });

    let report = deployer.deploy(&request, cancel).await?;
    Ok(report)
}
