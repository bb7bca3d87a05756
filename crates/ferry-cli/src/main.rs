//! ferry CLI
//!
//! Ships a locally built image to a remote host over SSH and replaces the
//! container that publishes the given port.

use std::path::PathBuf;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ferry_cli::commands::{deploy_command, DeployOptions};
use ferry_cli::output::{format_report, print_error, print_success};
use ferry_deploy::DeployError;

#[derive(Parser)]
#[command(name = "ferry")]
#[command(author, version, about = "Deploy a local container image to a remote host over SSH")]
struct Cli {
    /// Host alias from your ssh config
    host: String,

    /// Image to deploy (repository[:tag])
    image: String,

    /// Host port the new container takes over
    #[arg(value_parser = clap::value_parser!(u16).range(1..))]
    port: u16,

    /// SSH login user (overrides ssh config)
    #[arg(short, long)]
    user: Option<String>,

    /// SSH port (overrides ssh config)
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    ssh_port: Option<u16>,

    /// Private key file (overrides IdentityFile)
    #[arg(short, long)]
    identity: Option<PathBuf>,

    /// Port the application listens on inside the container
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    container_port: Option<u16>,

    /// Name of the new container
    #[arg(short, long)]
    name: Option<String>,

    /// Path to settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Local engine address (only unix:// is supported)
    #[arg(long, env = "DOCKER_HOST", hide_env_values = true)]
    docker_host: Option<String>,

    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

impl From<Cli> for DeployOptions {
    fn from(cli: Cli) -> Self {
        Self {
            host: cli.host,
            image: cli.image,
            port: cli.port,
            user: cli.user,
            ssh_port: cli.ssh_port,
            identity: cli.identity,
            container_port: cli.container_port,
            name: cli.name,
            config: cli.config,
            docker_host: cli.docker_host,
            quiet: cli.quiet,
        }
    }
}

/// Cancel `cancel` on Ctrl+C or SIGTERM
fn spawn_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::warn!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                tracing::info!("Received Ctrl+C, cancelling deployment...");
            }
            _ = terminate => {
                tracing::info!("Received SIGTERM, cancelling deployment...");
            }
        }

        cancel.cancel();
    });
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let quiet = cli.quiet;
    let options = DeployOptions::from(cli);

    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    match deploy_command(&options, &cancel).await {
        Ok(report) => {
            if !quiet {
                print_success(&format_report(&report));
            }
        }
        Err(e) => {
            match e.downcast_ref::<DeployError>() {
                Some(err) => print_error(&format!("Deployment failed at {}: {}", err.stage(), err)),
                None => print_error(&format!("{:#}", e)),
            }
            std::process::exit(1);
        }
    }
}
