// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # hybridadm
//!
//! Joins a machine outside of EC2 to an EKS cluster as a hybrid node.
//!
//! ## Commands
//!
//! - `hybridadm init` - provision credentials, start containerd and kubelet
//! - `hybridadm upgrade <version>` - replace the Kubernetes binaries
//! - `hybridadm uninstall` - stop and remove everything `init` installed
//! - `hybridadm debug` - run every node validation, change nothing
//! - `hybridadm config show|validate` - configuration management
//!
//! Node commands must run as root against the real host unless
//! `--install-root` points them at a scratch directory.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use hybridadm_cli::commands::{self, ConfigCommand, Invocation, UpgradeCommand};
use hybridadm_cli::console::failure_remediation;

/// hybridadm - EKS hybrid node bootstrap agent
#[derive(Parser, Debug)]
#[command(name = "hybridadm")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the node configuration (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "HYBRIDADM_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Validations to skip, comma separated
    #[arg(long, global = true, value_delimiter = ',', value_name = "NAME")]
    skip: Vec<String>,

    /// Root every host path under this directory
    #[arg(
        long,
        global = true,
        env = "HYBRIDADM_INSTALL_ROOT",
        default_value = "/",
        value_name = "DIR"
    )]
    install_root: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "HYBRIDADM_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Bootstrap this machine and join it to the cluster
    #[command(name = "init")]
    Init,

    /// Upgrade the node's Kubernetes components
    #[command(name = "upgrade")]
    Upgrade {
        #[command(flatten)]
        command: UpgradeCommand,
    },

    /// Remove the node from the cluster and clean up the host
    #[command(name = "uninstall")]
    Uninstall,

    /// Run all node validations without changing anything
    #[command(name = "debug")]
    Debug,

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let invocation = Invocation {
        config: cli.config.clone(),
        skip: cli.skip.clone(),
        install_root: cli.install_root.clone(),
        cancel,
    };

    let result = match cli.command {
        Some(Commands::Init) => commands::init::execute(&invocation).await,
        Some(Commands::Upgrade { command }) => commands::upgrade::execute(command, &invocation).await,
        Some(Commands::Uninstall) => commands::uninstall::execute(&invocation).await,
        Some(Commands::Debug) => commands::debug::execute(&invocation).await,
        Some(Commands::Config { command }) => commands::config::handle_command(command, cli.config).await,
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    };

    if let Err(e) = &result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        if let Some(remediation) = failure_remediation(e) {
            eprintln!("{}", remediation);
        }
        std::process::exit(1);
    }
    Ok(())
}

/// Cancel in-flight waits on Ctrl+C or SIGTERM.
async fn cancel_on_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
    cancel.cancel();
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    Ok(())
}
