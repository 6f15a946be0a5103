// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use hybridadm_core::domain::node_config::NodeConfig;

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the effective node configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate a node configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },
}

pub async fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. HYBRIDADM_CONFIG_PATH: {}",
            std::env::var("HYBRIDADM_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./nodeConfig.yaml");
        println!("  4. /etc/hybridadm/nodeConfig.yaml");
        println!();
    }

    let config = NodeConfig::load(config_override).context("Failed to load configuration")?;

    println!("{}", "Current configuration:".bold());
    println!();
    println!("{}", "Cluster:".bold());
    println!("  Name: {}", config.spec.cluster.name);
    println!("  Region: {}", config.spec.cluster.region);
    if let Some(endpoint) = &config.spec.cluster.api_server_endpoint {
        println!("  Endpoint: {}", endpoint);
    }
    println!();

    println!("{}", "Credentials:".bold());
    match config.strategy_params() {
        Ok(params) => println!("  Strategy: {}", params.strategy()),
        Err(e) => println!("  Strategy: {}", e.to_string().red()),
    }
    println!();

    println!("{}", "Kubelet:".bold());
    match config.spec.kubelet.node_ip_flag() {
        Some(ip) => println!("  Node IP: {}", ip),
        None => println!("  Node IP: {}", "(discovered)".dimmed()),
    }
    println!("  Extra flags: {}", config.spec.kubelet.flags.len());
    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = NodeConfig::load(config_path).context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}
