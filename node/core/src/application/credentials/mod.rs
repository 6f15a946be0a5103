// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Credential Provisioning
//!
//! Gives the node an AWS identity through exactly one strategy and returns an
//! SDK config bound to it.
//!
//! # Architecture
//!
//! - **Layer:** Application
//! - **Purpose:** Strategy dispatch for `init` ([`configure_aws`]) and
//!   read-only session loading for `upgrade`, `uninstall` and `debug`
//!   ([`load_existing_session`])
//!
//! | Strategy | Node name | Credential daemon |
//! |----------|-----------|-------------------|
//! | SSM | `ManagedInstanceID` from the registration record | ssm-agent |
//! | IAM Roles Anywhere | `spec.hybrid.iamRolesAnywhere.nodeName` | signing-helper-updater, when `enableCredentialsFile` |

pub mod iam_roles_anywhere;
pub mod ssm;

use aws_config::SdkConfig;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::application::daemon_manager::BringUpError;
use crate::domain::artifacts::ArtifactInstaller;
use crate::domain::credentials::{CredentialStrategy, StrategyParams};
use crate::domain::daemon::Daemon;
use crate::domain::node_config::{ConfigError, NodeConfig};
use crate::domain::registration::{RegistrationReadError, SsmRegistrar};
use crate::domain::service::ServiceManager;
use crate::infrastructure::layout::HostLayout;

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    RegistrationRecord(#[from] RegistrationReadError),

    #[error("SSM activation was rejected: {output}")]
    ActivationRejected { output: String },

    #[error("SSM registration failed after {attempts} attempt(s): {output}")]
    Registration { attempts: u32, output: String },

    #[error("failed to reinstall ssm-setup-cli: {0}")]
    SetupReinstall(#[source] anyhow::Error),

    #[error("registration succeeded but no record was written to {path:?}")]
    RecordMissing { path: PathBuf },

    #[error("{field} {path:?} does not exist")]
    MissingFile { field: &'static str, path: PathBuf },

    #[error("failed to render AWS config profile: {0}")]
    Render(String),

    #[error("failed to write AWS config profile {path:?}: {source}")]
    WriteProfile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Daemon(#[from] BringUpError),

    #[error("node has no {strategy} credentials yet ({path:?} is missing); run `hybridadm init` first")]
    NotProvisioned {
        strategy: CredentialStrategy,
        path: PathBuf,
    },
}

/// Host seams credential provisioning needs.
#[derive(Clone)]
pub struct CredentialDeps {
    pub layout: HostLayout,
    pub services: Arc<dyn ServiceManager>,
    pub registrar: Arc<dyn SsmRegistrar>,
    pub installer: Arc<dyn ArtifactInstaller>,
}

/// An AWS identity usable by the rest of the pipeline.
#[derive(Debug, Clone)]
pub struct AwsSession {
    pub sdk_config: SdkConfig,
    pub node_name: String,
    pub strategy: CredentialStrategy,
}

/// Provision credentials with whichever strategy the configuration selects.
pub async fn configure_aws(
    config: &NodeConfig,
    deps: &CredentialDeps,
    cancel: &CancellationToken,
) -> Result<AwsSession, CredentialsError> {
    match config.strategy_params()? {
        StrategyParams::Ssm(spec) => ssm::configure(config, spec, deps, cancel).await,
        StrategyParams::IamRolesAnywhere(spec) => {
            iam_roles_anywhere::configure(config, spec, deps, cancel).await
        }
    }
}

/// Build a session from credential material already on disk. Registers
/// nothing, writes nothing, starts nothing.
pub async fn load_existing_session(
    config: &NodeConfig,
    layout: &HostLayout,
) -> Result<AwsSession, CredentialsError> {
    match config.strategy_params()? {
        StrategyParams::Ssm(_) => ssm::load_existing(config, layout).await,
        StrategyParams::IamRolesAnywhere(spec) => {
            iam_roles_anywhere::load_existing(config, spec, layout).await
        }
    }
}

/// The daemons the selected strategy runs, in bring-up order. The other
/// strategy's daemons are never part of the list.
pub fn credential_daemons(
    config: &NodeConfig,
    deps: &CredentialDeps,
) -> Result<Vec<Arc<dyn Daemon>>, CredentialsError> {
    let daemons: Vec<Arc<dyn Daemon>> = match config.strategy_params()? {
        StrategyParams::Ssm(_) => vec![ssm::agent_daemon(config, deps)],
        StrategyParams::IamRolesAnywhere(spec) if config.credentials_file_enabled() => {
            vec![iam_roles_anywhere::signing_helper_daemon(config, spec, deps)]
        }
        StrategyParams::IamRolesAnywhere(_) => Vec::new(),
    };
    Ok(daemons)
}
