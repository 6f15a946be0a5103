// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! SSM hybrid activation
//!
//! Registration is skipped when the agent already left a registration record
//! behind. Failures are classified from the activation tool's output:
//!
//! | Output | Handling |
//! |--------|----------|
//! | checksum mismatch | reinstall `ssm-setup-cli` once, register once more |
//! | `ActivationExpired` / `InvalidActivation` | fatal, never retried |
//! | anything else | fixed backoff up to `registrationAttempts` |

use regex::Regex;
use std::sync::{Arc, LazyLock};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::application::daemon_manager::DaemonManager;
use crate::domain::credentials::CredentialStrategy;
use crate::domain::daemon::Daemon;
use crate::domain::node_config::{NodeConfig, SsmSpec};
use crate::domain::registration::{ManagedInstanceRegistration, RegistrarError};
use crate::infrastructure::aws::{load_profile_config, ProfileSource};
use crate::infrastructure::daemons::SsmAgentDaemon;
use crate::infrastructure::layout::HostLayout;
use crate::infrastructure::retry::retry_fixed;

use super::{AwsSession, CredentialDeps, CredentialsError};

/// Profile the SSM agent writes its credentials under.
pub const SSM_CREDENTIALS_PROFILE: &str = "default";

static CHECKSUM_MISMATCH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)checksum mismatch").expect("static regex"));
static ACTIVATION_REJECTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ActivationExpired|InvalidActivation").expect("static regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationFailure {
    ChecksumMismatch,
    ActivationRejected,
    Transient,
}

pub fn classify_registration_failure(output: &str) -> RegistrationFailure {
    if ACTIVATION_REJECTED.is_match(output) {
        RegistrationFailure::ActivationRejected
    } else if CHECKSUM_MISMATCH.is_match(output) {
        RegistrationFailure::ChecksumMismatch
    } else {
        RegistrationFailure::Transient
    }
}

pub(super) fn agent_daemon(config: &NodeConfig, deps: &CredentialDeps) -> Arc<dyn Daemon> {
    Arc::new(SsmAgentDaemon::detect(
        deps.layout.clone(),
        deps.services.clone(),
        config.spec.timeouts.credentials_wait(),
    ))
}

pub(super) async fn configure(
    config: &NodeConfig,
    spec: &SsmSpec,
    deps: &CredentialDeps,
    cancel: &CancellationToken,
) -> Result<AwsSession, CredentialsError> {
    let record_path = deps.layout.registration();

    let registration = match ManagedInstanceRegistration::read(&record_path)? {
        Some(existing) => {
            info!(
                instance_id = %existing.managed_instance_id,
                "Node is already registered with SSM"
            );
            existing
        }
        None => {
            register(config, spec, deps).await?;
            ManagedInstanceRegistration::read(&record_path)?
                .ok_or(CredentialsError::RecordMissing { path: record_path })?
        }
    };

    DaemonManager::new(cancel.clone())
        .bring_up(&[agent_daemon(config, deps)])
        .await?;

    let session = session(config, &deps.layout, registration.managed_instance_id).await;
    info!(node_name = %session.node_name, "SSM credentials ready");
    Ok(session)
}

async fn register(
    config: &NodeConfig,
    spec: &SsmSpec,
    deps: &CredentialDeps,
) -> Result<(), CredentialsError> {
    let region = &config.spec.cluster.region;
    let policy = config.spec.timeouts.registration_retry();
    let transient = |e: &RegistrarError| {
        classify_registration_failure(&e.output) == RegistrationFailure::Transient
    };

    let first = retry_fixed(&policy, "ssm-register", transient, || {
        deps.registrar.register(spec, region)
    })
    .await;

    let error = match first {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };

    match classify_registration_failure(&error.output) {
        RegistrationFailure::ActivationRejected => Err(CredentialsError::ActivationRejected {
            output: error.output,
        }),
        RegistrationFailure::Transient => Err(CredentialsError::Registration {
            attempts: policy.max_attempts,
            output: error.output,
        }),
        RegistrationFailure::ChecksumMismatch => {
            warn!("ssm-setup-cli checksum mismatch, reinstalling it and registering again");
            deps.installer
                .reinstall_ssm_setup(region)
                .await
                .map_err(CredentialsError::SetupReinstall)?;
            deps.registrar
                .register(spec, region)
                .await
                .map_err(|e| match classify_registration_failure(&e.output) {
                    RegistrationFailure::ActivationRejected => {
                        CredentialsError::ActivationRejected { output: e.output }
                    }
                    _ => CredentialsError::Registration {
                        attempts: 1,
                        output: e.output,
                    },
                })
        }
    }
}

pub(super) async fn load_existing(
    config: &NodeConfig,
    layout: &HostLayout,
) -> Result<AwsSession, CredentialsError> {
    let record_path = layout.registration();
    let registration = ManagedInstanceRegistration::read(&record_path)?.ok_or(
        CredentialsError::NotProvisioned {
            strategy: CredentialStrategy::Ssm,
            path: record_path,
        },
    )?;
    let credentials = layout.ssm_credentials();
    if !credentials.exists() {
        return Err(CredentialsError::NotProvisioned {
            strategy: CredentialStrategy::Ssm,
            path: credentials,
        });
    }
    Ok(session(config, layout, registration.managed_instance_id).await)
}

async fn session(config: &NodeConfig, layout: &HostLayout, node_name: String) -> AwsSession {
    let credentials = layout.ssm_credentials();
    let sdk_config = load_profile_config(&ProfileSource {
        region: &config.spec.cluster.region,
        profile: SSM_CREDENTIALS_PROFILE,
        config_file: None,
        credentials_file: Some(&credentials),
    })
    .await;
    AwsSession {
        sdk_config,
        node_name,
        strategy: CredentialStrategy::Ssm,
    }
}
