// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! SSM managed instance registration record.
//!
//! Written by the SSM agent after a successful hybrid activation. This crate
//! only ever reads it; the agent owns its contents.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::node_config::SsmSpec;

/// Well-known location of the record, relative to the install root.
pub const REGISTRATION_PATH: &str = "/var/lib/amazon/ssm/registration";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedInstanceRegistration {
    #[serde(rename = "ManagedInstanceID")]
    pub managed_instance_id: String,

    #[serde(rename = "Region")]
    pub region: String,
}

#[derive(Debug, Error)]
pub enum RegistrationReadError {
    #[error("failed to read SSM registration {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed SSM registration {path:?}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("SSM registration {path:?} has an empty ManagedInstanceID")]
    MissingInstanceId { path: PathBuf },
}

impl ManagedInstanceRegistration {
    /// Read the record; `Ok(None)` when the node has never registered.
    pub fn read(path: &Path) -> Result<Option<Self>, RegistrationReadError> {
        let content = match std::fs::read(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(RegistrationReadError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let registration: Self =
            serde_json::from_slice(&content).map_err(|source| RegistrationReadError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;
        if registration.managed_instance_id.is_empty() {
            return Err(RegistrationReadError::MissingInstanceId {
                path: path.to_path_buf(),
            });
        }
        Ok(Some(registration))
    }
}

/// The activation tool rejected or failed a registration attempt.
///
/// `output` is everything the tool printed; the caller classifies it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("SSM registration failed: {output}")]
pub struct RegistrarError {
    pub output: String,
}

/// Performs a hybrid activation, after which the SSM agent writes the
/// registration record.
#[async_trait]
pub trait SsmRegistrar: Send + Sync {
    async fn register(&self, activation: &SsmSpec, region: &str) -> Result<(), RegistrarError>;
}

/// Removes a managed instance from the SSM fleet.
#[async_trait]
pub trait ManagedInstanceDeregistrar: Send + Sync {
    async fn deregister(&self, managed_instance_id: &str) -> anyhow::Result<()>;
}
