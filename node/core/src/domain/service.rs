// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Host service manager contract.
//!
//! The daemon lifecycle is expressed entirely in terms of these primitives so
//! it can be exercised without a real init system.

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStatus {
    Active,
    Activating,
    Inactive,
    Failed,
    /// The unit file is unknown to the service manager.
    NotLoaded,
}

impl UnitStatus {
    /// Whether the unit currently occupies resources and needs stopping.
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Active | Self::Activating)
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Active => "active",
            Self::Activating => "activating",
            Self::Inactive => "inactive",
            Self::Failed => "failed",
            Self::NotLoaded => "not-loaded",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
#[error("{action} {unit} failed: {message}")]
pub struct ServiceError {
    pub action: &'static str,
    pub unit: String,
    pub message: String,
}

#[async_trait]
pub trait ServiceManager: Send + Sync {
    /// Re-read unit definitions from disk.
    async fn reload(&self) -> Result<(), ServiceError>;
    async fn enable(&self, unit: &str) -> Result<(), ServiceError>;
    async fn disable(&self, unit: &str) -> Result<(), ServiceError>;
    async fn start(&self, unit: &str) -> Result<(), ServiceError>;
    async fn restart(&self, unit: &str) -> Result<(), ServiceError>;
    async fn stop(&self, unit: &str) -> Result<(), ServiceError>;
    async fn status(&self, unit: &str) -> Result<UnitStatus, ServiceError>;
}
