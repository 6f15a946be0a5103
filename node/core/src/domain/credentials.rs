// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Credential strategy selection.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::node_config::{
    ConfigError, IamRolesAnywhereSpec, NodeConfig, SsmSpec,
};

/// How this node obtains its AWS identity. Exactly one per node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CredentialStrategy {
    Ssm,
    IamRolesAnywhere,
}

impl fmt::Display for CredentialStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ssm => write!(f, "ssm"),
            Self::IamRolesAnywhere => write!(f, "iam-roles-anywhere"),
        }
    }
}

/// Strategy together with the parameters it runs on.
#[derive(Debug, Clone, Copy)]
pub enum StrategyParams<'a> {
    Ssm(&'a SsmSpec),
    IamRolesAnywhere(&'a IamRolesAnywhereSpec),
}

impl StrategyParams<'_> {
    pub fn strategy(&self) -> CredentialStrategy {
        match self {
            Self::Ssm(_) => CredentialStrategy::Ssm,
            Self::IamRolesAnywhere(_) => CredentialStrategy::IamRolesAnywhere,
        }
    }
}

impl NodeConfig {
    /// The configured strategy's parameters. Enforces mutual exclusivity on
    /// its own so callers holding an unvalidated document cannot start the
    /// wrong daemons.
    pub fn strategy_params(&self) -> Result<StrategyParams<'_>, ConfigError> {
        let hybrid = self
            .spec
            .hybrid
            .as_ref()
            .ok_or(ConfigError::NoCredentialStrategy)?;
        match (&hybrid.ssm, &hybrid.iam_roles_anywhere) {
            (Some(ssm), None) => Ok(StrategyParams::Ssm(ssm)),
            (None, Some(iam)) => Ok(StrategyParams::IamRolesAnywhere(iam)),
            (Some(_), Some(_)) => Err(ConfigError::MultipleCredentialStrategies),
            (None, None) => Err(ConfigError::NoCredentialStrategy),
        }
    }

    pub fn credential_strategy(&self) -> Result<CredentialStrategy, ConfigError> {
        self.strategy_params().map(|p| p.strategy())
    }

    /// True when the signing helper should keep a shared credentials file fresh.
    pub fn credentials_file_enabled(&self) -> bool {
        self.spec
            .hybrid
            .as_ref()
            .is_some_and(|h| h.enable_credentials_file && h.iam_roles_anywhere.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::node_config::fixtures::{iam_roles_anywhere_config, ssm_config};

    #[test]
    fn test_strategy_selection() {
        assert_eq!(
            ssm_config().credential_strategy().unwrap(),
            CredentialStrategy::Ssm
        );
        assert_eq!(
            iam_roles_anywhere_config().credential_strategy().unwrap(),
            CredentialStrategy::IamRolesAnywhere
        );
    }

    #[test]
    fn test_credentials_file_requires_iam_roles_anywhere() {
        let mut config = ssm_config();
        config.spec.hybrid.as_mut().unwrap().enable_credentials_file = true;
        assert!(!config.credentials_file_enabled());

        let mut config = iam_roles_anywhere_config();
        config.spec.hybrid.as_mut().unwrap().enable_credentials_file = true;
        assert!(config.credentials_file_enabled());
    }

    #[test]
    fn test_display() {
        assert_eq!(CredentialStrategy::IamRolesAnywhere.to_string(), "iam-roles-anywhere");
    }
}
