// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Resolved facts about this machine.
//!
//! Filled in step by step while bootstrapping (credentials give the name,
//! the resolver gives the IP) and frozen before validations run.

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use thiserror::Error;

use crate::domain::credentials::CredentialStrategy;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NodeIdentityError {
    #[error("node name has not been resolved")]
    MissingNodeName,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeIdentity {
    pub node_name: String,
    pub strategy: CredentialStrategy,
    pub node_ip: Option<Ipv4Addr>,
}

#[derive(Debug, Clone)]
pub struct NodeIdentityBuilder {
    strategy: CredentialStrategy,
    node_name: Option<String>,
    node_ip: Option<Ipv4Addr>,
}

impl NodeIdentityBuilder {
    pub fn new(strategy: CredentialStrategy) -> Self {
        Self {
            strategy,
            node_name: None,
            node_ip: None,
        }
    }

    pub fn with_node_name(mut self, name: impl Into<String>) -> Self {
        self.node_name = Some(name.into());
        self
    }

    pub fn with_node_ip(mut self, ip: Ipv4Addr) -> Self {
        self.node_ip = Some(ip);
        self
    }

    pub fn freeze(self) -> Result<NodeIdentity, NodeIdentityError> {
        Ok(NodeIdentity {
            node_name: self.node_name.ok_or(NodeIdentityError::MissingNodeName)?,
            strategy: self.strategy,
            node_ip: self.node_ip,
        })
    }
}
