// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain model for hybrid node bootstrap.

pub mod artifacts;
pub mod certificate;
pub mod cluster;
pub mod credentials;
pub mod daemon;
pub mod network;
pub mod node_config;
pub mod node_identity;
pub mod policy;
pub mod registration;
pub mod service;
pub mod validation;
