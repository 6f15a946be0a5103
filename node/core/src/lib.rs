// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Hybrid node bootstrap core
//!
//! Prepares a machine outside of EC2 to join an EKS cluster and keeps
//! verifying that it stays correctly connected.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Credential provisioning, daemon lifecycle, node validation
//!
//! The crate is split the usual way:
//!
//! - [`domain`] holds the node configuration document, the daemon and
//!   validation contracts and the pure decision functions (certificate
//!   classification, CIDR/MTU rules). Nothing in it performs I/O.
//! - [`application`] sequences those pieces into the `init`, `upgrade`,
//!   `uninstall` and `debug` flows.
//! - [`infrastructure`] talks to the host: `systemctl`, the filesystem, the
//!   network stack and the AWS APIs.

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
