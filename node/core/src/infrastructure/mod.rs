// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Host-facing implementations of the domain seams.

pub mod aws;
pub mod command;
pub mod daemons;
pub mod fs;
pub mod host_network;
pub mod installer;
pub mod layout;
pub mod os_release;
pub mod retry;
pub mod ssm_setup;
pub mod systemd;
pub mod templates;
pub mod wait;
