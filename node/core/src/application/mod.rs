// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod credentials;
pub mod daemon_manager;
pub mod enrichment;
pub mod flows;
pub mod node_ip;
pub mod validation_runner;
pub mod validations;

// Re-export use cases for convenience
pub use credentials::{configure_aws, load_existing_session, AwsSession, CredentialDeps, CredentialsError};
pub use daemon_manager::{BringUpError, DaemonManager};
pub use enrichment::{enrich, needs_enrichment, EnrichmentError};
pub use flows::{debug, init, uninstall, upgrade, AwsCloudClients, CloudClients, FlowOptions, HostDeps, InitOutcome};
pub use node_ip::{resolve_node_ip, NodeIpError, NodeIpSource};
pub use validation_runner::{TracingInformer, ValidationFailed, ValidationRunner};
pub use validations::{NodeContext, ValidationDeps};
