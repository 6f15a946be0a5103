// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Kubelet serving certificate against the cluster CA.
//!
//! A missing, not yet valid or expired certificate is left to the kubelet,
//! which requests or rotates it on its own.

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

use crate::domain::certificate::{remediation, validate_certificate, CertificateOutcome};
use crate::domain::validation::{CheckResult, CheckStatus, Validation, ValidationError};

use super::{NodeContext, KUBELET_CERT_VALIDATION};

#[derive(Debug, Error)]
pub enum KubeletCertificateError {
    #[error("kubelet certificate {path:?} could not be read: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("kubelet certificate {path:?} is not a valid certificate: {reason}")]
    InvalidEncoding { path: PathBuf, reason: String },

    #[error("kubelet certificate {path:?} is not trusted by the cluster CA: {reason}")]
    UntrustedCa { path: PathBuf, reason: String },
}

impl KubeletCertificateError {
    fn from_outcome(path: PathBuf, outcome: &CertificateOutcome) -> Option<Self> {
        let error = match outcome {
            CertificateOutcome::UnreadableFile { reason } => Self::Unreadable {
                path,
                reason: reason.clone(),
            },
            CertificateOutcome::InvalidEncoding { reason } => Self::InvalidEncoding {
                path,
                reason: reason.clone(),
            },
            CertificateOutcome::UntrustedCa { reason } => Self::UntrustedCa {
                path,
                reason: reason.clone(),
            },
            _ => return None,
        };
        Some(error)
    }
}

pub struct KubeletCertValidation;

#[async_trait]
impl Validation<NodeContext> for KubeletCertValidation {
    fn name(&self) -> &str {
        KUBELET_CERT_VALIDATION
    }

    fn description(&self) -> &str {
        "Validating kubelet serving certificate"
    }

    async fn run(&self, ctx: &NodeContext) -> CheckResult {
        let ca = match ctx.config.spec.cluster.certificate_authority_pem() {
            Ok(Some(ca)) => ca,
            Ok(None) => return Ok(CheckStatus::skipped("cluster certificate authority unknown")),
            Err(e) => return Err(ValidationError::fatal(e)),
        };

        let path = ctx.layout.kubelet_serving_cert();
        let outcome = validate_certificate(&path, &ca, ctx.now);
        if outcome.is_valid() {
            return Ok(CheckStatus::Passed);
        }
        if outcome.self_heals() {
            info!(outcome = ?outcome, path = %path.display(), "Kubelet certificate will be renewed by the kubelet");
            return Ok(CheckStatus::Passed);
        }

        let hint = remediation(&outcome, &path);
        match KubeletCertificateError::from_outcome(path, &outcome) {
            None => Ok(CheckStatus::Passed),
            Some(error) => {
                let error = ValidationError::fatal(error);
                Err(match hint {
                    Some(text) => error.with_remediation(text),
                    None => error,
                })
            }
        }
    }
}
