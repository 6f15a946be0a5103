// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Certificate Trust Validation
//!
//! Classifies an on-disk PEM certificate against a cluster CA at a given
//! instant. The result is a tag, not an error: callers decide which tags are
//! fatal and look up operator guidance with [`remediation`].
//!
//! | Outcome | Self-heals? |
//! |---------|-------------|
//! | `NoCertificate` | yes, kubelet requests one once it can authenticate |
//! | `NotYetValid` / `Expired` | yes, kubelet rotates it |
//! | `UnreadableFile` / `InvalidEncoding` / `UntrustedCa` | no, operator action |

use chrono::{DateTime, Utc};
use std::path::Path;
use x509_parser::pem::parse_x509_pem;
use x509_parser::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificateOutcome {
    Valid,
    NoCertificate,
    UnreadableFile { reason: String },
    InvalidEncoding { reason: String },
    NotYetValid { not_before: i64 },
    Expired { not_after: i64 },
    UntrustedCa { reason: String },
}

impl CertificateOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Outcomes the owning daemon fixes on its own.
    pub fn self_heals(&self) -> bool {
        matches!(
            self,
            Self::NoCertificate | Self::NotYetValid { .. } | Self::Expired { .. }
        )
    }
}

/// Classify the certificate at `cert_path` against `ca_pem` at `now`.
pub fn validate_certificate(cert_path: &Path, ca_pem: &[u8], now: DateTime<Utc>) -> CertificateOutcome {
    let cert_pem = match std::fs::read(cert_path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return CertificateOutcome::NoCertificate,
        Err(e) => {
            return CertificateOutcome::UnreadableFile {
                reason: e.to_string(),
            }
        }
    };
    classify(&cert_pem, ca_pem, now)
}

/// Same as [`validate_certificate`] for certificate bytes already in memory.
pub fn classify(cert_pem: &[u8], ca_pem: &[u8], now: DateTime<Utc>) -> CertificateOutcome {
    let (_, cert_block) = match parse_x509_pem(cert_pem) {
        Ok(parsed) => parsed,
        Err(e) => {
            return CertificateOutcome::InvalidEncoding {
                reason: format!("no PEM certificate block: {}", e),
            }
        }
    };
    let (_, cert) = match X509Certificate::from_der(&cert_block.contents) {
        Ok(parsed) => parsed,
        Err(e) => {
            return CertificateOutcome::InvalidEncoding {
                reason: format!("failed to parse certificate: {}", e),
            }
        }
    };

    let now = now.timestamp();
    let not_before = cert.validity().not_before.timestamp();
    let not_after = cert.validity().not_after.timestamp();
    if now < not_before {
        return CertificateOutcome::NotYetValid { not_before };
    }
    if now > not_after {
        return CertificateOutcome::Expired { not_after };
    }

    let (_, ca_block) = match parse_x509_pem(ca_pem) {
        Ok(parsed) => parsed,
        Err(e) => {
            return CertificateOutcome::UntrustedCa {
                reason: format!("cluster CA is not PEM: {}", e),
            }
        }
    };
    let (_, ca) = match X509Certificate::from_der(&ca_block.contents) {
        Ok(parsed) => parsed,
        Err(e) => {
            return CertificateOutcome::UntrustedCa {
                reason: format!("failed to parse cluster CA: {}", e),
            }
        }
    };

    match cert.verify_signature(Some(ca.public_key())) {
        Ok(()) => CertificateOutcome::Valid,
        Err(e) => CertificateOutcome::UntrustedCa {
            reason: format!("certificate is not signed by the cluster CA: {}", e),
        },
    }
}

/// Operator guidance for a kubelet serving certificate outcome.
pub fn remediation(outcome: &CertificateOutcome, cert_path: &Path) -> Option<String> {
    let path = cert_path.display();
    let text = match outcome {
        CertificateOutcome::Valid => return None,
        CertificateOutcome::NoCertificate => {
            "Kubelet certificate will be created when the kubelet is able to authenticate with the API server. Check previous authentication remediation advice.".to_string()
        }
        CertificateOutcome::UnreadableFile { .. } => format!(
            "Check the permissions of {} and that the agent runs as root.",
            path
        ),
        CertificateOutcome::InvalidEncoding { .. } => format!(
            "Kubelet certificate {} is corrupt. Remove it and restart the kubelet so a new one is requested.",
            path
        ),
        CertificateOutcome::NotYetValid { .. } => {
            "Verify the system time is correct and synchronized with an NTP source, then restart the kubelet.".to_string()
        }
        CertificateOutcome::Expired { .. } => format!(
            "Kubelet certificate {} has expired. The kubelet rotates it on restart; remove the file if it does not.",
            path
        ),
        CertificateOutcome::UntrustedCa { .. } => format!(
            "Kubelet certificate {} was not issued by this cluster's CA. Please remove it, or use \"--skip kubelet-cert-validation\" if this is expected.",
            path
        ),
    };
    Some(text)
}
