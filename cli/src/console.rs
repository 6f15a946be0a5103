// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Operator-facing validation output
//!
//! Remediation text is printed exactly as the check produced it.

use colored::Colorize;

use hybridadm_core::application::ValidationFailed;
use hybridadm_core::domain::validation::{CheckResult, CheckStatus, Informer, Severity, ValidationReport};

/// Prints each validation as it runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleInformer;

impl Informer for ConsoleInformer {
    fn starting(&self, _name: &str, description: &str) {
        println!("{} {}...", "→".cyan(), description);
    }

    fn done(&self, name: &str, result: &CheckResult) {
        println!("{}", render_result(name, result));
    }
}

/// One line per outcome, followed by the remediation when there is one.
pub fn render_result(name: &str, result: &CheckResult) -> String {
    match result {
        Ok(CheckStatus::Passed) => format!("  {}", format!("✓ {}", name).green()),
        Ok(CheckStatus::Skipped { reason }) => {
            format!("  {} {}", format!("- {} skipped:", name).dimmed(), reason)
        }
        Err(e) => {
            let headline = match e.severity() {
                Severity::Fatal => format!("✗ {}: {}", name, e).red(),
                Severity::Warning => format!("⚠ {}: {}", name, e).yellow(),
            };
            match e.remediation() {
                Some(remediation) => format!("  {}\n    {}", headline, remediation),
                None => format!("  {}", headline),
            }
        }
    }
}

/// Summary printed after a flow finishes.
pub fn print_summary(report: &ValidationReport) {
    let warnings = report.warnings().count();
    let skipped = report.skipped().count();
    let ran = report.records.len();
    let line = format!(
        "{} validation(s) run, {} warning(s), {} not applicable",
        ran, warnings, skipped
    );
    if warnings > 0 {
        println!("{}", line.yellow());
    } else {
        println!("{}", line.green());
    }
}

/// Remediation for a failed flow, if a validation caused it.
pub fn failure_remediation(error: &anyhow::Error) -> Option<&str> {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<ValidationFailed>())
        .and_then(|failed| failed.error.remediation())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hybridadm_core::domain::validation::ValidationError;

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn test_remediation_printed_verbatim() {
        plain();
        let remediation = "Ensure the node can reach https://example:443; check `ip route`.";
        let result: CheckResult =
            Err(ValidationError::fatal(anyhow::anyhow!("unreachable")).with_remediation(remediation));
        let rendered = render_result("api-server-endpoint-access-validation", &result);
        assert_eq!(
            rendered,
            format!("  ✗ api-server-endpoint-access-validation: unreachable\n    {}", remediation)
        );
    }

    #[test]
    fn test_skipped_shows_reason() {
        plain();
        let rendered = render_result("ntp-validation", &Ok(CheckStatus::skipped("no chrony")));
        assert_eq!(rendered, "  - ntp-validation skipped: no chrony");
    }

    #[test]
    fn test_failure_remediation_found_through_context() {
        let failed = ValidationFailed {
            check: "node-ip-validation".to_string(),
            error: ValidationError::fatal(anyhow::anyhow!("outside")).with_remediation("add the CIDR"),
            report: ValidationReport::default(),
        };
        let error = anyhow::Error::new(failed).context("Failed to initialize node");
        assert_eq!(failure_remediation(&error), Some("add the CIDR"));
        assert_eq!(failure_remediation(&anyhow::anyhow!("other")), None);
    }
}
