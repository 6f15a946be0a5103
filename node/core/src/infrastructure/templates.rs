// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Host File Templates
//!
//! Unit files and credential profiles are rendered from Handlebars templates
//! embedded at compile time.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Turn typed render contexts into file contents
//!
//! # Templates
//!
//! - `aws_config.hbs` - IAM Roles Anywhere `[profile hybrid]`
//! - `aws_signing_helper_update.service.hbs` - credentials file refresher unit
//! - `kubelet.service.hbs` - kubelet unit
//! - `kubeconfig.hbs` - kubelet kubeconfig using the IAM authenticator

use handlebars::{Handlebars, RenderError};
use serde::Serialize;

pub const AWS_CONFIG_TEMPLATE: &str = include_str!("../../templates/aws_config.hbs");
pub const SIGNING_HELPER_UNIT_TEMPLATE: &str =
    include_str!("../../templates/aws_signing_helper_update.service.hbs");
pub const KUBELET_UNIT_TEMPLATE: &str = include_str!("../../templates/kubelet.service.hbs");
pub const KUBECONFIG_TEMPLATE: &str = include_str!("../../templates/kubeconfig.hbs");
pub const CONTAINERD_BASE_CONFIG: &str = include_str!("../../templates/containerd-config.toml");

pub struct TemplateEngine {
    handlebars: Handlebars<'static>,
}

impl TemplateEngine {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        // A missing field is a bug in the caller, never an empty string.
        handlebars.set_strict_mode(true);
        // Output is config files and command lines, not HTML.
        handlebars.register_escape_fn(handlebars::no_escape);
        Self { handlebars }
    }

    pub fn render<T: Serialize>(&self, template: &str, context: &T) -> Result<String, RenderError> {
        self.handlebars.render_template(template, context)
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_no_html_escaping() {
        let engine = TemplateEngine::new();
        let out = engine
            .render("{{value}}", &json!({"value": "a&b <c> \"d\""}))
            .unwrap();
        assert_eq!(out, "a&b <c> \"d\"");
    }

    #[test]
    fn test_missing_field_is_an_error() {
        let engine = TemplateEngine::new();
        assert!(engine.render(KUBECONFIG_TEMPLATE, &json!({})).is_err());
    }

    #[test]
    fn test_kubeconfig_render() {
        let engine = TemplateEngine::new();
        let out = engine
            .render(
                KUBECONFIG_TEMPLATE,
                &json!({
                    "ca_path": "/etc/kubernetes/pki/ca.crt",
                    "endpoint": "https://example.eks.amazonaws.com",
                    "authenticator": "/usr/local/bin/aws-iam-authenticator",
                    "cluster_name": "c1",
                    "region": "us-west-2",
                }),
            )
            .unwrap();
        assert!(out.contains("server: https://example.eks.amazonaws.com"));
        assert!(out.contains("      - c1\n"));
    }
}
