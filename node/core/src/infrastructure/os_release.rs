// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! `/etc/os-release` parsing.

use std::path::Path;

/// The `ID=` value, unquoted. Empty when the field is absent.
pub fn parse_os_id(contents: &str) -> String {
    contents
        .lines()
        .find_map(|line| line.trim().strip_prefix("ID="))
        .map(|value| value.trim().trim_matches('"').trim_matches('\'').to_string())
        .unwrap_or_default()
}

pub fn read_os_id(path: &Path) -> std::io::Result<String> {
    Ok(parse_os_id(&std::fs::read_to_string(path)?))
}
