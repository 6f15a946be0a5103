// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Idempotent file writes.

use std::io;
use std::path::Path;
use tracing::debug;

/// Write `contents` to `path` unless it already holds exactly those bytes.
///
/// Parent directories are created. Returns whether the file changed.
pub async fn write_if_changed(path: &Path, contents: &[u8], mode: Option<u32>) -> io::Result<bool> {
    match tokio::fs::read(path).await {
        Ok(existing) if existing == contents => {
            debug!(path = %path.display(), "File unchanged");
            return Ok(false);
        }
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, contents).await?;

    #[cfg(unix)]
    if let Some(mode) = mode {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    debug!(path = %path.display(), "File written");
    Ok(true)
}

/// Remove a file; a file that is already gone is not an error.
pub async fn remove_if_exists(path: &Path) -> io::Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_if_changed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/file.conf");

        assert!(write_if_changed(&path, b"one", None).await.unwrap());
        assert!(!write_if_changed(&path, b"one", None).await.unwrap());
        assert!(write_if_changed(&path, b"two", None).await.unwrap());
        assert_eq!(std::fs::read(&path).unwrap(), b"two");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_mode_applied() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret");
        write_if_changed(&path, b"x", Some(0o600)).await.unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn test_remove_if_exists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone");
        assert!(!remove_if_exists(&path).await.unwrap());
        std::fs::write(&path, "x").unwrap();
        assert!(remove_if_exists(&path).await.unwrap());
    }
}
