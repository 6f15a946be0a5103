// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! External process execution.
//!
//! Everything the agent shells out to (`systemctl`, the SSM activation tool,
//! `kubelet --version`, `chronyc`, `timedatectl`) goes through
//! [`CommandRunner`] so callers can be tested against scripted output.

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// `None` when the process was killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// stdout followed by stderr, trimmed.
    pub fn combined(&self) -> String {
        let mut out = self.stdout.trim().to_string();
        let err = self.stderr.trim();
        if !err.is_empty() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(err);
        }
        out
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {code:?}: {output}")]
    Failed {
        program: String,
        code: Option<i32>,
        output: String,
    },
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run to completion and capture output. A non-zero exit is not an error
    /// at this level; only a failure to spawn is.
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, CommandError>;
}

/// Run and require a zero exit status.
pub async fn run_checked(
    runner: &dyn CommandRunner,
    program: &str,
    args: &[&str],
) -> Result<CommandOutput, CommandError> {
    let output = runner.run(program, args).await?;
    if output.success() {
        Ok(output)
    } else {
        Err(CommandError::Failed {
            program: program.to_string(),
            code: output.code,
            output: output.combined(),
        })
    }
}

/// Spawns real processes with `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct TokioCommandRunner;

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, CommandError> {
        debug!(program = %program, args = ?args, "Running command");
        let output = tokio::process::Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| CommandError::Spawn {
                program: program.to_string(),
                source,
            })?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_output() {
        let output = CommandOutput {
            code: Some(1),
            stdout: "out\n".to_string(),
            stderr: "err\n".to_string(),
        };
        assert_eq!(output.combined(), "out\nerr");
        assert!(!output.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_tokio_runner_captures_exit() {
        let runner = TokioCommandRunner;
        let output = runner.run("sh", &["-c", "echo hi; exit 3"]).await.unwrap();
        assert_eq!(output.code, Some(3));
        assert_eq!(output.stdout.trim(), "hi");

        let err = run_checked(&runner, "sh", &["-c", "exit 2"]).await.unwrap_err();
        assert!(matches!(err, CommandError::Failed { code: Some(2), .. }));
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let err = TokioCommandRunner
            .run("/nonexistent/hybridadm-test-binary", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }));
    }
}
