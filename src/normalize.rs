//! External normalization tool
//!
//! The tool is opaque: it is started as `<program> <input> <output>` from
//! inside the request workspace, so both arguments are bare file names.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::NormalizeError;

/// Something that can normalize `input` into `output` inside `working_dir`
#[async_trait]
pub trait Normalizer: Send + Sync {
    async fn normalize(
        &self,
        working_dir: &Path,
        input: &str,
        output: &str,
    ) -> Result<(), NormalizeError>;
}

/// Runs a program and checks its exit status.
///
/// The child is killed when its future is dropped, whether by the time limit
/// or by the caller going away.
pub struct CommandNormalizer {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl CommandNormalizer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
        }
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Normalizer for CommandNormalizer {
    async fn normalize(
        &self,
        working_dir: &Path,
        input: &str,
        output: &str,
    ) -> Result<(), NormalizeError> {
        let run = Command::new(&self.program)
            .arg(input)
            .arg(output)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let finished = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, run).await.map_err(|_| {
                NormalizeError::Timeout {
                    program: self.program.clone(),
                    secs: limit.as_secs(),
                }
            })?,
            None => run.await,
        };

        let result = finished.map_err(|source| NormalizeError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        if result.status.success() {
            Ok(())
        } else {
            Err(NormalizeError::Failed {
                program: self.program.clone(),
                code: result.status.code(),
                stderr: String::from_utf8_lossy(&result.stderr).into_owned(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let tmp = tempfile::tempdir().unwrap();
        let normalizer = CommandNormalizer::new(tmp.path().join("no-such-normalizer"));
        let err = normalizer
            .normalize(tmp.path(), "downloaded.pdf", "normed.pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, NormalizeError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_zero_exit_is_success() {
        let tmp = tempfile::tempdir().unwrap();
        CommandNormalizer::new("true")
            .normalize(tmp.path(), "downloaded.pdf", "normed.pdf")
            .await
            .unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let err = CommandNormalizer::new("false")
            .normalize(tmp.path(), "downloaded.pdf", "normed.pdf")
            .await
            .unwrap_err();
        match err {
            NormalizeError::Failed { code, .. } => assert_eq!(code, Some(1)),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runs_in_workspace_with_bare_names() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let script = tmp.path().join("copy.sh");
        std::fs::write(&script, "#!/bin/sh\ncp \"$1\" \"$2\"\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let workspace = tmp.path().join("ws");
        std::fs::create_dir(&workspace).unwrap();
        std::fs::write(workspace.join("downloaded.pdf"), b"%PDF-1.4").unwrap();

        CommandNormalizer::new(&script)
            .normalize(&workspace, "downloaded.pdf", "normed.pdf")
            .await
            .unwrap();
        assert_eq!(std::fs::read(workspace.join("normed.pdf")).unwrap(), b"%PDF-1.4");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_slow_program_is_killed_at_limit() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let script = tmp.path().join("slow.sh");
        std::fs::write(&script, "#!/bin/sh\nsleep 2\ntouch \"$2\"\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let started = std::time::Instant::now();
        let err = CommandNormalizer::new(&script)
            .with_timeout(Some(Duration::from_millis(300)))
            .normalize(tmp.path(), "downloaded.pdf", "normed.pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, NormalizeError::Timeout { .. }), "{err:?}");
        assert!(started.elapsed() < Duration::from_secs(2));

        // killed child never gets to write its output
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(!tmp.path().join("normed.pdf").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fast_program_within_limit() {
        let tmp = tempfile::tempdir().unwrap();
        CommandNormalizer::new("true")
            .with_timeout(Some(Duration::from_secs(5)))
            .normalize(tmp.path(), "downloaded.pdf", "normed.pdf")
            .await
            .unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stderr_is_captured() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let script = tmp.path().join("fail.sh");
        std::fs::write(&script, "#!/bin/sh\necho \"Error: cannot load $1\" >&2\nexit 3\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let err = CommandNormalizer::new(&script)
            .normalize(tmp.path(), "downloaded.pdf", "normed.pdf")
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("code 3"), "{message}");
        assert!(message.contains("Error: cannot load downloaded.pdf"), "{message}");
    }
}
