//! Isolated execution contract and bounded process capture.
//!
//! The runner is the only component that touches untrusted script execution.
//! Everything above it speaks in terms of [`RunRequest`] / [`RunOutput`];
//! the isolation technology behind [`IsolatedRunner`] is swappable.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::error::{Result, SandboxError};

/// A host directory bind-mounted into the sandbox.
///
/// The script store and the runner must agree on this mapping: a script
/// persisted under `host_dir` is visible to the renderer under
/// `container_dir` at the same relative path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountSpec {
    /// Directory on the host holding scripts and render output.
    pub host_dir: PathBuf,

    /// Where that directory appears inside the sandbox.
    pub container_dir: PathBuf,
}

impl MountSpec {
    /// Create a mount mapping `host_dir` to `container_dir`.
    pub fn new(host_dir: impl Into<PathBuf>, container_dir: impl Into<PathBuf>) -> Self {
        Self {
            host_dir: host_dir.into(),
            container_dir: container_dir.into(),
        }
    }

    /// The `host:container` volume argument for a container runtime.
    pub fn volume_arg(&self) -> String {
        format!(
            "{}:{}",
            self.host_dir.display(),
            self.container_dir.display()
        )
    }

    /// Resolve a mount-relative path to its in-container location.
    pub fn container_path(&self, relative: &Path) -> PathBuf {
        self.container_dir.join(relative)
    }
}

/// One request to execute a script inside the sandbox.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// The shared-directory mapping.
    pub mount: MountSpec,

    /// Script location relative to the mount root.
    pub script: PathBuf,

    /// Wall-clock budget for the whole run.
    pub timeout: Duration,
}

impl RunRequest {
    /// Create a run request for a mount-relative script path.
    pub fn new(mount: MountSpec, script: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            mount,
            script: script.into(),
            timeout,
        }
    }
}

/// Captured output of a completed sandboxed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutput {
    /// Exit code (0 = success, -1 = terminated by signal).
    pub exit_code: i32,

    /// Captured stdout.
    pub stdout: String,

    /// Captured stderr.
    pub stderr: String,

    /// Duration in milliseconds.
    pub duration_ms: u64,
}

impl RunOutput {
    /// Whether the run exited cleanly.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Turn a failed run into its error form, carrying exit code and stderr.
    pub fn into_result(self) -> Result<RunOutput> {
        if self.success() {
            Ok(self)
        } else {
            Err(SandboxError::RenderFailed {
                exit_code: self.exit_code,
                stderr: self.stderr,
            })
        }
    }
}

/// Capability interface for isolated script execution.
///
/// Implementations decide the isolation technology (container, micro-VM,
/// restricted subprocess). The pipeline only assumes: the mount mapping is
/// honored, both streams are captured, and the run is bounded by the
/// request's timeout.
#[async_trait]
pub trait IsolatedRunner: Send + Sync {
    /// Execute the request's script to completion and capture its output.
    async fn run(&self, request: &RunRequest) -> Result<RunOutput>;

    /// Whether the backing isolation technology is usable right now.
    async fn is_available(&self) -> bool;

    /// Runner name for logs and diagnostics.
    fn name(&self) -> &str;
}

/// Run a prepared command to completion with a bounded wall clock.
///
/// Both output pipes are drained concurrently with the wait so a chatty
/// child can never block on a full pipe. On timeout the child is killed
/// and reaped before the error is returned, so no zombie survives the call.
pub async fn run_captured(mut cmd: Command, timeout: Duration) -> Result<RunOutput> {
    let start = Instant::now();

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn()?;

    let mut stdout_pipe = child
        .stdout
        .take()
        .ok_or(SandboxError::StreamCapture("stdout"))?;
    let mut stderr_pipe = child
        .stderr
        .take()
        .ok_or(SandboxError::StreamCapture("stderr"))?;

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });

    let status = match tokio::time::timeout(timeout, child.wait()).await {
        Ok(status) => status?,
        Err(_elapsed) => {
            child.start_kill().ok();
            let _ = child.wait().await;
            stdout_task.abort();
            stderr_task.abort();
            return Err(SandboxError::Timeout {
                limit_secs: timeout.as_secs(),
            });
        }
    };

    let stdout = stdout_task
        .await
        .map_err(|_| SandboxError::StreamCapture("stdout"))??;
    let stderr = stderr_task
        .await
        .map_err(|_| SandboxError::StreamCapture("stderr"))??;

    Ok(RunOutput {
        exit_code: status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&stdout).to_string(),
        stderr: String::from_utf8_lossy(&stderr).to_string(),
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mount_volume_arg() {
        let mount = MountSpec::new("/home/user/workspace", "/work");
        assert_eq!(mount.volume_arg(), "/home/user/workspace:/work");
    }

    #[test]
    fn test_mount_container_path() {
        let mount = MountSpec::new("/tmp/ws", "/work");
        let resolved = mount.container_path(Path::new("scripts/job.py"));
        assert_eq!(resolved, PathBuf::from("/work/scripts/job.py"));
    }

    #[test]
    fn test_run_output_success() {
        let output = RunOutput {
            exit_code: 0,
            stdout: "ok".to_string(),
            stderr: String::new(),
            duration_ms: 10,
        };
        assert!(output.success());
        assert!(output.into_result().is_ok());
    }

    #[test]
    fn test_run_output_failure_carries_diagnostics() {
        let output = RunOutput {
            exit_code: 2,
            stdout: String::new(),
            stderr: "Error: no camera".to_string(),
            duration_ms: 10,
        };
        assert!(!output.success());
        match output.into_result() {
            Err(SandboxError::RenderFailed { exit_code, stderr }) => {
                assert_eq!(exit_code, 2);
                assert!(stderr.contains("no camera"));
            }
            other => panic!("expected RenderFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_run_captured_simple_command() {
        let mut cmd = Command::new("echo");
        cmd.arg("hello");

        let output = run_captured(cmd, Duration::from_secs(10))
            .await
            .expect("echo failed");
        assert!(output.success());
        assert!(output.stdout.contains("hello"));
        assert!(output.stderr.is_empty());
    }

    #[tokio::test]
    async fn test_run_captured_failing_command() {
        let cmd = Command::new("false");

        let output = run_captured(cmd, Duration::from_secs(10))
            .await
            .expect("false should spawn");
        assert!(!output.success());
        assert_ne!(output.exit_code, 0);
    }

    #[tokio::test]
    async fn test_run_captured_captures_stderr() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo oops >&2; exit 3"]);

        let output = run_captured(cmd, Duration::from_secs(10))
            .await
            .expect("sh should spawn");
        assert_eq!(output.exit_code, 3);
        assert!(output.stderr.contains("oops"));
    }

    #[tokio::test]
    async fn test_run_captured_kills_on_timeout() {
        let mut cmd = Command::new("sleep");
        cmd.arg("30");

        let result = run_captured(cmd, Duration::from_millis(100)).await;
        match result {
            Err(SandboxError::Timeout { limit_secs }) => assert_eq!(limit_secs, 0),
            other => panic!("expected Timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_run_captured_missing_binary() {
        let cmd = Command::new("/nonexistent-binary-that-does-not-exist");

        let result = run_captured(cmd, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(SandboxError::Io(_))));
    }
}
