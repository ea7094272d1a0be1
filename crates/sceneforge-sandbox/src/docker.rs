//! Docker-backed renderer sandbox.
//!
//! Runs the headless renderer inside a disposable container: `--rm` so the
//! container never outlives the run, a single bind mount for script input
//! and render output, and networking disabled. The static denylist upstream
//! is advisory; this container boundary is the actual isolation guarantee.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{Result, SandboxError};
use crate::runner::{run_captured, IsolatedRunner, RunOutput, RunRequest};

/// Docker sandbox configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockerConfig {
    /// Container runtime binary (docker or a drop-in like podman).
    pub binary: String,

    /// Renderer image to run.
    pub image: String,

    /// Renderer executable inside the image.
    pub renderer: String,

    /// Disable networking inside the container.
    pub network_isolation: bool,
}

impl Default for DockerConfig {
    fn default() -> Self {
        DockerConfig {
            binary: std::env::var("SCENEFORGE_CONTAINER_BIN")
                .unwrap_or_else(|_| "docker".to_string()),
            image: std::env::var("SCENEFORGE_RENDER_IMAGE")
                .unwrap_or_else(|_| "nytimes/blender".to_string()),
            renderer: "blender".to_string(),
            network_isolation: true,
        }
    }
}

impl DockerConfig {
    /// Create a config from environment variables.
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Config for a specific renderer image.
    pub fn with_image(mut self, image: &str) -> Self {
        self.image = image.to_string();
        self
    }
}

/// [`IsolatedRunner`] implementation backed by `docker run`.
pub struct DockerRunner {
    config: DockerConfig,
}

impl DockerRunner {
    /// Create a runner with the given configuration.
    pub fn new(config: DockerConfig) -> Self {
        Self { config }
    }

    /// Create a runner from environment variables.
    pub fn from_env() -> Self {
        Self::new(DockerConfig::from_env())
    }

    /// Build the full argument vector passed to the container runtime.
    fn build_args(&self, request: &RunRequest) -> Vec<String> {
        let container_script = request.mount.container_path(&request.script);

        let mut args = vec!["run".to_string(), "--rm".to_string()];
        if self.config.network_isolation {
            args.push("--network".to_string());
            args.push("none".to_string());
        }
        args.push("-v".to_string());
        args.push(request.mount.volume_arg());
        args.push(self.config.image.clone());
        args.push(self.config.renderer.clone());
        args.push("-b".to_string());
        args.push("-P".to_string());
        args.push(container_script.display().to_string());
        args
    }
}

#[async_trait]
impl IsolatedRunner for DockerRunner {
    async fn run(&self, request: &RunRequest) -> Result<RunOutput> {
        if !request.mount.host_dir.is_dir() {
            return Err(SandboxError::InvalidMount(format!(
                "host directory does not exist: {}",
                request.mount.host_dir.display()
            )));
        }

        let args = self.build_args(request);
        debug!(runtime = %self.config.binary, args = ?args, "launching sandbox");

        let mut cmd = Command::new(&self.config.binary);
        cmd.args(&args);

        let output = run_captured(cmd, request.timeout).await.map_err(|e| {
            // A missing runtime binary surfaces as a spawn error; name it.
            if let SandboxError::Io(ref io) = e {
                if io.kind() == std::io::ErrorKind::NotFound {
                    return SandboxError::RuntimeNotFound(self.config.binary.clone());
                }
            }
            e
        })?;

        info!(
            exit_code = output.exit_code,
            duration_ms = output.duration_ms,
            "sandboxed render finished"
        );

        Ok(output)
    }

    async fn is_available(&self) -> bool {
        Command::new(&self.config.binary)
            .arg("--version")
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn name(&self) -> &str {
        "docker"
    }
}

/// Probe whether the container runtime is installed.
pub async fn is_docker_available() -> bool {
    DockerRunner::from_env().is_available().await
}
