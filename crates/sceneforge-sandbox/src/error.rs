//! Error types for the sandbox layer.

use thiserror::Error;

/// Errors that can occur while running a script in isolation.
#[derive(Error, Debug)]
pub enum SandboxError {
    /// Container runtime binary is missing
    #[error("container runtime not installed or not in PATH: {0}")]
    RuntimeNotFound(String),

    /// Mount specification cannot be used
    #[error("invalid mount: {0}")]
    InvalidMount(String),

    /// One of the child's output streams could not be captured
    #[error("could not capture {0} of sandboxed process")]
    StreamCapture(&'static str),

    /// The run exceeded its wall-clock budget and was killed
    #[error("sandboxed run exceeded {limit_secs}s wall-clock limit and was killed")]
    Timeout { limit_secs: u64 },

    /// The renderer exited with a non-zero code
    #[error("renderer exited with code {exit_code}: {stderr}")]
    RenderFailed { exit_code: i32, stderr: String },

    /// IO error (spawn, pipe reads)
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for sandbox operations.
pub type Result<T> = std::result::Result<T, SandboxError>;
