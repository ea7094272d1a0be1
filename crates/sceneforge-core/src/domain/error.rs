//! Domain-level error taxonomy.
//!
//! Every failure in the pipeline is terminal for the current request: no
//! retry, no fallback generation, no degraded mode. The taxonomy exists so
//! the caller can report precisely what failed and why.

use std::path::PathBuf;

use thiserror::Error;

/// The completion service was unreachable, errored, or returned unusable
/// content.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("completion service unreachable: {0}")]
    Unreachable(String),

    #[error("completion service returned status {status}")]
    BadStatus { status: u16 },

    #[error("completion service returned a malformed response: {0}")]
    MalformedResponse(String),

    #[error("completion service returned an empty script")]
    EmptyResponse,
}

/// The generated script matched a forbidden pattern. The pipeline halts
/// before persistence.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("script contains forbidden pattern {pattern:?}")]
pub struct PolicyViolation {
    /// First matching denylist entry, in denylist order.
    pub pattern: String,
}

/// Disk write or job identifier error.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("invalid job name {name:?}: {reason}")]
    InvalidJobName { name: String, reason: &'static str },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// The render reported success but the agreed artifact is not usable.
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("expected artifact missing after render: {}", .path.display())]
    Missing { path: PathBuf },

    #[error("artifact is empty: {}", .path.display())]
    Empty { path: PathBuf },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Umbrella error for the render pipeline.
#[derive(Error, Debug)]
pub enum ForgeError {
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("validation failed: {0}")]
    Policy(#[from] PolicyViolation),

    #[error("storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("execution failed: {0}")]
    Sandbox(#[from] sceneforge_sandbox::SandboxError),

    #[error("artifact check failed: {0}")]
    Artifact(#[from] ArtifactError),
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, ForgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_violation_names_pattern() {
        let err = PolicyViolation {
            pattern: "import os".to_string(),
        };
        assert!(err.to_string().contains("import os"));
    }

    #[test]
    fn test_artifact_error_names_path() {
        let err = ArtifactError::Missing {
            path: PathBuf::from("/work/renders/job_42-ab12cd34.png"),
        };
        assert!(err.to_string().contains("job_42-ab12cd34.png"));
    }

    #[test]
    fn test_forge_error_wraps_sandbox() {
        let err: ForgeError = sceneforge_sandbox::SandboxError::RenderFailed {
            exit_code: 11,
            stderr: "segfault".to_string(),
        }
        .into();
        let msg = err.to_string();
        assert!(msg.contains("execution failed"));
        assert!(msg.contains("11"));
    }

    #[test]
    fn test_invalid_job_name_display() {
        let err = StorageError::InvalidJobName {
            name: "../etc".to_string(),
            reason: "only ASCII letters, digits, '-' and '_' are allowed",
        };
        assert!(err.to_string().contains("../etc"));
    }
}
