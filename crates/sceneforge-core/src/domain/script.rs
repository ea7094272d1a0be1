//! Script entities flowing through the pipeline.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::job::{JobKey, JobName};

/// One user submission. Immutable; consumed by the generator, not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }
}

/// Raw script text produced by the completion service.
///
/// Validated once, then either persisted (accepted) or discarded
/// (rejected). Never mutated after creation: the render epilogue is
/// appended at persist time, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedScript {
    pub job_name: JobName,
    pub source_text: String,
}

impl GeneratedScript {
    pub fn new(job_name: JobName, source_text: impl Into<String>) -> Self {
        Self {
            job_name,
            source_text: source_text.into(),
        }
    }

    /// Hex SHA-256 of the source text.
    pub fn digest(&self) -> String {
        sha256_hex(&self.source_text)
    }
}

/// Hex SHA-256 of arbitrary script text.
pub fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// An accepted script written to the shared directory, 1:1 with one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedScript {
    pub job_key: JobKey,
    pub path: PathBuf,
}
