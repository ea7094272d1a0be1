//! Job identifiers.
//!
//! A [`JobName`] is the caller-chosen label; a [`JobKey`] is the unique
//! on-disk key derived from it. Deriving a fresh key per request means two
//! submissions under the same name can never overwrite each other's files.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::StorageError;

/// Maximum accepted job name length.
const MAX_NAME_LEN: usize = 64;

/// Caller-chosen identifier for a render job.
///
/// Validated at construction: only ASCII letters, digits, `-` and `_` are
/// accepted, so path separators and traversal sequences can never reach
/// the filesystem layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobName(String);

impl JobName {
    /// Validate and wrap a job name.
    pub fn new(name: &str) -> Result<Self, StorageError> {
        if name.is_empty() {
            return Err(StorageError::InvalidJobName {
                name: name.to_string(),
                reason: "must not be empty",
            });
        }
        if name.len() > MAX_NAME_LEN {
            return Err(StorageError::InvalidJobName {
                name: name.to_string(),
                reason: "longer than 64 bytes",
            });
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(StorageError::InvalidJobName {
                name: name.to_string(),
                reason: "only ASCII letters, digits, '-' and '_' are allowed",
            });
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique on-disk key for one render job: `<job_name>-<8 hex chars>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobKey(String);

impl JobKey {
    /// Derive a fresh key for a job name. Each call yields a new key.
    pub fn derive(name: &JobName) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!("{}-{}", name.as_str(), &suffix[..8]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Script filename under the scripts directory.
    pub fn script_file(&self) -> String {
        format!("{}.py", self.0)
    }

    /// Artifact filename under the renders directory.
    pub fn artifact_file(&self) -> String {
        format!("{}.png", self.0)
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_name_accepts_plain_identifiers() {
        assert!(JobName::new("job_42").is_ok());
        assert!(JobName::new("red-cube").is_ok());
        assert!(JobName::new("A1").is_ok());
    }

    #[test]
    fn test_job_name_rejects_traversal() {
        assert!(JobName::new("../etc/passwd").is_err());
        assert!(JobName::new("a/b").is_err());
        assert!(JobName::new("a\\b").is_err());
        assert!(JobName::new("..").is_err());
    }

    #[test]
    fn test_job_name_rejects_empty_and_oversized() {
        assert!(JobName::new("").is_err());
        assert!(JobName::new(&"x".repeat(65)).is_err());
        assert!(JobName::new(&"x".repeat(64)).is_ok());
    }

    #[test]
    fn test_job_name_rejects_spaces_and_dots() {
        assert!(JobName::new("my job").is_err());
        assert!(JobName::new("job.py").is_err());
    }

    #[test]
    fn test_job_key_is_unique_per_derive() {
        let name = JobName::new("job_42").unwrap();
        let k1 = JobKey::derive(&name);
        let k2 = JobKey::derive(&name);
        assert_ne!(k1, k2, "repeated derives must never collide");
        assert!(k1.as_str().starts_with("job_42-"));
    }

    #[test]
    fn test_job_key_filenames() {
        let name = JobName::new("cube").unwrap();
        let key = JobKey::derive(&name);
        assert_eq!(key.script_file(), format!("{}.py", key.as_str()));
        assert_eq!(key.artifact_file(), format!("{}.png", key.as_str()));
    }
}
