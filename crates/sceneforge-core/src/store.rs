//! Script persistence on the shared sandbox directory.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::domain::{JobKey, PersistedScript, StorageError};

/// Subdirectory holding one script file per job.
pub const SCRIPTS_DIR: &str = "scripts";

/// Subdirectory receiving render output.
pub const RENDERS_DIR: &str = "renders";

/// Filesystem store for accepted scripts and their render output.
///
/// Layout: `<root>/scripts/<job_key>.py`, `<root>/renders/<job_key>.png`.
/// The root is the directory bind-mounted into the sandbox, so every path
/// here is reachable in-container at the same relative location. Keys are
/// unique per persist; no two jobs ever share a file. Files accumulate;
/// there is no cleanup policy.
pub struct ScriptStore {
    root: PathBuf,
}

impl ScriptStore {
    /// Create a store rooted at `root`, creating both subdirectories if
    /// needed (idempotent).
    pub fn new(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join(SCRIPTS_DIR))?;
        fs::create_dir_all(root.join(RENDERS_DIR))?;
        Ok(Self { root })
    }

    /// The mount root shared with the sandbox.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn scripts_dir(&self) -> PathBuf {
        self.root.join(SCRIPTS_DIR)
    }

    pub fn renders_dir(&self) -> PathBuf {
        self.root.join(RENDERS_DIR)
    }

    /// Write `source_text` under the job key.
    ///
    /// Atomic write: temp file in the target directory, then rename. A
    /// crashed persist never leaves a half-written script for the sandbox
    /// to pick up.
    pub fn persist(&self, key: &JobKey, source_text: &str) -> Result<PersistedScript, StorageError> {
        let dir = self.scripts_dir();
        let path = dir.join(key.script_file());

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(source_text.as_bytes())?;
        tmp.persist(&path).map_err(|e| StorageError::Io(e.error))?;

        Ok(PersistedScript {
            job_key: key.clone(),
            path,
        })
    }

    /// Read a persisted script back.
    pub fn read(&self, persisted: &PersistedScript) -> Result<String, StorageError> {
        Ok(fs::read_to_string(&persisted.path)?)
    }

    /// The script's path relative to the mount root, which the sandbox
    /// resolves against its own mount point.
    pub fn script_rel(&self, persisted: &PersistedScript) -> PathBuf {
        PathBuf::from(SCRIPTS_DIR).join(persisted.job_key.script_file())
    }

    /// Where the render epilogue will have written the artifact.
    pub fn artifact_path(&self, key: &JobKey) -> PathBuf {
        self.renders_dir().join(key.artifact_file())
    }
}
