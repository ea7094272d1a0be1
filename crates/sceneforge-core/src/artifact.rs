//! Render artifact conventions and post-run verification.
//!
//! The path agreement between script and caller is made by construction:
//! every persisted script ends with the epilogue below, which points the
//! renderer at `renders/<job_key>.png` inside the mount. After a run the
//! pipeline verifies the artifact actually exists; a clean exit without
//! its image is still a failure.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{ArtifactError, JobKey};

/// Python epilogue appended to every persisted script.
///
/// Sets the render output path and renders a single still. The renders
/// directory is given as seen from inside the sandbox.
pub fn render_epilogue(container_renders_dir: &Path, key: &JobKey) -> String {
    let output = container_renders_dir
        .join(key.artifact_file())
        .display()
        .to_string();
    format!(
        "\n\n# render a single still to the shared output path\n\
         bpy.context.scene.render.image_settings.file_format = 'PNG'\n\
         bpy.context.scene.render.filepath = {output:?}\n\
         bpy.ops.render.render(write_still=True)\n"
    )
}

/// A verified render artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub path: PathBuf,
    pub len: u64,
}

/// Check that the agreed artifact exists and is non-empty.
pub fn verify_artifact(path: &Path) -> Result<Artifact, ArtifactError> {
    let meta = fs::metadata(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ArtifactError::Missing {
                path: path.to_path_buf(),
            }
        } else {
            ArtifactError::Io(e)
        }
    })?;

    if meta.len() == 0 {
        return Err(ArtifactError::Empty {
            path: path.to_path_buf(),
        });
    }

    Ok(Artifact {
        path: path.to_path_buf(),
        len: meta.len(),
    })
}

impl Artifact {
    /// Read the image bytes for callers that need the payload.
    pub fn read_bytes(&self) -> Result<Vec<u8>, ArtifactError> {
        Ok(fs::read(&self.path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::JobName;

    fn key() -> JobKey {
        JobKey::derive(&JobName::new("cube").unwrap())
    }

    #[test]
    fn test_epilogue_targets_container_path() {
        let k = key();
        let epilogue = render_epilogue(Path::new("/work/renders"), &k);
        assert!(epilogue.contains("/work/renders/"));
        assert!(epilogue.contains(&k.artifact_file()));
        assert!(epilogue.contains("write_still=True"));
        assert!(epilogue.contains("file_format = 'PNG'"));
    }

    #[test]
    fn test_epilogue_quotes_path_for_python() {
        let epilogue = render_epilogue(Path::new("/work/renders"), &key());
        assert!(epilogue.contains("filepath = \"/work/renders/"));
    }

    #[test]
    fn test_verify_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.png");
        match verify_artifact(&path) {
            Err(ArtifactError::Missing { path: p }) => assert_eq!(p, path),
            other => panic!("expected Missing, got {other:?}"),
        }
    }

    #[test]
    fn test_verify_empty_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.png");
        fs::write(&path, b"").unwrap();
        assert!(matches!(
            verify_artifact(&path),
            Err(ArtifactError::Empty { .. })
        ));
    }

    #[test]
    fn test_verify_and_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ok.png");
        fs::write(&path, b"\x89PNG...").unwrap();

        let artifact = verify_artifact(&path).unwrap();
        assert_eq!(artifact.len, 8);
        assert_eq!(artifact.read_bytes().unwrap(), b"\x89PNG...");
    }
}
