//! Domain model: job identity, script entities, error taxonomy.

pub mod error;
pub mod job;
pub mod script;

pub use error::{
    ArtifactError, ForgeError, GenerationError, PolicyViolation, Result, StorageError,
};
pub use job::{JobKey, JobName};
pub use script::{sha256_hex, GeneratedScript, GenerationRequest, PersistedScript};
