//! Sceneforge Core Library
//!
//! Turns a natural-language description of a 3D object into a rendered
//! image: an LLM generates a renderer script, a static denylist screens it,
//! the accepted script is persisted to a shared directory, and a disposable
//! container runs the headless renderer against it. The pieces behind the
//! capability seams ([`generator::TextCompletion`], [`policy::ScriptPolicy`],
//! the sandbox's `IsolatedRunner`) are swappable; the pipeline shape is not.

pub mod artifact;
pub mod domain;
pub mod generator;
pub mod history;
pub mod pipeline;
pub mod policy;
pub mod store;
pub mod telemetry;

pub use artifact::{render_epilogue, verify_artifact, Artifact};
pub use domain::{
    ArtifactError, ForgeError, GeneratedScript, GenerationError, GenerationRequest, JobKey,
    JobName, PersistedScript, PolicyViolation, Result, StorageError,
};
pub use generator::{
    OllamaClient, OllamaConfig, ScriptGenerator, TextCompletion, SYSTEM_INSTRUCTION,
};
pub use history::{HistoryStore, JobRecord};
pub use pipeline::{PipelineConfig, RenderPipeline, RenderReport};
pub use policy::{DenyPatternSet, PolicyVerdict, ScriptPolicy};
pub use store::{ScriptStore, RENDERS_DIR, SCRIPTS_DIR};
pub use telemetry::init_tracing;

pub use sceneforge_sandbox::{
    DockerConfig, DockerRunner, IsolatedRunner, MountSpec, RunOutput, RunRequest, SandboxError,
};

/// Sceneforge version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
