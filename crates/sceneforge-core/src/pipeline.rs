//! The prompt → script → policy → sandbox → artifact pipeline.
//!
//! One request, five stages, each blocking on the previous: generate,
//! validate, persist, execute, verify. Every failure is terminal for the
//! request (no retry, no fallback generation). A rejected script never
//! touches disk and never reaches the sandbox.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use sceneforge_sandbox::{IsolatedRunner, MountSpec, RunOutput, RunRequest};

use crate::artifact::{render_epilogue, verify_artifact, Artifact};
use crate::domain::{sha256_hex, GenerationRequest, JobKey, JobName, PolicyViolation, Result};
use crate::generator::ScriptGenerator;
use crate::history::{HistoryStore, JobRecord};
use crate::policy::{PolicyVerdict, ScriptPolicy};
use crate::store::{ScriptStore, RENDERS_DIR};

/// Pipeline tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Where the store root appears inside the sandbox.
    pub container_workspace: PathBuf,

    /// Wall-clock budget for one sandboxed render, in seconds.
    pub render_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            container_workspace: PathBuf::from("/work"),
            render_timeout_secs: 300,
        }
    }
}

/// Result of a complete render job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderReport {
    /// Unique key under which script and artifact were stored.
    pub job_key: String,

    /// Persisted script on the host.
    pub script_path: PathBuf,

    /// Hex SHA-256 of the persisted script text.
    pub script_digest: String,

    /// Verified render output.
    pub artifact: Artifact,

    /// Captured sandbox execution.
    pub execution: RunOutput,

    /// Total pipeline duration in milliseconds.
    pub duration_ms: u64,
}

/// Orchestrates one render job across the capability seams.
pub struct RenderPipeline {
    generator: ScriptGenerator,
    policy: Box<dyn ScriptPolicy>,
    store: ScriptStore,
    runner: Box<dyn IsolatedRunner>,
    history: HistoryStore,
    config: PipelineConfig,
}

impl RenderPipeline {
    pub fn new(
        generator: ScriptGenerator,
        policy: Box<dyn ScriptPolicy>,
        store: ScriptStore,
        runner: Box<dyn IsolatedRunner>,
        history: HistoryStore,
        config: PipelineConfig,
    ) -> Self {
        Self {
            generator,
            policy,
            store,
            runner,
            history,
            config,
        }
    }

    /// Run the full pipeline for one prompt.
    ///
    /// The outcome, success or the exact failing stage, is journaled to
    /// history either way.
    pub async fn render(&self, job_name: &JobName, prompt: &str) -> Result<RenderReport> {
        let key = JobKey::derive(job_name);
        info!(job_key = %key, "generating script");

        let request = GenerationRequest::new(prompt);
        let script = match self.generator.generate(job_name, &request).await {
            Ok(script) => script,
            Err(e) => {
                warn!(job_key = %key, error = %e, "generation failed");
                self.record_failure(&key, prompt, None, &e.to_string());
                return Err(e.into());
            }
        };

        self.run_script(key, prompt, &script.source_text).await
    }

    /// Validate, persist, and execute an existing script, skipping
    /// generation. The policy still applies.
    pub async fn execute(&self, job_name: &JobName, source_text: &str) -> Result<RenderReport> {
        let key = JobKey::derive(job_name);
        self.run_script(key, "(pre-written script)", source_text)
            .await
    }

    async fn run_script(
        &self,
        key: JobKey,
        prompt: &str,
        source_text: &str,
    ) -> Result<RenderReport> {
        let start = Instant::now();

        // Validate before anything touches disk.
        if let PolicyVerdict::Rejected { pattern } = self.policy.evaluate(source_text) {
            let violation = PolicyViolation { pattern };
            warn!(job_key = %key, error = %violation, "script rejected");
            self.record_failure(&key, prompt, None, &violation.to_string());
            return Err(violation.into());
        }
        info!(job_key = %key, "script accepted");

        // Persist with the render epilogue appended, so script and caller
        // agree on the artifact path by construction.
        let epilogue = render_epilogue(&self.config.container_workspace.join(RENDERS_DIR), &key);
        let full_text = format!("{source_text}{epilogue}");
        let script_digest = sha256_hex(&full_text);

        let persisted = match self.store.persist(&key, &full_text) {
            Ok(persisted) => persisted,
            Err(e) => {
                warn!(job_key = %key, error = %e, "persist failed");
                self.record_failure(&key, prompt, None, &e.to_string());
                return Err(e.into());
            }
        };
        info!(job_key = %key, path = %persisted.path.display(), "script persisted");

        // Execute inside the sandbox, bounded by the render timeout.
        let mount = MountSpec::new(self.store.root(), &self.config.container_workspace);
        let request = RunRequest::new(
            mount,
            self.store.script_rel(&persisted),
            Duration::from_secs(self.config.render_timeout_secs),
        );

        let output = match self.runner.run(&request).await {
            Ok(output) => output,
            Err(e) => {
                warn!(job_key = %key, error = %e, "sandbox run failed");
                self.record_failure(&key, prompt, Some(persisted.path.clone()), &e.to_string());
                return Err(e.into());
            }
        };

        let execution = match output.into_result() {
            Ok(output) => output,
            Err(e) => {
                warn!(job_key = %key, error = %e, "renderer exited non-zero");
                self.record_failure(&key, prompt, Some(persisted.path.clone()), &e.to_string());
                return Err(e.into());
            }
        };

        // A clean exit without the agreed artifact is still a failure.
        let artifact = match verify_artifact(&self.store.artifact_path(&key)) {
            Ok(artifact) => artifact,
            Err(e) => {
                warn!(job_key = %key, error = %e, "artifact check failed");
                self.record_failure(&key, prompt, Some(persisted.path.clone()), &e.to_string());
                return Err(e.into());
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            job_key = %key,
            artifact = %artifact.path.display(),
            duration_ms,
            "render complete"
        );

        self.record(&JobRecord::succeeded(
            key.as_str(),
            prompt,
            persisted.path.clone(),
            artifact.path.clone(),
            script_digest.clone(),
        ));

        Ok(RenderReport {
            job_key: key.as_str().to_string(),
            script_path: persisted.path,
            script_digest,
            artifact,
            execution,
            duration_ms,
        })
    }

    // History writes must never mask the pipeline outcome.
    fn record(&self, record: &JobRecord) {
        if let Err(e) = self.history.append(record) {
            warn!(job_key = %record.job_key, error = %e, "failed to write history record");
        }
    }

    fn record_failure(&self, key: &JobKey, prompt: &str, script_path: Option<PathBuf>, error: &str) {
        self.record(&JobRecord::failed(key.as_str(), prompt, script_path, error));
    }
}
