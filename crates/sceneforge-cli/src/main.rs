//! sceneforge - natural-language 3D scenes through a sandboxed renderer
//!
//! ## Commands
//!
//! - `render`: prompt → script → policy check → sandboxed render
//! - `validate`: policy-check an existing script without running it
//! - `exec`: persist and render an existing script (policy still applies)
//! - `history`: list recorded jobs
//! - `doctor`: probe the completion service and the container runtime

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::Level;

use sceneforge_core::{
    init_tracing, DenyPatternSet, HistoryStore, JobName, OllamaClient, OllamaConfig,
    PipelineConfig, PolicyVerdict, RenderPipeline, RenderReport, ScriptGenerator, ScriptPolicy,
    ScriptStore, TextCompletion,
};
use sceneforge_sandbox::{DockerConfig, DockerRunner, IsolatedRunner};

#[derive(Parser)]
#[command(name = "sceneforge")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Describe a 3D object, render it through a sandboxed Blender", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted output and log lines
    #[arg(long, global = true)]
    json: bool,

    /// Workspace directory shared with the sandbox
    #[arg(long, global = true, default_value = ".sceneforge")]
    workspace: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate, validate, and render a script from a prompt
    Render {
        /// Natural-language description of the scene
        prompt: String,

        /// Job name used to label stored files
        #[arg(short, long, default_value = "job")]
        job_name: String,

        /// Model to query (default: SCENEFORGE_MODEL or qwen3-coder:30b)
        #[arg(long)]
        model: Option<String>,

        /// Renderer image for the sandbox
        #[arg(long)]
        image: Option<String>,

        /// Render wall-clock budget in seconds
        #[arg(long, default_value = "300")]
        timeout: u64,
    },

    /// Policy-check an existing script without running it
    Validate {
        /// Path to the script
        script: PathBuf,
    },

    /// Persist and render an existing script, skipping generation
    Exec {
        /// Path to the script
        script: PathBuf,

        /// Job name used to label stored files
        #[arg(short, long, default_value = "job")]
        job_name: String,

        /// Renderer image for the sandbox
        #[arg(long)]
        image: Option<String>,

        /// Render wall-clock budget in seconds
        #[arg(long, default_value = "300")]
        timeout: u64,
    },

    /// List recorded jobs, newest first
    History {
        /// Maximum number of jobs to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Probe the completion service and the container runtime
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    match cli.command {
        Commands::Render {
            prompt,
            job_name,
            model,
            image,
            timeout,
        } => {
            let pipeline = build_pipeline(&cli.workspace, model, image, timeout)?;
            let job = JobName::new(&job_name)?;
            let report = pipeline.render(&job, &prompt).await?;
            print_report(&report, cli.json)?;
        }

        Commands::Validate { script } => {
            let text = std::fs::read_to_string(&script)
                .with_context(|| format!("reading {}", script.display()))?;
            match DenyPatternSet::standard().evaluate(&text) {
                PolicyVerdict::Accepted => println!("accepted"),
                PolicyVerdict::Rejected { pattern } => {
                    eprintln!("rejected: forbidden pattern {pattern:?}");
                    std::process::exit(1);
                }
            }
        }

        Commands::Exec {
            script,
            job_name,
            image,
            timeout,
        } => {
            let text = std::fs::read_to_string(&script)
                .with_context(|| format!("reading {}", script.display()))?;
            let pipeline = build_pipeline(&cli.workspace, None, image, timeout)?;
            let job = JobName::new(&job_name)?;
            let report = pipeline.execute(&job, &text).await?;
            print_report(&report, cli.json)?;
        }

        Commands::History { limit } => {
            let history = HistoryStore::new(&cli.workspace)?;
            let records = history.list()?;
            let shown: Vec<_> = records.into_iter().take(limit).collect();

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&shown)?);
            } else if shown.is_empty() {
                println!("no jobs recorded under {}", cli.workspace.display());
            } else {
                for record in &shown {
                    let status = if record.success { "ok    " } else { "failed" };
                    println!(
                        "{}  {}  {}  {}",
                        record.created_at.format("%Y-%m-%d %H:%M:%S"),
                        status,
                        record.job_key,
                        record.prompt
                    );
                }
            }
        }

        Commands::Doctor => {
            let completion_ok = OllamaClient::from_env().is_available().await;
            let runtime_ok = DockerRunner::from_env().is_available().await;

            println!(
                "completion service: {}",
                if completion_ok { "ok" } else { "unreachable" }
            );
            println!(
                "container runtime:  {}",
                if runtime_ok { "ok" } else { "unavailable" }
            );

            if !(completion_ok && runtime_ok) {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn build_pipeline(
    workspace: &Path,
    model: Option<String>,
    image: Option<String>,
    timeout: u64,
) -> Result<RenderPipeline> {
    let mut ollama = OllamaConfig::from_env();
    if let Some(model) = model {
        ollama.model = model;
    }

    let mut docker = DockerConfig::from_env();
    if let Some(image) = image {
        docker.image = image;
    }

    let store = ScriptStore::new(workspace)
        .with_context(|| format!("preparing workspace {}", workspace.display()))?;
    let history = HistoryStore::new(workspace)?;
    let config = PipelineConfig {
        render_timeout_secs: timeout,
        ..Default::default()
    };

    Ok(RenderPipeline::new(
        ScriptGenerator::new(Box::new(OllamaClient::new(ollama))),
        Box::new(DenyPatternSet::standard()),
        store,
        Box::new(DockerRunner::new(docker)),
        history,
        config,
    ))
}

fn print_report(report: &RenderReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!("job:      {}", report.job_key);
        println!("script:   {}", report.script_path.display());
        println!(
            "artifact: {} ({} bytes)",
            report.artifact.path.display(),
            report.artifact.len
        );
        println!("duration: {}ms", report.duration_ms);
    }
    Ok(())
}
