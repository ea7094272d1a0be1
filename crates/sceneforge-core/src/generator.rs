//! Script generation via an opaque text-completion service.
//!
//! The model backend is a capability: [`TextCompletion`] takes a system
//! instruction plus a user prompt and returns raw text. The shipped
//! implementation talks to a local Ollama server. Whatever comes back is
//! untrusted input for the policy layer; the system instruction constrains
//! the model, it does not enforce anything.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{GeneratedScript, GenerationError, GenerationRequest, JobName};

/// Fixed system instruction sent with every generation request.
///
/// Whitelists the primitive constructors the renderer script may call and
/// demands the scene-clearing preamble so every job starts from an empty
/// scene.
pub const SYSTEM_INSTRUCTION: &str = r#"You are an expert Blender Python scripter.

[TASK]
Generate Python code (bpy) to create 3D objects based on the user's prompt.

[VALID PRIMITIVES (Use ONLY these)]
- bpy.ops.mesh.primitive_cube_add(location=(x,y,z))
- bpy.ops.mesh.primitive_uv_sphere_add(location=(x,y,z))
- bpy.ops.mesh.primitive_ico_sphere_add(subdivisions=2, location=(x,y,z))
- bpy.ops.mesh.primitive_cylinder_add(location=(x,y,z))
- bpy.ops.mesh.primitive_cone_add(location=(x,y,z))
- bpy.ops.mesh.primitive_torus_add(location=(x,y,z))
- bpy.ops.mesh.primitive_monkey_add(location=(x,y,z))

[CRITICAL RULES]
1. Output ONLY valid Python code. NO markdown, NO text explanations.
2. Always start with: import bpy; import math
3. Always clear scene: bpy.ops.object.select_all(action='SELECT'); bpy.ops.object.delete()
4. IF the user asks for a shape NOT in the list (like Dodecahedron, Hexagon):
   -> Use 'primitive_ico_sphere_add(subdivisions=1)' or 'primitive_cylinder_add(vertices=6)' to approximate it.
   -> Do NOT try to create complex meshes manually.
5. IF the user asks for a complex object (Tree, Car):
   -> Combine multiple primitives (Cylinders, Cubes) to build it.

[RESPONSE FORMAT]
import bpy
import math
bpy.ops.object.select_all(action='SELECT')
bpy.ops.object.delete()
# Your generated code here...
"#;

/// Capability interface for the text-completion backend.
///
/// A two-message exchange: fixed system instruction, then the user prompt.
/// One blocking request, one response. No retries, no streaming.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    /// Send the exchange and return the raw response text.
    async fn complete(&self, system: &str, user: &str) -> Result<String, GenerationError>;

    /// Whether the backend is reachable right now.
    async fn is_available(&self) -> bool;
}

/// Ollama client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Server base URL.
    pub base_url: String,

    /// Model to query.
    pub model: String,

    /// Request timeout in seconds. Bounds the whole completion call so an
    /// unresponsive server cannot block the session indefinitely.
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        OllamaConfig {
            base_url: std::env::var("SCENEFORGE_OLLAMA_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:11434".to_string()),
            model: std::env::var("SCENEFORGE_MODEL")
                .unwrap_or_else(|_| "qwen3-coder:30b".to_string()),
            timeout_secs: 120,
        }
    }
}

impl OllamaConfig {
    /// Create a config from environment variables.
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Config for a specific model.
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

/// [`TextCompletion`] implementation for the Ollama `/api/chat` endpoint.
pub struct OllamaClient {
    config: OllamaConfig,
    http_client: reqwest::Client,
}

impl OllamaClient {
    /// Create a new Ollama client.
    pub fn new(config: OllamaConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .user_agent("sceneforge/0.1.0")
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        OllamaClient {
            config,
            http_client,
        }
    }

    /// Create client from environment variables.
    pub fn from_env() -> Self {
        Self::new(OllamaConfig::from_env())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl TextCompletion for OllamaClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, GenerationError> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            stream: false,
        };

        let response = self
            .http_client
            .post(self.endpoint("/api/chat"))
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::BadStatus {
                status: status.as_u16(),
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;

        Ok(parsed.message.content)
    }

    async fn is_available(&self) -> bool {
        match self.http_client.get(self.endpoint("/api/tags")).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

/// Turns a natural-language prompt into a [`GeneratedScript`].
pub struct ScriptGenerator {
    backend: Box<dyn TextCompletion>,
    system_instruction: String,
}

impl ScriptGenerator {
    /// Create a generator over a completion backend.
    pub fn new(backend: Box<dyn TextCompletion>) -> Self {
        Self {
            backend,
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
        }
    }

    /// Replace the system instruction.
    pub fn with_instruction(mut self, instruction: &str) -> Self {
        self.system_instruction = instruction.to_string();
        self
    }

    /// Generate a script for one submission.
    ///
    /// The raw response is normalized (whitespace trimmed, a stray markdown
    /// fence stripped); an empty result is a [`GenerationError::EmptyResponse`].
    pub async fn generate(
        &self,
        job_name: &JobName,
        request: &GenerationRequest,
    ) -> Result<GeneratedScript, GenerationError> {
        let raw = self
            .backend
            .complete(&self.system_instruction, &request.prompt)
            .await?;

        let source_text = normalize_response(&raw);
        if source_text.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }

        debug!(job_name = %job_name, chars = source_text.len(), "script generated");
        Ok(GeneratedScript::new(job_name.clone(), source_text))
    }
}

/// Strip surrounding whitespace and a wrapping markdown fence.
///
/// The system instruction forbids markdown, but models emit fences anyway;
/// a fenced script is otherwise valid so we unwrap rather than reject.
fn normalize_response(raw: &str) -> String {
    let trimmed = raw.trim();
    let Some(stripped) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    let stripped = stripped.strip_suffix("```").unwrap_or(stripped);
    // The opening fence line may carry a language tag ("```python").
    let body = match stripped.split_once('\n') {
        Some((tag, rest)) if tag.trim().chars().all(|c| c.is_ascii_alphanumeric()) => rest,
        _ => stripped,
    };
    body.trim().to_string()
}
