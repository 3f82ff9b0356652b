//! Inference backends for the model runner.
//!
//! `LlamaServerBackend` owns a locally spawned llama.cpp `llama-server`
//! process and talks to it over HTTP. The backend itself makes no
//! serialization guarantees — that is the `ModelRunner`'s job.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::errors::AppError;
use crate::llm::{ChatMessage, LlmError};

/// Health-poll budget while the server loads the model into memory.
const HEALTH_POLL_ATTEMPTS: u32 = 240;
const HEALTH_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// A blocking-complete inference capability. `chat` takes a message list,
/// `generate` a raw prompt; both return the full response text.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, LlmError>;

    async fn generate(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    top_k: u32,
    repeat_penalty: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    n_predict: u32,
    temperature: f32,
    top_p: f32,
    top_k: u32,
    repeat_penalty: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    content: String,
}

/// Production backend: a spawned llama.cpp server bound to localhost.
///
/// The child process is killed when the backend drops; the GGUF artifact is
/// validated before spawning so a missing model fails startup, not the first
/// inference call.
pub struct LlamaServerBackend {
    client: Client,
    base_url: String,
    sampling: Sampling,
    // Held to keep the server alive; killed on drop via kill_on_drop.
    _child: Child,
}

#[derive(Debug, Clone)]
struct Sampling {
    top_p: f32,
    top_k: u32,
    repeat_penalty: f32,
    stop_sequences: Vec<String>,
}

impl LlamaServerBackend {
    /// Resolves the model artifact, spawns `llama-server` with flags derived
    /// from config, and waits until the server reports healthy.
    pub async fn start(config: &Config) -> Result<Self, AppError> {
        let model_path = resolve_model_path(config)?;
        info!("Loading model: {}", model_path.display());

        let mut command = Command::new(&config.server_binary);
        command
            .arg("-m")
            .arg(&model_path)
            .arg("-c")
            .arg(config.context_length.to_string())
            .arg("-t")
            .arg(config.cpu_threads.to_string())
            .arg("-b")
            .arg(config.batch_size.to_string())
            .arg("-ngl")
            .arg(config.gpu_layers.to_string())
            .arg("--host")
            .arg(&config.server_host)
            .arg("--port")
            .arg(config.server_port.to_string());
        if config.use_mlock {
            command.arg("--mlock");
        }
        if !config.use_mmap {
            command.arg("--no-mmap");
        }
        if !config.verbose {
            command.stdout(Stdio::null()).stderr(Stdio::null());
        }
        command.kill_on_drop(true);

        if config.gpu_layers != 0 {
            info!("GPU offloading enabled: {} layers", config.gpu_layers);
        } else {
            info!("Running on CPU only");
        }

        let mut child = command.spawn().map_err(|e| {
            AppError::Model(format!(
                "Failed to start inference server '{}': {e}",
                config.server_binary
            ))
        })?;

        let base_url = format!("http://{}:{}", config.server_host, config.server_port);
        // No request timeout: a hung inference call stalls its worker rather
        // than returning a spurious error.
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Model(format!("Failed to build HTTP client: {e}")))?;

        wait_until_healthy(&client, &base_url, &mut child).await?;
        info!("Model loaded, inference server ready at {base_url}");

        Ok(Self {
            client,
            base_url,
            sampling: Sampling {
                top_p: config.top_p,
                top_k: config.top_k,
                repeat_penalty: config.repeat_penalty,
                stop_sequences: config.stop_sequences.clone(),
            },
            _child: child,
        })
    }
}

#[async_trait]
impl InferenceBackend for LlamaServerBackend {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, LlmError> {
        let request = ChatCompletionRequest {
            messages,
            max_tokens,
            temperature,
            top_p: self.sampling.top_p,
            top_k: self.sampling.top_k,
            repeat_penalty: self.sampling.repeat_penalty,
            stop: self.sampling.stop_sequences.clone(),
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatCompletionResponse = response.json().await?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        if text.is_empty() {
            return Err(LlmError::EmptyContent);
        }
        debug!("chat completion returned {} chars", text.len());
        Ok(text)
    }

    async fn generate(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, LlmError> {
        let request = CompletionRequest {
            prompt,
            n_predict: max_tokens,
            temperature,
            top_p: self.sampling.top_p,
            top_k: self.sampling.top_k,
            repeat_penalty: self.sampling.repeat_penalty,
            stop: self.sampling.stop_sequences.clone(),
        };

        let response = self
            .client
            .post(format!("{}/completion", self.base_url))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: CompletionResponse = response.json().await?;
        if parsed.content.is_empty() {
            return Err(LlmError::EmptyContent);
        }
        Ok(parsed.content)
    }
}

/// Resolves the configured model artifact. If the configured name is absent
/// but the folder holds exactly one `.gguf` file, falls back to it with a
/// warning; anything else is fatal.
fn resolve_model_path(config: &Config) -> Result<PathBuf, AppError> {
    let folder = PathBuf::from(&config.model_folder);
    if !folder.is_dir() {
        return Err(AppError::Model(format!(
            "Model folder '{}' not found",
            folder.display()
        )));
    }

    let configured = folder.join(&config.model_name);
    if configured.is_file() {
        return Ok(configured);
    }

    let mut gguf_files: Vec<PathBuf> = std::fs::read_dir(&folder)
        .map_err(|e| AppError::Model(format!("Cannot read model folder: {e}")))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .map(|ext| ext.eq_ignore_ascii_case("gguf"))
                .unwrap_or(false)
        })
        .collect();
    gguf_files.sort();

    match gguf_files.len() {
        0 => Err(AppError::Model(format!(
            "No GGUF models found in '{}'",
            folder.display()
        ))),
        1 => {
            warn!(
                "Model '{}' not found, falling back to {}",
                config.model_name,
                gguf_files[0].display()
            );
            Ok(gguf_files.remove(0))
        }
        n => Err(AppError::Model(format!(
            "Model '{}' not found and {} GGUF files are present in '{}' — set model_name explicitly",
            config.model_name,
            n,
            folder.display()
        ))),
    }
}

/// Polls `/health` until the server answers 200, the child exits, or the
/// attempt budget runs out.
async fn wait_until_healthy(
    client: &Client,
    base_url: &str,
    child: &mut Child,
) -> Result<(), AppError> {
    let health_url = format!("{base_url}/health");

    for _ in 0..HEALTH_POLL_ATTEMPTS {
        if let Some(status) = child
            .try_wait()
            .map_err(|e| AppError::Model(format!("Inference server wait failed: {e}")))?
        {
            return Err(AppError::Model(format!(
                "Inference server exited during startup ({status})"
            )));
        }

        match client.get(&health_url).send().await {
            Ok(response) if response.status().is_success() => return Ok(()),
            Ok(response) => debug!("health check: {}", response.status()),
            Err(e) => debug!("health check not ready: {e}"),
        }

        tokio::time::sleep(HEALTH_POLL_INTERVAL).await;
    }

    Err(AppError::Model(
        "Inference server did not become healthy in time".to_string(),
    ))
}
