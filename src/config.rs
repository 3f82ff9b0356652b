use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application configuration, loaded once at startup from a JSON file.
///
/// Every field has a default so a partial (or absent) config file is fine;
/// a file that exists but fails to parse is a startup error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // Model artifact location
    pub model_folder: String,
    pub model_name: String,

    // Model loading parameters
    pub context_length: u32,
    pub batch_size: u32,
    pub cpu_threads: u32,
    /// -1 = offload all layers to GPU, 0 = CPU only, N = partial offload.
    pub gpu_layers: i32,
    pub use_mmap: bool,
    pub use_mlock: bool,

    // Generation parameters
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub repeat_penalty: f32,
    pub stop_sequences: Vec<String>,

    // Interface options
    pub stream: bool,
    pub echo: bool,
    pub verbose: bool,
    pub use_chat_format: bool,

    // Pipeline options
    pub parallel_workers: usize,
    pub pdf_extraction_workers: usize,
    pub enable_summaries: bool,

    // Local inference server
    pub server_binary: String,
    pub server_host: String,
    pub server_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            model_folder: "model".to_string(),
            model_name: "model.gguf".to_string(),
            context_length: 2048,
            batch_size: 512,
            cpu_threads: 4,
            gpu_layers: -1,
            use_mmap: true,
            use_mlock: false,
            max_tokens: 512,
            temperature: 0.7,
            top_p: 0.9,
            top_k: 40,
            repeat_penalty: 1.1,
            stop_sequences: vec![],
            stream: true,
            echo: false,
            verbose: false,
            use_chat_format: true,
            parallel_workers: 3,
            pdf_extraction_workers: 4,
            enable_summaries: true,
            server_binary: "llama-server".to_string(),
            server_host: "127.0.0.1".to_string(),
            server_port: 8090,
        }
    }
}

impl Config {
    /// Loads configuration from `path`. A missing file yields defaults;
    /// a present-but-malformed file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Writes the current configuration as pretty JSON (starter-file helper).
    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)
            .with_context(|| format!("Failed to write config file {}", path.display()))
    }
}
