//! Runtime configuration for prompt-relay.
//!
//! Configuration is loaded from a JSON file or constructed programmatically.
//! Every section and field has a default, so a partial file is enough.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};

pub use crate::memory::MemoryConfig;

/// Environment variable consulted when no OpenAI key is configured.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "prompt-relay", about = "HTTP relay for Ollama and OpenAI chat models")]
pub struct Cli {
    /// Path to configuration file (JSON).
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// HTTP listen address (overrides `server.listen`).
    #[arg(long)]
    pub listen: Option<String>,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub json_logs: bool,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,

    /// Conversation memory settings.
    pub memory: MemoryConfig,

    /// Ollama backend.
    pub ollama: OllamaConfig,

    /// OpenAI backend.
    pub openai: OpenAiConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address (e.g. "0.0.0.0:8080").
    pub listen: String,

    /// Deadline for one remote model call, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 300,
        }
    }
}

/// Ollama connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    /// Sampling temperature; the server default applies when unset.
    pub temperature: Option<f32>,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
            temperature: None,
        }
    }
}

/// OpenAI connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub model: String,
    /// API key; falls back to `OPENAI_API_KEY`.
    pub api_key: Option<String>,
    pub temperature: Option<f32>,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            temperature: None,
        }
    }
}

impl OpenAiConfig {
    /// The configured key, or the one from the environment. Blank keys count
    /// as absent.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(OPENAI_API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
    }
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults when the
    /// file or individual fields are missing.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if path.exists() {
            let data = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&data)?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Ok(Config::default())
        }
    }

    /// Reject values the server cannot start with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.memory.max_window_size == 0 {
            anyhow::bail!("memory.max_window_size must be a positive integer");
        }
        if self.server.request_timeout_secs == 0 {
            anyhow::bail!("server.request_timeout_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}
