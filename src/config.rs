//! Configuration loading and runtime path resolution.
//!
//! Reads `~/.kindred/config.toml` (or `--config` / `KINDRED_CONFIG`). Every
//! section has defaults, so a missing file yields a working configuration.
//! Environment overrides are applied on top (env > file > defaults).

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::prompt::{
    PromptLimits, DEFAULT_HISTORY_WINDOW, DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_TEMPERATURE,
};

/// Environment variable naming an alternative config file.
pub const CONFIG_PATH_ENV: &str = "KINDRED_CONFIG";

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OPENAI_MODEL: &str = "gpt-3.5-turbo";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Remote model settings.
    #[serde(default)]
    pub model: ModelConfig,
    /// Conversation behaviour.
    #[serde(default)]
    pub conversation: ConversationConfig,
    /// Persistence settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Which wire protocol the remote model speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// OpenAI-compatible `/chat/completions`.
    #[default]
    #[serde(rename = "openai")]
    OpenAi,
    /// Gemini `generateContent`.
    Gemini,
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "gemini" => Ok(Self::Gemini),
            other => Err(format!("unknown backend: {other:?}")),
        }
    }
}

/// Remote model settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Wire protocol.
    #[serde(default)]
    pub backend: BackendKind,
    /// Endpoint base URL; defaults per backend.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Model identifier; defaults per backend.
    #[serde(default)]
    pub model: Option<String>,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Output length limit.
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    /// Request streamed replies.
    #[serde(default = "default_true")]
    pub stream: bool,
    /// TCP connect timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            base_url: None,
            model: None,
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            stream: true,
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl ModelConfig {
    /// Configured base URL or the backend's default.
    pub fn resolved_base_url(&self) -> String {
        self.base_url.clone().unwrap_or_else(|| {
            match self.backend {
                BackendKind::OpenAi => OPENAI_BASE_URL,
                BackendKind::Gemini => GEMINI_BASE_URL,
            }
            .to_owned()
        })
    }

    /// Configured model or the backend's default.
    pub fn resolved_model(&self) -> String {
        self.model.clone().unwrap_or_else(|| {
            match self.backend {
                BackendKind::OpenAi => OPENAI_MODEL,
                BackendKind::Gemini => GEMINI_MODEL,
            }
            .to_owned()
        })
    }
}

/// Conversation behaviour.
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationConfig {
    /// Prior messages sent as context.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    /// Apply the randomized reply flourish.
    #[serde(default = "default_true")]
    pub flourishes: bool,
    /// Seed for the random source; entropy when unset.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            flourishes: true,
            seed: None,
        }
    }
}

/// Persistence settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    /// State file; defaults to `~/.kindred/state.json`.
    #[serde(default)]
    pub state_file: Option<PathBuf>,
}

fn default_api_key_env() -> String {
    "KINDRED_API_KEY".to_owned()
}
fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}
fn default_max_output_tokens() -> u32 {
    DEFAULT_MAX_OUTPUT_TOKENS
}
fn default_true() -> bool {
    true
}
fn default_connect_timeout_secs() -> u64 {
    10
}
fn default_history_window() -> usize {
    DEFAULT_HISTORY_WINDOW
}

impl Config {
    /// Prompt limits derived from the model and conversation sections.
    pub fn prompt_limits(&self) -> PromptLimits {
        PromptLimits {
            history_window: self.conversation.history_window,
            temperature: self.model.temperature,
            max_output_tokens: self.model.max_output_tokens,
            stream: self.model.stream,
        }
    }

    /// Apply environment variable overrides (env > config > defaults).
    ///
    /// Takes a resolver function for testability.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("KINDRED_BACKEND") {
            match v.parse() {
                Ok(kind) => self.model.backend = kind,
                Err(e) => tracing::warn!(
                    var = "KINDRED_BACKEND",
                    value = %v,
                    error = %e,
                    "ignoring invalid env override"
                ),
            }
        }
        if let Some(v) = env("KINDRED_BASE_URL") {
            self.model.base_url = Some(v);
        }
        if let Some(v) = env("KINDRED_MODEL") {
            self.model.model = Some(v);
        }
    }
}

/// Load the config from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config at {}", path.display()))?;
    let config: Config = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config at {}", path.display()))?;
    Ok(config)
}

/// Load the effective config: explicit path, `KINDRED_CONFIG`, or the
/// default location; a missing default file yields defaults. Environment
/// overrides are applied last.
///
/// # Errors
///
/// Returns an error if an existing or explicitly requested file cannot be
/// read or parsed.
pub fn load_effective_config(
    explicit: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Config> {
    let requested = explicit
        .map(Path::to_path_buf)
        .or_else(|| env(CONFIG_PATH_ENV).map(PathBuf::from));

    let mut config = match requested {
        Some(path) => load_config(&path)?,
        None => {
            let path = runtime_paths()?.config_file;
            if path.exists() {
                load_config(&path)?
            } else {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Config::default()
            }
        }
    };
    config.apply_overrides(env);
    Ok(config)
}

// ---------------------------------------------------------------------------
// Runtime paths
// ---------------------------------------------------------------------------

/// Files and directories under `~/.kindred/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePaths {
    /// Root directory.
    pub root: PathBuf,
    /// `config.toml`.
    pub config_file: PathBuf,
    /// `.env` credentials file.
    pub env_file: PathBuf,
    /// Default persisted state.
    pub state_file: PathBuf,
    /// Log directory for the interactive chat.
    pub logs_dir: PathBuf,
}

impl RuntimePaths {
    /// Paths rooted at `root`.
    pub fn under(root: PathBuf) -> Self {
        Self {
            config_file: root.join("config.toml"),
            env_file: root.join(".env"),
            state_file: root.join("state.json"),
            logs_dir: root.join("logs"),
            root,
        }
    }
}

/// Resolve the default config directory (`~/.kindred/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_dir() -> anyhow::Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".kindred"))
}

/// Resolve every runtime path under [`config_dir`].
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn runtime_paths() -> anyhow::Result<RuntimePaths> {
    Ok(RuntimePaths::under(config_dir()?))
}
