//! Configuration management
//!
//! This module handles loading, validation, and management of the concierge
//! configuration. Configuration is stored in TOML format at
//! ~/.concierge/config.toml and created with defaults on first run.
//!
//! # Configuration Sections
//!
//! - **core**: log level, data directory
//! - **llm**: provider selection and per-provider settings
//! - **workflow**: session budget, exit keywords, enabled task agents
//! - **services**: RAG, pricing and diagram-render backends
//! - **gateway**: HTTP listener address
//!
//! Every section and field has a default, so a partial file is valid.
//!
//! # Examples
//!
//! ```no_run
//! use concierge_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//! println!("Provider: {}", config.llm.provider);
//! println!("Session budget: {}s", config.workflow.timeout_secs);
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use sdk::types::TaskKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub core: CoreConfig,

    #[serde(default)]
    pub llm: LLMConfig,

    #[serde(default)]
    pub workflow: WorkflowConfig,

    #[serde(default)]
    pub services: ServicesConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Data directory path (supports ~ expansion); reports are written here
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Provider every agent uses (openai, ollama)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Per-request HTTP timeout
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub openai: OpenAIConfig,

    #[serde(default)]
    pub ollama: OllamaConfig,
}

/// OpenAI provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    #[serde(default = "default_openai_model")]
    pub model: String,

    /// Environment variable holding the API key; the key itself never
    /// lives in the config file
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

/// Ollama provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,

    #[serde(default = "default_ollama_model")]
    pub model: String,
}

/// Orchestration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Wall-clock budget for a whole session, including waits for input
    #[serde(default = "default_workflow_timeout")]
    pub timeout_secs: u64,

    /// Words that end the session when typed at the concierge
    #[serde(default = "default_exit_keywords")]
    pub exit_keywords: Vec<String>,

    /// Task agents the orchestrator may dispatch to
    #[serde(default = "default_agents")]
    pub agents: Vec<TaskKind>,

    /// Route diagram requests through RAG search first when no search
    /// result is in the session yet
    #[serde(default)]
    pub diagram_requires_research: bool,

    /// Context window kept per agent, in estimated tokens
    #[serde(default = "default_memory_tokens")]
    pub memory_tokens: usize,
}

/// External collaborator endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    /// RAG search endpoint (`POST {"query"}`)
    #[serde(default = "default_rag_url")]
    pub rag_url: String,

    /// Price catalog base URL (`GET /services?query=`, `GET /price?service=`)
    #[serde(default = "default_pricing_url")]
    pub pricing_url: String,

    /// Interpreter used to execute generated diagram code
    #[serde(default = "default_python")]
    pub python: String,

    /// Scratch directory for generated code and rendered diagrams
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Seconds a single render may run before it is killed
    #[serde(default = "default_render_timeout")]
    pub render_timeout_secs: u64,
}

/// HTTP gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_host")]
    pub host: String,

    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Seconds without a request after which a session is dropped
    #[serde(default = "default_gateway_idle_secs")]
    pub idle_secs: u64,

    /// Live sessions kept at once; the least recently used goes first
    #[serde(default = "default_gateway_max_sessions")]
    pub max_sessions: usize,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("~/.concierge")
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_request_timeout() -> u64 {
    120
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_workflow_timeout() -> u64 {
    1200
}

fn default_exit_keywords() -> Vec<String> {
    vec!["exit".to_string(), "quit".to_string(), "bye".to_string()]
}

fn default_agents() -> Vec<TaskKind> {
    vec![
        TaskKind::TextToDiagram,
        TaskKind::TextToRag,
        TaskKind::PriceLookup,
        TaskKind::Report,
    ]
}

fn default_memory_tokens() -> usize {
    8000
}

fn default_rag_url() -> String {
    "http://localhost:8000/rag".to_string()
}

fn default_pricing_url() -> String {
    "http://localhost:8000/prices".to_string()
}

fn default_python() -> String {
    "python3".to_string()
}

fn default_work_dir() -> PathBuf {
    PathBuf::from("~/.concierge/work")
}

fn default_render_timeout() -> u64 {
    60
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    3000
}

fn default_gateway_idle_secs() -> u64 {
    1800
}

fn default_gateway_max_sessions() -> usize {
    256
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            data_dir: default_data_dir(),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            request_timeout_secs: default_request_timeout(),
            openai: OpenAIConfig::default(),
            ollama: OllamaConfig::default(),
        }
    }
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_openai_model(),
            api_key_env: default_api_key_env(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
            model: default_ollama_model(),
        }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_workflow_timeout(),
            exit_keywords: default_exit_keywords(),
            agents: default_agents(),
            diagram_requires_research: false,
            memory_tokens: default_memory_tokens(),
        }
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            rag_url: default_rag_url(),
            pricing_url: default_pricing_url(),
            python: default_python(),
            work_dir: default_work_dir(),
            render_timeout_secs: default_render_timeout(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            idle_secs: default_gateway_idle_secs(),
            max_sessions: default_gateway_max_sessions(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.concierge/config.toml)
    ///
    /// If the configuration file doesn't exist, a default one is written.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or written, TOML parsing
    /// fails, or validation fails.
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration text
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save it to `path`
    pub fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        // Serialize before processing so the file keeps the portable ~ paths
        let config = Self::default();
        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        let mut config = config;
        config.validate_and_process()?;
        Ok(config)
    }

    /// Get the default configuration file path (~/.concierge/config.toml)
    pub fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".concierge").join("config.toml"))
    }

    /// Validate and process configuration
    ///
    /// This method:
    /// - Validates enumerated and numeric fields
    /// - Normalizes exit keywords to lowercase
    /// - Expands ~ in paths and creates the data and work directories
    fn validate_and_process(&mut self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        let valid_providers = ["openai", "ollama"];
        if !valid_providers.contains(&self.llm.provider.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid provider '{}'. Must be one of: {}",
                self.llm.provider,
                valid_providers.join(", ")
            )));
        }

        if self.llm.request_timeout_secs == 0 {
            return Err(EngineError::Config(
                "llm.request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.workflow.timeout_secs == 0 {
            return Err(EngineError::Config(
                "workflow.timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.services.render_timeout_secs == 0 {
            return Err(EngineError::Config(
                "services.render_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.gateway.idle_secs == 0 || self.gateway.max_sessions == 0 {
            return Err(EngineError::Config(
                "gateway.idle_secs and gateway.max_sessions must be greater than 0".to_string(),
            ));
        }

        if self.workflow.agents.is_empty() {
            return Err(EngineError::Config(
                "workflow.agents must enable at least one task agent".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = self.workflow.agents.iter().find(|kind| !seen.insert(**kind)) {
            return Err(EngineError::Config(format!(
                "workflow.agents lists '{}' more than once",
                dup
            )));
        }

        if self.workflow.diagram_requires_research
            && self.workflow.agents.contains(&TaskKind::TextToDiagram)
            && !self.workflow.agents.contains(&TaskKind::TextToRag)
        {
            return Err(EngineError::Config(
                "workflow.diagram_requires_research needs the text_to_rag agent enabled"
                    .to_string(),
            ));
        }

        self.workflow.exit_keywords = self
            .workflow
            .exit_keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();

        self.core.data_dir = expand_path(&self.core.data_dir)?;
        ensure_dir(&self.core.data_dir, "data")?;

        self.services.work_dir = expand_path(&self.services.work_dir)?;
        ensure_dir(&self.services.work_dir, "work")?;

        Ok(())
    }
}

fn ensure_dir(path: &Path, label: &str) -> Result<(), EngineError> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(|e| {
            EngineError::Config(format!("Failed to create {} directory: {}", label, e))
        })?;
    }
    Ok(())
}

/// Expand ~ in path to user's home directory
pub fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}
