//! TOML-based configuration for memchat
//!
//! This module provides declarative configuration for the server, the chat
//! model, the memory service, the write gate, providers and personas via a
//! TOML file (`memchat.toml`). API keys are never written into the file: each
//! provider names the environment variable holding its key.
//!
//! # Hot Reloading
//!
//! Configuration changes are automatically detected and applied at runtime.
//! Use `ConfigManager` for thread-safe access to the current configuration.
//! Personas and per-turn chat settings are read on every request; provider
//! and memory clients are built once at startup.

use arc_swap::ArcSwap;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::chat::TurnSettings;
use crate::llm::{GenerationOptions, Provider};
use crate::memory::classifier::{CLASSIFIER_MAX_TOKENS, CLASSIFIER_TEMPERATURE};
use crate::memory::mem0::{DEFAULT_MEM0_API_BASE, DEFAULT_MEM0_VERSION};
use crate::memory::{GatePolicy, MemoryBackend, DEFAULT_SEARCH_LIMIT};
use crate::types::AppError;

/// Root configuration structure loaded from memchat.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemchatConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub session: SessionConfig,

    pub chat: ChatConfig,

    #[serde(default)]
    pub memory: MemoryConfig,

    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Named LLM provider configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Persona prompts, keyed by the name used to select them
    #[serde(default)]
    pub personas: HashMap<String, PersonaConfig>,
}

// ============= Server Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

// ============= Session Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Reject chat turns until the browser has connected with a name.
    /// When false, `default_user_id` is used for anonymous sessions.
    #[serde(default = "default_true")]
    pub require_identity: bool,

    /// Memory partition used by sessions that never connected
    pub default_user_id: Option<String>,

    /// Greeting returned once per session
    pub welcome: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            require_identity: true,
            default_user_id: None,
            welcome: None,
        }
    }
}

// ============= Chat Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Reference to a provider name defined in [providers]
    pub provider: String,

    /// Overrides the provider's default model
    pub model: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    pub max_tokens: Option<u32>,

    /// Consume completions incrementally even on the blocking endpoint
    #[serde(default)]
    pub stream: bool,

    /// Tell the model who it is talking to
    #[serde(default)]
    pub include_identity: bool,
}

fn default_temperature() -> f32 {
    0.7
}

// ============= Memory Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default)]
    pub backend: MemoryBackend,

    /// Environment variable containing the Mem0 API key
    #[serde(default = "default_mem0_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_mem0_base")]
    pub api_base: String,

    #[serde(default = "default_mem0_version")]
    pub version: String,

    #[serde(default = "default_search_limit")]
    pub search_limit: usize,

    #[serde(default)]
    pub gate: GatePolicy,
}

fn default_mem0_key_env() -> String {
    "MEM0_API_KEY".to_string()
}

fn default_mem0_base() -> String {
    DEFAULT_MEM0_API_BASE.to_string()
}

fn default_mem0_version() -> String {
    DEFAULT_MEM0_VERSION.to_string()
}

fn default_search_limit() -> usize {
    DEFAULT_SEARCH_LIMIT
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: MemoryBackend::default(),
            api_key_env: default_mem0_key_env(),
            api_base: default_mem0_base(),
            version: default_mem0_version(),
            search_limit: default_search_limit(),
            gate: GatePolicy::default(),
        }
    }
}

// ============= Classifier Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Provider for the classification model; defaults to the chat provider
    pub provider: Option<String>,

    /// Overrides the provider's default model
    pub model: Option<String>,

    #[serde(default = "default_classifier_temperature")]
    pub temperature: f32,

    #[serde(default = "default_classifier_max_tokens")]
    pub max_tokens: u32,
}

fn default_classifier_temperature() -> f32 {
    CLASSIFIER_TEMPERATURE
}

fn default_classifier_max_tokens() -> u32 {
    CLASSIFIER_MAX_TOKENS
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            provider: None,
            model: None,
            temperature: default_classifier_temperature(),
            max_tokens: default_classifier_max_tokens(),
        }
    }
}

// ============= Provider Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    /// Any OpenAI-compatible endpoint (OpenAI, Groq, OpenRouter...)
    OpenAI {
        /// Environment variable containing API key
        api_key_env: String,
        #[serde(default = "default_openai_base")]
        api_base: String,
        default_model: String,
    },
    Gemini {
        /// Environment variable containing API key
        api_key_env: String,
        #[serde(default = "default_gemini_base")]
        api_base: String,
        default_model: String,
    },
}

fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_gemini_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

impl ProviderConfig {
    pub fn api_key_env(&self) -> &str {
        match self {
            ProviderConfig::OpenAI { api_key_env, .. }
            | ProviderConfig::Gemini { api_key_env, .. } => api_key_env,
        }
    }
}

// ============= Persona Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersonaConfig {
    /// Display name; defaults to the key
    pub name: Option<String>,

    /// Replaces the memory prompt while the persona is active
    pub system_prompt: String,

    /// Greeting shown when the persona is selected
    pub welcome: Option<String>,
}

// ============= Configuration Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),

    #[error("Provider '{0}' referenced by {1} does not exist")]
    MissingProvider(String, String),

    #[error("Watch error: {0}")]
    WatchError(#[from] notify::Error),
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl MemchatConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config: MemchatConfig = toml::from_str(&content)?;

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration for internal consistency and env var availability
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Chat provider must exist and have its key available
        let chat_provider = self.get_provider(&self.chat.provider).ok_or_else(|| {
            ConfigError::MissingProvider(self.chat.provider.clone(), "[chat]".to_string())
        })?;
        self.validate_env_var(chat_provider.api_key_env())?;

        if !(0.0..=2.0).contains(&self.chat.temperature) {
            return Err(ConfigError::ValidationError(format!(
                "chat.temperature must be between 0 and 2, got {}",
                self.chat.temperature
            )));
        }

        // The classifier is only contacted when the classifier gate is selected
        if self.memory.gate == GatePolicy::Classifier {
            let name = self.classifier_provider_name();
            let provider = self.get_provider(name).ok_or_else(|| {
                ConfigError::MissingProvider(name.to_string(), "[classifier]".to_string())
            })?;
            self.validate_env_var(provider.api_key_env())?;
        }

        if self.memory.backend == MemoryBackend::Mem0 {
            self.validate_env_var(&self.memory.api_key_env)?;
        }

        if self.memory.search_limit == 0 {
            return Err(ConfigError::ValidationError(
                "memory.search_limit must be greater than 0".to_string(),
            ));
        }

        for (key, persona) in &self.personas {
            if persona.system_prompt.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "Persona '{}' has an empty system_prompt",
                    key
                )));
            }
        }

        if !self.session.require_identity && self.session.default_user_id.is_none() {
            warn!("session.require_identity is false but no default_user_id is set; anonymous turns will be rejected");
        }

        Ok(())
    }

    fn validate_env_var(&self, name: &str) -> Result<(), ConfigError> {
        std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))?;
        Ok(())
    }

    /// Get a resolved value from an env var reference
    pub fn resolve_env(&self, env_name: &str) -> Option<String> {
        std::env::var(env_name).ok()
    }

    /// Get provider by name
    pub fn get_provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name)
    }

    /// Get persona by key
    pub fn get_persona(&self, key: &str) -> Option<&PersonaConfig> {
        self.personas.get(key)
    }

    fn classifier_provider_name(&self) -> &str {
        self.classifier
            .provider
            .as_deref()
            .unwrap_or(&self.chat.provider)
    }

    /// Resolve a named provider into a ready-to-build [`Provider`]
    pub fn provider(&self, name: &str, model: Option<&str>) -> Result<Provider, ConfigError> {
        let config = self
            .get_provider(name)
            .ok_or_else(|| ConfigError::MissingProvider(name.to_string(), "lookup".to_string()))?;
        let api_key = self
            .resolve_env(config.api_key_env())
            .ok_or_else(|| ConfigError::MissingEnvVar(config.api_key_env().to_string()))?;

        Ok(match config {
            ProviderConfig::OpenAI {
                api_base,
                default_model,
                ..
            } => Provider::OpenAI {
                api_key,
                api_base: api_base.clone(),
                model: model.unwrap_or(default_model).to_string(),
            },
            ProviderConfig::Gemini {
                api_base,
                default_model,
                ..
            } => Provider::Gemini {
                api_key,
                api_base: api_base.clone(),
                model: model.unwrap_or(default_model).to_string(),
            },
        })
    }

    /// The provider answering chat turns
    pub fn chat_provider(&self) -> Result<Provider, ConfigError> {
        self.provider(&self.chat.provider, self.chat.model.as_deref())
    }

    /// The provider classifying messages for the classifier gate
    pub fn classifier_provider(&self) -> Result<Provider, ConfigError> {
        self.provider(
            self.classifier_provider_name(),
            self.classifier.model.as_deref(),
        )
    }

    /// Sampling options for the classifier call
    pub fn classifier_options(&self) -> GenerationOptions {
        GenerationOptions::new(self.classifier.temperature)
            .with_max_tokens(self.classifier.max_tokens)
    }

    /// The Mem0 API key from the environment
    pub fn mem0_api_key(&self) -> Result<String, ConfigError> {
        self.resolve_env(&self.memory.api_key_env)
            .ok_or_else(|| ConfigError::MissingEnvVar(self.memory.api_key_env.clone()))
    }

    /// Per-turn settings derived from `[chat]` and `[session]`
    pub fn turn_settings(&self) -> TurnSettings {
        TurnSettings {
            default_user_id: if self.session.require_identity {
                None
            } else {
                self.session.default_user_id.clone()
            },
            temperature: Some(self.chat.temperature),
            max_tokens: self.chat.max_tokens,
            stream: self.chat.stream,
            include_identity: self.chat.include_identity,
        }
    }
}

// ============= Hot Reloading Configuration Manager =============

/// Thread-safe configuration manager with hot reloading support
pub struct ConfigManager {
    config: Arc<ArcSwap<MemchatConfig>>,
    config_path: PathBuf,
    watcher: RwLock<Option<RecommendedWatcher>>,
}

impl ConfigManager {
    /// Create a new configuration manager and load the initial config
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        // Convert to absolute path for reliable file watching
        let path = path.as_ref();
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(ConfigError::ReadError)?
                .join(path)
        };

        let config = MemchatConfig::load(&path)?;

        Ok(Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            config_path: path,
            watcher: RwLock::new(None),
        })
    }

    /// Create a config manager directly from a config (useful for testing)
    /// This won't have file watching capabilities.
    pub fn from_config(config: MemchatConfig) -> Self {
        Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            config_path: PathBuf::from("memchat.toml"),
            watcher: RwLock::new(None),
        }
    }

    /// Get the current configuration (lockless read)
    pub fn config(&self) -> Arc<MemchatConfig> {
        self.config.load_full()
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Manually reload the configuration from disk
    pub fn reload(&self) -> Result<(), ConfigError> {
        info!("Reloading configuration from {:?}", self.config_path);

        let new_config = MemchatConfig::load(&self.config_path)?;
        self.config.store(Arc::new(new_config));

        info!("Configuration reloaded successfully");
        Ok(())
    }

    /// Start watching for configuration file changes
    ///
    /// The reload task ends once the watcher is dropped with the manager.
    pub fn start_watching(&mut self) -> Result<(), ConfigError> {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();

        let config_path = self.config_path.clone();
        let config_arc = Arc::clone(&self.config);
        let file_name = self.config_path.file_name().map(|n| n.to_os_string());

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) => {
                    let touches_config = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                    if touches_config && (event.kind.is_modify() || event.kind.is_create()) {
                        // Debounced in the receiver
                        let _ = tx.send(());
                    }
                }
                Err(e) => {
                    error!("Config watcher error: {:?}", e);
                }
            }
        })?;

        // Editors replace files on save, so watch the directory
        if let Some(parent) = self.config_path.parent() {
            watcher.watch(parent, RecursiveMode::NonRecursive)?;
        }

        *self.watcher.write() = Some(watcher);

        tokio::spawn(async move {
            let mut last_reload: Option<std::time::Instant> = None;
            let debounce_duration = Duration::from_millis(500);

            while rx.recv().await.is_some() {
                if last_reload.is_some_and(|t| t.elapsed() < debounce_duration) {
                    continue;
                }

                // Wait a bit for file write to complete
                tokio::time::sleep(Duration::from_millis(100)).await;

                match MemchatConfig::load(&config_path) {
                    Ok(new_config) => {
                        config_arc.store(Arc::new(new_config));
                        info!("Configuration hot-reloaded successfully");
                        last_reload = Some(std::time::Instant::now());
                    }
                    Err(e) => {
                        warn!(
                            "Failed to hot-reload config: {}. Keeping previous config.",
                            e
                        );
                    }
                }
            }
        });

        info!("Configuration hot-reload watcher started");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_test_keys() {
        std::env::set_var("MEMCHAT_TEST_GROQ_KEY", "gsk-test");
        std::env::set_var("MEMCHAT_TEST_MEM0_KEY", "m0-test");
    }

    fn create_test_config() -> String {
        r#"
[server]
host = "127.0.0.1"
port = 3000
log_level = "debug"

[session]
require_identity = false
default_user_id = "Soban"

[chat]
provider = "groq"
temperature = 0.7

[memory]
api_key_env = "MEMCHAT_TEST_MEM0_KEY"
gate = "classifier"

[providers.groq]
type = "openai"
api_key_env = "MEMCHAT_TEST_GROQ_KEY"
api_base = "https://api.groq.com/openai/v1"
default_model = "moonshotai/kimi-k2-instruct"

[personas.chef]
name = "Chef"
system_prompt = "You are a chef. Only discuss cooking."
welcome = "What are we cooking?"
"#
        .to_string()
    }

    #[test]
    fn test_parse_config() {
        set_test_keys();

        let config: MemchatConfig =
            toml::from_str(&create_test_config()).expect("Failed to parse config");
        config.validate().unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.log_format, LogFormat::Pretty);
        assert_eq!(config.memory.gate, GatePolicy::Classifier);
        assert_eq!(config.memory.backend, MemoryBackend::Mem0);
        assert_eq!(config.memory.search_limit, 5);
        assert!(config.get_persona("chef").is_some());
    }

    #[test]
    fn test_defaults() {
        let config: MemchatConfig = toml::from_str(
            r#"
[chat]
provider = "groq"
"#,
        )
        .unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert!(config.session.require_identity);
        assert_eq!(config.chat.temperature, 0.7);
        assert_eq!(config.memory.api_base, "https://api.mem0.ai");
        assert_eq!(config.memory.version, "v2");
        assert_eq!(config.memory.gate, GatePolicy::Keyword);
        assert_eq!(config.classifier.temperature, 0.0);
        assert_eq!(config.classifier.max_tokens, 20);
    }

    #[test]
    fn test_validation_missing_chat_provider() {
        let config: MemchatConfig = toml::from_str(
            r#"
[chat]
provider = "nonexistent"
[memory]
backend = "local"
"#,
        )
        .unwrap();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingProvider(_, _))
        ));
    }

    #[test]
    fn test_validation_missing_env_var() {
        let config: MemchatConfig = toml::from_str(
            r#"
[chat]
provider = "groq"
[memory]
backend = "local"
[providers.groq]
type = "openai"
api_key_env = "MEMCHAT_TEST_UNSET_KEY"
default_model = "m"
"#,
        )
        .unwrap();

        match config.validate() {
            Err(ConfigError::MissingEnvVar(name)) => assert_eq!(name, "MEMCHAT_TEST_UNSET_KEY"),
            other => panic!("expected MissingEnvVar, got {:?}", other),
        }
    }

    #[test]
    fn test_validation_zero_search_limit() {
        set_test_keys();
        let mut config: MemchatConfig = toml::from_str(&create_test_config()).unwrap();
        config.memory.search_limit = 0;

        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_chat_provider_resolution() {
        set_test_keys();
        let config: MemchatConfig = toml::from_str(&create_test_config()).unwrap();

        let provider = config.chat_provider().unwrap();
        assert_eq!(provider.name(), "OpenAI");
        assert_eq!(provider.model(), "moonshotai/kimi-k2-instruct");

        // Classifier falls back to the chat provider
        let classifier = config.classifier_provider().unwrap();
        assert_eq!(classifier.model(), "moonshotai/kimi-k2-instruct");
    }

    #[test]
    fn test_turn_settings_honour_require_identity() {
        set_test_keys();
        let mut config: MemchatConfig = toml::from_str(&create_test_config()).unwrap();
        assert_eq!(
            config.turn_settings().default_user_id.as_deref(),
            Some("Soban")
        );

        config.session.require_identity = true;
        assert!(config.turn_settings().default_user_id.is_none());
    }

    #[test]
    fn test_config_manager_from_config() {
        set_test_keys();
        let config: MemchatConfig = toml::from_str(&create_test_config()).unwrap();
        let manager = ConfigManager::from_config(config);

        assert_eq!(manager.config().chat.provider, "groq");
        assert_eq!(manager.config().server.port, 3000);
    }

    #[test]
    fn test_load_and_reload_from_file() {
        set_test_keys();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memchat.toml");
        fs::write(&path, create_test_config()).unwrap();

        let manager = ConfigManager::new(&path).unwrap();
        assert_eq!(manager.config().server.port, 3000);

        fs::write(&path, create_test_config().replace("port = 3000", "port = 4000")).unwrap();
        manager.reload().unwrap();
        assert_eq!(manager.config().server.port, 4000);
    }

    #[test]
    fn test_load_missing_file() {
        let result = MemchatConfig::load("/nonexistent/memchat.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }
}
