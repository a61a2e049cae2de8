//! `listcart.toml` configuration.
//!
//! # Example
//!
//! ```toml
//! [assistant]
//! enabled = true
//! api_key_env = "NVIDIA_API_KEY"
//! chat_model = "meta/llama-3.1-8b-instruct"
//!
//! [catalog]
//! location_id = "01400943"
//! token_env = "KROGER_ACCESS_TOKEN"
//! # fixture = "catalog.json"   # offline: search a local product list
//!
//! [pipeline]
//! concurrent_resolution = false
//!
//! [logging]
//! level = "warn"
//! ```
//!
//! Every key is optional. Secrets are only ever read from the environment
//! variables named here.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use listcart_connect::{kroger, nim, KrogerConfig};
use listcart_core::{OrderConfig, ResolutionMode, SEARCH_LIMIT};

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "listcart.toml";

// ── Types ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub assistant: AssistantSettings,
    pub catalog: CatalogSettings,
    pub pipeline: PipelineSettings,
    pub logging: LoggingSettings,
}

/// `[assistant]` section: the generative-text oracle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantSettings {
    pub enabled: bool,
    pub base_url: String,
    pub chat_model: String,
    pub vision_model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: nim::DEFAULT_BASE_URL.to_string(),
            chat_model: nim::DEFAULT_CHAT_MODEL.to_string(),
            vision_model: nim::DEFAULT_VISION_MODEL.to_string(),
            api_key_env: "NVIDIA_API_KEY".to_string(),
            timeout_secs: 60,
        }
    }
}

/// `[catalog]` section: product search and cart service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    pub base_url: String,
    pub location_id: String,
    pub search_limit: usize,
    /// Name of the environment variable holding the bearer token.
    pub token_env: String,
    /// JSON product list searched instead of the live service.
    pub fixture: Option<PathBuf>,
    pub timeout_secs: u64,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            base_url: kroger::DEFAULT_BASE_URL.to_string(),
            location_id: "01400943".to_string(),
            search_limit: SEARCH_LIMIT,
            token_env: "KROGER_ACCESS_TOKEN".to_string(),
            fixture: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Search all names at once instead of one after another.
    pub concurrent_resolution: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl Config {
    pub fn order_config(&self) -> OrderConfig {
        OrderConfig {
            location_id: self.catalog.location_id.clone(),
            search_limit: self.catalog.search_limit,
            resolution_mode: if self.pipeline.concurrent_resolution {
                ResolutionMode::Concurrent
            } else {
                ResolutionMode::Sequential
            },
        }
    }

    pub fn nim_config(&self, api_key: String) -> nim::NimConfig {
        nim::NimConfig {
            api_key,
            base_url: self.assistant.base_url.clone(),
            chat_model: self.assistant.chat_model.clone(),
            vision_model: self.assistant.vision_model.clone(),
            timeout: Duration::from_secs(self.assistant.timeout_secs),
        }
    }

    pub fn kroger_config(&self) -> KrogerConfig {
        KrogerConfig {
            base_url: self.catalog.base_url.clone(),
            timeout: Duration::from_secs(self.catalog.timeout_secs),
        }
    }
}

// ── Functions ─────────────────────────────────────────────────────────────────

/// Load configuration from `path`, or from [`DEFAULT_CONFIG_FILE`] when it
/// exists, or fall back to defaults.
///
/// A relative `fixture` path is resolved against the config file's directory.
pub fn load_config(path: Option<&Path>) -> Result<Config, String> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !default.exists() {
                return Ok(Config::default());
            }
            default
        }
    };

    let content = std::fs::read_to_string(&path)
        .map_err(|e| format!("could not read '{}': {}", path.display(), e))?;
    let mut config: Config = toml::from_str(&content)
        .map_err(|e| format!("could not parse '{}': {}", path.display(), e))?;

    if let Some(fixture) = &config.catalog.fixture {
        if fixture.is_relative() {
            if let Some(dir) = path.parent() {
                config.catalog.fixture = Some(dir.join(fixture));
            }
        }
    }
    Ok(config)
}
