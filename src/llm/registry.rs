//! Provider selection from environment configuration

use super::{GeminiService, LlmService, LoggingService, OllamaService};
use std::fmt;
use std::sync::Arc;

const DEFAULT_GEMINI_MODEL: &str = "gemini-flash-latest";
const DEFAULT_OLLAMA_MODEL: &str = "llama3";
const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Supported LLM backends
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    Google,
    Ollama,
    /// Unrecognized `LLM_PROVIDER` value
    Unknown(String),
}

impl Provider {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "google" | "gemini" => Provider::Google,
            "ollama" => Provider::Ollama,
            other => Provider::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Google => f.write_str("google"),
            Provider::Ollama => f.write_str("ollama"),
            Provider::Unknown(name) => write!(f, "unknown({name})"),
        }
    }
}

/// Configuration for LLM providers
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: Provider,
    pub google_api_key: Option<String>,
    pub gemini_model: String,
    pub ollama_model: String,
    pub ollama_base_url: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Google,
            google_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            ollama_model: DEFAULT_OLLAMA_MODEL.to_string(),
            ollama_base_url: DEFAULT_OLLAMA_BASE_URL.to_string(),
        }
    }
}

impl LlmConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            provider: std::env::var("LLM_PROVIDER")
                .map_or(defaults.provider, |p| Provider::parse(&p)),
            google_api_key: std::env::var("GOOGLE_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            gemini_model: std::env::var("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            ollama_model: std::env::var("OLLAMA_MODEL").unwrap_or(defaults.ollama_model),
            ollama_base_url: std::env::var("OLLAMA_BASE_URL")
                .unwrap_or(defaults.ollama_base_url),
        }
    }
}

/// Holds the configured model, if any
pub struct ModelRegistry {
    provider: Provider,
    service: Option<Arc<dyn LlmService>>,
}

impl ModelRegistry {
    /// Create an empty registry for testing purposes
    #[allow(dead_code)] // Used in tests
    pub fn new_empty() -> Self {
        Self {
            provider: Provider::Google,
            service: None,
        }
    }

    pub fn new(config: &LlmConfig) -> Self {
        let service = Self::try_create(config).map(|service| {
            Arc::new(LoggingService::new(service)) as Arc<dyn LlmService>
        });
        Self {
            provider: config.provider.clone(),
            service,
        }
    }

    fn try_create(config: &LlmConfig) -> Option<Arc<dyn LlmService>> {
        let created = match &config.provider {
            Provider::Google => {
                let Some(key) = config.google_api_key.clone() else {
                    tracing::warn!("GOOGLE_API_KEY not set; generation is disabled");
                    return None;
                };
                GeminiService::new(key, &config.gemini_model)
                    .map(|s| Arc::new(s) as Arc<dyn LlmService>)
            }
            Provider::Ollama => {
                OllamaService::new(&config.ollama_base_url, &config.ollama_model)
                    .map(|s| Arc::new(s) as Arc<dyn LlmService>)
            }
            Provider::Unknown(name) => {
                tracing::warn!(provider = %name, "Unknown LLM_PROVIDER; use 'google' or 'ollama'");
                return None;
            }
        };

        match created {
            Ok(service) => Some(service),
            Err(e) => {
                tracing::error!(error = %e, provider = %config.provider, "Failed to initialize LLM provider");
                None
            }
        }
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    /// Get the configured model
    pub fn default(&self) -> Option<Arc<dyn LlmService>> {
        self.service.clone()
    }

    pub fn has_models(&self) -> bool {
        self.service.is_some()
    }

    pub fn default_model_id(&self) -> &str {
        self.service.as_ref().map_or("none", |s| s.model_id())
    }
}
