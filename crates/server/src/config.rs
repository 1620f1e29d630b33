use shared_types::{AppConfig, FeatureFlags};
use std::sync::OnceLock;
use std::time::Duration;

use crate::keys::ApiKeySet;

static FLAGS: OnceLock<FeatureFlags> = OnceLock::new();

/// Path to the config file, relative to the working directory.
const CONFIG_PATH: &str = "config.toml";

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_GOOGLE_API_URL: &str = "https://www.googleapis.com/customsearch/v1";
pub const DEFAULT_OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_OPENROUTER_MODEL: &str = "openai/gpt-4o-mini";

const DEFAULT_SEARCH_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CHAT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_WEB_SEARCH_TIMEOUT_SECS: u64 = 10;

/// Read `config.toml`, parse feature flags, and store them in the global
/// `OnceLock`. Only the first call has effect.
///
/// If the file is missing or unparseable, all flags default to `false`.
pub fn load_feature_flags() {
    FLAGS.get_or_init(|| match std::fs::read_to_string(CONFIG_PATH) {
        Ok(contents) => {
            let config: AppConfig = toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!(path = CONFIG_PATH, error = %e, "Failed to parse config, defaulting all flags off");
                AppConfig::default()
            });
            tracing::info!(flags = ?config.features, "Feature flags loaded");
            config.features
        }
        Err(e) => {
            tracing::info!(path = CONFIG_PATH, error = %e, "Config file not found, defaulting all flags off");
            FeatureFlags::default()
        }
    });
}

/// Get the loaded feature flags. Returns all-false defaults if
/// `load_feature_flags()` hasn't been called yet.
pub fn feature_flags() -> &'static FeatureFlags {
    static DEFAULT: FeatureFlags = FeatureFlags {
        telemetry: false,
        docs: false,
    };
    FLAGS.get().unwrap_or(&DEFAULT)
}

#[derive(Clone)]
pub struct WhatsMyNameConfig {
    pub api_url: String,
    pub api_key: String,
}

impl std::fmt::Debug for WhatsMyNameConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhatsMyNameConfig")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub api_url: String,
    pub keys: ApiKeySet,
    pub cse_id: String,
}

#[derive(Clone)]
pub struct OpenRouterConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub system_prompt: Option<String>,
}

impl std::fmt::Debug for OpenRouterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterConfig")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("system_prompt", &self.system_prompt.is_some())
            .finish_non_exhaustive()
    }
}

/// Process configuration read once at startup.
///
/// An upstream whose required settings are absent is `None`; its routes
/// answer with a configuration error and health reports it unavailable.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub environment: String,
    pub whatsmyname: Option<WhatsMyNameConfig>,
    pub google: Option<GoogleConfig>,
    pub openrouter: Option<OpenRouterConfig>,
    pub search_timeout: Duration,
    pub chat_timeout: Duration,
    /// Applied to each key attempt separately.
    pub web_search_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl ServerConfig {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let secs = |name: &str, default: u64| {
            let value = var(name).and_then(|raw| match raw.parse::<u64>() {
                Ok(n) if n > 0 => Some(n),
                _ => {
                    tracing::warn!(var = name, value = %raw, default, "Invalid timeout, using default");
                    None
                }
            });
            Duration::from_secs(value.unwrap_or(default))
        };

        let whatsmyname = match (var("WHATSMYNAME_API_URL"), var("WHATSMYNAME_API_KEY")) {
            (Some(api_url), Some(api_key)) => Some(WhatsMyNameConfig { api_url, api_key }),
            _ => None,
        };

        let keys = var("GOOGLE_API_KEYS")
            .or_else(|| var("GOOGLE_API_KEY"))
            .map(|raw| ApiKeySet::parse(&raw))
            .unwrap_or_default();
        let google = match var("GOOGLE_CSE_ID") {
            Some(cse_id) if !keys.is_empty() => Some(GoogleConfig {
                api_url: var("GOOGLE_API_URL").unwrap_or_else(|| DEFAULT_GOOGLE_API_URL.to_string()),
                keys,
                cse_id,
            }),
            _ => None,
        };

        let openrouter = var("OPENROUTER_API_KEY").map(|api_key| OpenRouterConfig {
            api_url: var("OPENROUTER_API_URL")
                .unwrap_or_else(|| DEFAULT_OPENROUTER_API_URL.to_string()),
            api_key,
            model: var("OPENROUTER_MODEL").unwrap_or_else(|| DEFAULT_OPENROUTER_MODEL.to_string()),
            system_prompt: var("CHAT_SYSTEM_PROMPT"),
        });

        Self {
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            environment: var("DEPLOY_ENV").unwrap_or_else(|| "development".to_string()),
            whatsmyname,
            google,
            openrouter,
            search_timeout: secs("SEARCH_TIMEOUT_SECS", DEFAULT_SEARCH_TIMEOUT_SECS),
            chat_timeout: secs("CHAT_TIMEOUT_SECS", DEFAULT_CHAT_TIMEOUT_SECS),
            web_search_timeout: secs("WEB_SEARCH_TIMEOUT_SECS", DEFAULT_WEB_SEARCH_TIMEOUT_SECS),
        }
    }

    /// Production and staging hide internal error text from clients.
    pub fn is_production_like(&self) -> bool {
        matches!(
            self.environment.to_ascii_lowercase().as_str(),
            "production" | "prod" | "staging"
        )
    }
}
