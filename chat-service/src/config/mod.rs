use secrecy::Secret;
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::path::PathBuf;

/// Gemini API base URL.
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub gemini: GeminiSettings,
    pub azure: AzureSettings,
    pub storage: StorageConfig,
    /// Timeout applied to every outbound provider request.
    pub provider_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiSettings {
    /// Unset means every Gemini request fails with a "not configured" error.
    pub api_key: Option<Secret<String>>,
    pub model: String,
    pub api_base: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AzureSettings {
    pub endpoint: Option<String>,
    pub api_key: Option<Secret<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// JSON file holding every conversation transcript.
    pub transcript_path: PathBuf,
    /// Directory uploaded files are written into.
    pub upload_dir: PathBuf,
}

impl ChatConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        Ok(ChatConfig {
            common: common_config,
            gemini: GeminiSettings {
                api_key: optional_env("GEMINI_API_KEY").map(Secret::new),
                model: env_or("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
                api_base: env_or("GEMINI_API_BASE", DEFAULT_GEMINI_API_BASE),
            },
            azure: AzureSettings {
                endpoint: optional_env("AZURE_ENDPOINT"),
                api_key: optional_env("AZURE_API_KEY").map(Secret::new),
            },
            storage: StorageConfig {
                transcript_path: env_or("CHAT_STORAGE_FILE", "chat_storage.json").into(),
                upload_dir: env_or("UPLOAD_FOLDER", "uploads").into(),
            },
            provider_timeout_secs: match optional_env("PROVIDER_TIMEOUT_SECS") {
                Some(raw) => raw.parse().map_err(|e| {
                    AppError::ConfigError(anyhow::anyhow!(
                        "PROVIDER_TIMEOUT_SECS must be a whole number of seconds: {}",
                        e
                    ))
                })?,
                None => DEFAULT_PROVIDER_TIMEOUT_SECS,
            },
        })
    }
}

/// Empty values count as unset, matching how `.env` files usually leave blanks.
fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    optional_env(key).unwrap_or_else(|| default.to_string())
}
