//! Process configuration, read once at startup and passed down explicitly.

mod env;

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::infra::llm::{gemini, openai};

use env::{
    process_env_lookup, read_timeout, read_var, resolve_timeout_with_global_fallback, split_csv,
};

pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const DEFAULT_PROVIDER_ENV: &str = "DEFAULT_LLM_PROVIDER";
pub const AUTO_PROVIDER_ORDER_ENV: &str = "AUTO_PROVIDER_ORDER";
pub const GEMINI_MODEL_ENV: &str = "GEMINI_MODEL";
pub const OPENAI_MODEL_ENV: &str = "OPENAI_MODEL";
pub const GEMINI_BASE_URL_ENV: &str = "GEMINI_BASE_URL";
pub const OPENAI_BASE_URL_ENV: &str = "OPENAI_BASE_URL";
pub const GEMINI_TIMEOUT_ENV: &str = "GEMINI_TIMEOUT_SECS";
pub const OPENAI_TIMEOUT_ENV: &str = "OPENAI_TIMEOUT_SECS";
pub const LLM_TIMEOUT_ENV: &str = "LLM_TIMEOUT_SECS";
pub const CORS_ALLOW_ORIGINS_ENV: &str = "CORS_ALLOW_ORIGINS";

pub const DEFAULT_PROVIDER: &str = "auto";
pub const DEFAULT_AUTO_PROVIDER_ORDER: &str = "gemini,openai";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_CORS_ALLOW_ORIGINS: &str = "http://localhost:5173,http://127.0.0.1:5173";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("{name} {reason}")]
    Invalid { name: String, reason: String },
    #[error("failed to load env file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
}

impl SettingsError {
    pub(crate) fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl ProviderSettings {
    /// The API key when one is set. A provider is configured exactly when this is `Some`;
    /// blank values were already dropped while loading.
    pub fn configured_api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub gemini: ProviderSettings,
    pub openai: ProviderSettings,
    /// Raw value; the router normalizes it.
    pub default_provider: String,
    /// Raw comma-separated preference; the router normalizes it.
    pub auto_provider_order: String,
    pub cors_allow_origins: Vec<String>,
}

impl Settings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(process_env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let global_timeout = || read_timeout(&lookup, LLM_TIMEOUT_ENV);

        let gemini = ProviderSettings {
            api_key: read_var(&lookup, GEMINI_API_KEY_ENV),
            model: read_var(&lookup, GEMINI_MODEL_ENV)
                .unwrap_or_else(|| gemini::DEFAULT_MODEL.to_string()),
            base_url: read_var(&lookup, GEMINI_BASE_URL_ENV)
                .unwrap_or_else(|| gemini::DEFAULT_BASE_URL.to_string()),
            timeout: resolve_timeout_with_global_fallback(
                read_timeout(&lookup, GEMINI_TIMEOUT_ENV)?,
                global_timeout,
                DEFAULT_TIMEOUT,
            )?,
        };

        let openai = ProviderSettings {
            api_key: read_var(&lookup, OPENAI_API_KEY_ENV),
            model: read_var(&lookup, OPENAI_MODEL_ENV)
                .unwrap_or_else(|| openai::DEFAULT_MODEL.to_string()),
            base_url: read_var(&lookup, OPENAI_BASE_URL_ENV)
                .unwrap_or_else(|| openai::DEFAULT_BASE_URL.to_string()),
            timeout: resolve_timeout_with_global_fallback(
                read_timeout(&lookup, OPENAI_TIMEOUT_ENV)?,
                global_timeout,
                DEFAULT_TIMEOUT,
            )?,
        };

        let cors_allow_origins = split_csv(
            &read_var(&lookup, CORS_ALLOW_ORIGINS_ENV)
                .unwrap_or_else(|| DEFAULT_CORS_ALLOW_ORIGINS.to_string()),
        );

        Ok(Self {
            gemini,
            openai,
            default_provider: read_var(&lookup, DEFAULT_PROVIDER_ENV)
                .unwrap_or_else(|| DEFAULT_PROVIDER.to_string()),
            auto_provider_order: read_var(&lookup, AUTO_PROVIDER_ORDER_ENV)
                .unwrap_or_else(|| DEFAULT_AUTO_PROVIDER_ORDER.to_string()),
            cors_allow_origins,
        })
    }
}

/// Loads `KEY=value` pairs from `path` into the process environment without
/// overriding variables that are already set. Returns `false` when the file is absent.
pub fn load_env_file(path: &Path) -> Result<bool, SettingsError> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(true),
        Err(err) if err.not_found() => Ok(false),
        Err(source) => Err(SettingsError::EnvFile {
            path: path.to_path_buf(),
            source,
        }),
    }
}
