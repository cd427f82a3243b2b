//! Runtime configuration
//!
//! Everything except the log level comes from the environment (and an
//! optional `.env` file loaded at startup).

use crate::knowledge::SearchConfig;
use crate::llm::OpenAIModel;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_LEDGER_PATH: &str = "card_states.json";
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_PORT: u16 = 8501;
const DEFAULT_MODEL: &str = "gpt-4";
const DEFAULT_EMBEDDING_CACHE: &str = ".fastembed_cache";
const DEFAULT_SEARCH_INDEX: &str = "cardassist-index";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// `CardAssist` card management and knowledge assistant
#[derive(Parser, Debug)]
#[command(name = "cardassist", version, about, long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    #[value(name = "DEBUG")]
    Debug,
    #[value(name = "INFO")]
    Info,
    #[value(name = "WARNING")]
    Warning,
    #[value(name = "ERROR")]
    Error,
    #[value(name = "CRITICAL")]
    Critical,
}

impl LogLevel {
    /// `CRITICAL` has no tracing counterpart and maps to `ERROR`
    pub fn as_tracing(self) -> tracing::Level {
        match self {
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warning => tracing::Level::WARN,
            LogLevel::Error | LogLevel::Critical => tracing::Level::ERROR,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is required but not set")]
    Missing(&'static str),
    #[error("Unsupported model {0:?}")]
    UnknownModel(String),
    #[error("Invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

/// Settings for the `OpenAI` client
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: String,
    pub model: OpenAIModel,
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub ledger_path: PathBuf,
    pub log_dir: PathBuf,
    /// Where the local embedding model is downloaded and cached
    pub embedding_cache: PathBuf,
    pub port: u16,
    pub llm: LlmSettings,
    pub search: SearchConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let port = match get("CARDASSIST_PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "CARDASSIST_PORT",
                value: raw,
            })?,
            None => DEFAULT_PORT,
        };

        let model_id = get("CARDASSIST_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let model =
            OpenAIModel::from_id(&model_id).ok_or(ConfigError::UnknownModel(model_id))?;

        let llm = LlmSettings {
            api_key: require("OPENAI_API_KEY")?,
            model,
            base_url: get("OPENAI_BASE_URL")
                .unwrap_or_else(|| crate::llm::DEFAULT_BASE_URL.to_string()),
            timeout: REQUEST_TIMEOUT,
        };

        let search = SearchConfig {
            endpoint: require("AZURE_SEARCH_ENDPOINT")?,
            api_key: require("AZURE_SEARCH_API_KEY")?,
            index: get("AZURE_SEARCH_INDEX").unwrap_or_else(|| DEFAULT_SEARCH_INDEX.to_string()),
            timeout: REQUEST_TIMEOUT,
        };

        Ok(Self {
            ledger_path: get("CARDASSIST_LEDGER_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_LEDGER_PATH), PathBuf::from),
            log_dir: get("CARDASSIST_LOG_DIR")
                .map_or_else(|| PathBuf::from(DEFAULT_LOG_DIR), PathBuf::from),
            embedding_cache: get("CARDASSIST_EMBEDDING_CACHE")
                .map_or_else(|| PathBuf::from(DEFAULT_EMBEDDING_CACHE), PathBuf::from),
            port,
            llm,
            search,
        })
    }
}
