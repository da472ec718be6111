use std::env;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_PORT: u16 = 8081;
const DEFAULT_CLASSIFIER_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_DETAIL_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_DETAIL_MODEL: &str = "gpt-3.5-turbo";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
    #[error("invalid value for {name}: {value}")]
    InvalidVar { name: &'static str, value: String },
}

/// Deployment configuration, resolved once at startup from the
/// environment (with `.env` support via dotenv in main).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub classifier_url: String,
    pub classifier_api_key: String,
    pub classifier_timeout: Duration,
    pub max_image_bytes: usize,
    pub detail_api_key: Option<String>,
    pub detail_base_url: String,
    pub detail_model: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let classifier_url = require("CLASSIFIER_API_URL")?;
        let classifier_api_key = require("CLASSIFIER_API_KEY")?;
        let port = parse_or("PORT", DEFAULT_PORT)?;
        let timeout_secs = parse_or("CLASSIFIER_TIMEOUT_SECS", DEFAULT_CLASSIFIER_TIMEOUT_SECS)?;
        let max_image_bytes = parse_or("MAX_IMAGE_BYTES", DEFAULT_MAX_IMAGE_BYTES)?;

        // The detailed-analysis service degrades to static sections when no
        // key is configured, so these are all optional.
        let detail_api_key = env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());
        let detail_base_url =
            env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_DETAIL_BASE_URL.to_string());
        let detail_model =
            env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_DETAIL_MODEL.to_string());

        Ok(Self {
            port,
            classifier_url,
            classifier_api_key,
            classifier_timeout: Duration::from_secs(timeout_secs),
            max_image_bytes,
            detail_api_key,
            detail_base_url,
            detail_model,
        })
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or(ConfigError::MissingVar(name))
}

fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidVar { name, value }),
        Err(_) => Ok(default),
    }
}
