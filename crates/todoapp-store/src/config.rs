use std::env;
use thiserror::Error;
use todoapp_model::DEFAULT_PAGE_SIZE;

pub const DEFAULT_API_BASE: &str = "http://localhost:8000/api";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to parse environment variable '{key}': {details}")]
    ParseError { key: String, details: String },

    #[error("Environment variable '{0}' must not be empty")]
    Empty(String),
}

/// Where the store's gateway talks to and how
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_base: String,
    pub token: Option<String>,
    pub page_size: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            token: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ClientConfig {
    /// Reads `TODOAPP_API_BASE`, `TODOAPP_TOKEN` and `TODOAPP_PAGE_SIZE`,
    /// falling back to the defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_base = env::var("TODOAPP_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        if api_base.trim().is_empty() {
            return Err(ConfigError::Empty("TODOAPP_API_BASE".to_string()));
        }

        let token = env::var("TODOAPP_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty());

        let page_size = match env::var("TODOAPP_PAGE_SIZE") {
            Ok(raw) => parse_page_size(&raw)?,
            Err(_) => DEFAULT_PAGE_SIZE,
        };

        Ok(Self {
            api_base,
            token,
            page_size,
        })
    }
}

fn parse_page_size(raw: &str) -> Result<u32, ConfigError> {
    let parse_error = |details: String| ConfigError::ParseError {
        key: "TODOAPP_PAGE_SIZE".to_string(),
        details,
    };
    match raw.trim().parse::<u32>() {
        Ok(0) => Err(parse_error("page size must be at least 1".to_string())),
        Ok(size) => Ok(size),
        Err(e) => Err(parse_error(e.to_string())),
    }
}
