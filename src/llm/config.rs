//! LLM configuration parsed from environment variables.

use super::types::LlmError;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 512;
pub const DEFAULT_LLM_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_LLM_CONNECT_TIMEOUT_SECS: u64 = 10;

const API_KEY_VAR: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LlmTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub max_output_tokens: u32,
    pub timeouts: LlmTimeouts,
}

impl LlmConfig {
    /// Build typed LLM config from environment variables.
    ///
    /// Required:
    /// - `GEMINI_API_KEY`
    ///
    /// Optional:
    /// - `GEMINI_MODEL`: default `gemini-1.5-flash`
    /// - `GEMINI_BASE_URL`: default Generative Language API v1beta
    /// - `GEMINI_MAX_OUTPUT_TOKENS`: default 512
    /// - `GEMINI_REQUEST_TIMEOUT_SECS`: default 60
    /// - `GEMINI_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or a numeric value is malformed.
    pub fn from_env() -> Result<Self, LlmError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`LlmConfig::from_env`], reading values through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or a numeric value is malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, LlmError> {
        let api_key = lookup(API_KEY_VAR)
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| LlmError::MissingApiKey { var: API_KEY_VAR.into() })?;

        let model = lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());
        let base_url = lookup("GEMINI_BASE_URL")
            .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let max_output_tokens = parse_or("GEMINI_MAX_OUTPUT_TOKENS", lookup("GEMINI_MAX_OUTPUT_TOKENS"), DEFAULT_MAX_OUTPUT_TOKENS)?;
        let timeouts = LlmTimeouts {
            request_secs: parse_or(
                "GEMINI_REQUEST_TIMEOUT_SECS",
                lookup("GEMINI_REQUEST_TIMEOUT_SECS"),
                DEFAULT_LLM_REQUEST_TIMEOUT_SECS,
            )?,
            connect_secs: parse_or(
                "GEMINI_CONNECT_TIMEOUT_SECS",
                lookup("GEMINI_CONNECT_TIMEOUT_SECS"),
                DEFAULT_LLM_CONNECT_TIMEOUT_SECS,
            )?,
        };

        Ok(Self { api_key, model, base_url, max_output_tokens, timeouts })
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T, LlmError>
where
    T: std::str::FromStr,
{
    match raw {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse::<T>()
            .map_err(|_| LlmError::ConfigParse(format!("invalid {key}: {v}"))),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
