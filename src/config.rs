//! Client configuration: API credentials, endpoints, retry and fallback
//! policy, with environment-variable loading.

use crate::error::{ErrorCode, ErrorContext, GenError, GenResult};
use crate::fallback::FallbackConfig;
use crate::logging::log_debug;
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};

/// Environment variable holding the NanoBanana API key.
pub const API_KEY_VAR: &str = "NANOBANANA_API_KEY";
/// Accepted in order when [`API_KEY_VAR`] is unset.
const API_KEY_FALLBACK_VARS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];
/// Environment variable overriding the API base URL.
pub const BASE_URL_VAR: &str = "NANOBANANA_BASE_URL";

const DEFAULT_BASE_URL: &str = "https://api.nanobanana.ai";
const DEFAULT_MODEL: &str = "nano-banana-v2";

/// Configuration for a [`GenerationClient`](crate::client::GenerationClient).
///
/// An absent API key does not make the configuration invalid - it disables
/// the network path entirely and forces the fallback, so a client can still
/// be constructed and serve degraded results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Bearer token for the generation API.
    pub api_key: Option<String>,
    /// Base URL the `/generate` path is appended to.
    pub base_url: String,
    /// Model requested when the caller does not name one.
    pub default_model: String,
    /// Retry and timeout behavior.
    pub retry: RetryPolicy,
    /// What to do once retries are exhausted.
    pub fallback: FallbackConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            retry: RetryPolicy::default(),
            fallback: FallbackConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from the environment.
    ///
    /// Reads [`API_KEY_VAR`], falling back to `GEMINI_API_KEY` then
    /// `GOOGLE_API_KEY`, and [`BASE_URL_VAR`] for the endpoint. Missing
    /// variables leave the defaults in place rather than failing; an
    /// unconfigured client degrades to the fallback path.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(api_key) = std::env::var(API_KEY_VAR) {
            config.api_key = Some(api_key);
        } else {
            for var in API_KEY_FALLBACK_VARS {
                if let Ok(api_key) = std::env::var(var) {
                    config.api_key = Some(api_key);
                    break;
                }
            }
        }

        if let Ok(base_url) = std::env::var(BASE_URL_VAR) {
            config.base_url = base_url;
        }

        log_debug!(
            has_api_key = config.api_key.is_some(),
            base_url = %config.base_url,
            default_model = %config.default_model,
            "Generation client configuration loaded from environment"
        );

        config
    }

    /// Whether the network path can be used at all.
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty()) && !self.base_url.is_empty()
    }

    /// Validate retry settings the executor cannot guard against itself.
    pub fn validate(&self) -> GenResult<()> {
        let context = ErrorContext::new("nanobanana", "validate_config");
        if self.retry.max_attempts < 1 {
            return Err(GenError::new(
                ErrorCode::Unknown,
                "retry.max_attempts must be at least 1",
                context,
            ));
        }
        if self.retry.base_delay.is_zero() || self.retry.max_delay < self.retry.base_delay {
            return Err(GenError::new(
                ErrorCode::Unknown,
                "retry delays must be positive with max_delay >= base_delay",
                context,
            ));
        }
        if self.retry.backoff_multiplier <= 1.0 {
            return Err(GenError::new(
                ErrorCode::Unknown,
                "retry.backoff_multiplier must be greater than 1",
                context,
            ));
        }
        Ok(())
    }
}
