//! Fallback configuration and the alternate-generation seam.

use crate::api::{GenerateRequest, GenerateResponse};
use crate::error::GenResult;
use serde::{Deserialize, Serialize};

/// Policy for what happens once primary retries are exhausted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// Master switch; when false no fallback of any kind is attempted.
    pub enabled: bool,
    /// Name of the alternate generation service, for log attribution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_service_name: Option<String>,
    /// Placeholder image URLs served round-robin as a degraded result.
    pub static_asset_urls: Vec<String>,
    /// Whether a degraded result should carry a user-facing notice.
    pub notify_user: bool,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fallback_service_name: None,
            static_asset_urls: Vec::new(),
            notify_user: true,
        }
    }
}

impl FallbackConfig {
    /// Deterministic, cyclic pick from the static asset list.
    ///
    /// `fallback_asset(i)` equals `fallback_asset(i + len)` for any `i`;
    /// returns `None` when no assets are configured.
    pub fn fallback_asset(&self, index: usize) -> Option<&str> {
        if self.static_asset_urls.is_empty() {
            return None;
        }
        let idx = index % self.static_asset_urls.len();
        Some(self.static_asset_urls[idx].as_str())
    }
}

/// Alternate generation path tried after primary retries are exhausted.
///
/// Implementations typically forward to a server-side generation route with
/// its own credentials. Failures from this path are classified and logged like
/// primary failures, attributed to the "fallback" service.
#[async_trait::async_trait]
pub trait FallbackGenerator: Send + Sync {
    /// Attempt the same generation through the alternate path.
    async fn generate(&self, request: &GenerateRequest) -> GenResult<GenerateResponse>;
}
