//! Wire types and HTTP plumbing for the NanoBanana generation API.
//!
//! One endpoint: `POST {base_url}/generate` with a JSON body and bearer
//! authentication. Non-2xx statuses are mapped onto the error taxonomy here,
//! at the typed boundary, so the retry layer only ever sees classified
//! errors.

use crate::error::{ErrorCode, ErrorContext, GenError, GenResult};
use crate::logging::{log_error, log_trace};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

/// Request body for `POST /generate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guidance_scale: Option<f64>,
}

/// Success body from `POST /generate`.
///
/// The API has shipped both `image_url` and `url` as the result key; accept
/// either.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<f64>,
}

impl GenerateResponse {
    /// The generated image URL under whichever key the API used.
    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref().or(self.url.as_deref())
    }
}

/// Error body the API attaches to non-2xx responses. Best effort; the body is
/// not guaranteed to be JSON.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

/// HTTP client for the generation API.
#[derive(Debug, Clone, Default)]
pub struct ImageApiClient {
    client: reqwest::Client,
}

impl ImageApiClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the auth headers for the generation API.
    ///
    /// Rejects keys that are not valid header values (embedded newlines and
    /// the like) instead of sending a mangled request.
    pub fn build_auth_headers(api_key: &str, context: &ErrorContext) -> GenResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|e| {
                GenError::new(
                    ErrorCode::Auth,
                    format!("Invalid API key format: {e}"),
                    context.clone(),
                )
            })?,
        );
        Ok(headers)
    }

    /// Execute a single generation request, without retries.
    pub async fn generate(
        &self,
        base_url: &str,
        headers: &HeaderMap,
        request: &GenerateRequest,
        context: &ErrorContext,
    ) -> GenResult<GenerateResponse> {
        let url = format!("{}/generate", base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .headers(headers.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                let code = if e.is_timeout() {
                    ErrorCode::Timeout
                } else {
                    ErrorCode::Network
                };
                GenError::new(code, format!("Request failed: {e}"), context.clone())
            })?;

        if !response.status().is_success() {
            return Err(handle_error_response(response, context).await);
        }

        parse_success_response(response, context).await
    }
}

/// Map a non-2xx response onto the error taxonomy.
async fn handle_error_response(response: reqwest::Response, context: &ErrorContext) -> GenError {
    let status = response.status();
    let headers = response.headers().clone();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or(body);

    log_error!(
        status = %status,
        message = %message,
        "Generation API returned an error"
    );

    match status.as_u16() {
        401 | 403 => GenError::new(
            ErrorCode::Auth,
            format!("Authentication failed: {message}"),
            context.clone(),
        ),
        429 => {
            // Some deployments report an exhausted monthly quota as a 429;
            // those must not be retried.
            if message.to_lowercase().contains("quota") {
                GenError::new(
                    ErrorCode::Quota,
                    format!("Quota exhausted: {message}"),
                    context.clone(),
                )
            } else {
                let retry_after = headers
                    .get("retry-after")
                    .and_then(|h| h.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok());
                let detail = match retry_after {
                    Some(secs) => format!("Rate limited, retry after {secs}s: {message}"),
                    None => format!("Rate limited: {message}"),
                };
                GenError::new(ErrorCode::RateLimit, detail, context.clone())
            }
        }
        500..=599 => GenError::new(
            ErrorCode::Server,
            format!("API error {status}: {message}"),
            context.clone(),
        ),
        _ => GenError::classified(format!("API error {status}: {message}"), context.clone()),
    }
}

/// Parse a 2xx response body.
async fn parse_success_response(
    response: reqwest::Response,
    context: &ErrorContext,
) -> GenResult<GenerateResponse> {
    let raw_body = response.text().await.map_err(|e| {
        GenError::new(
            ErrorCode::Unknown,
            format!("Failed to read response body: {e}"),
            context.clone(),
        )
    })?;

    log_trace!(raw_body = %raw_body, "Generation API response body");

    serde_json::from_str(&raw_body).map_err(|e| {
        GenError::new(
            ErrorCode::Unknown,
            format!("Invalid response body: {e}"),
            context.clone(),
        )
    })
}
