//! The generation client: the sole caller of the retry, fallback, and
//! diagnostics layers.
//!
//! [`GenerationClient::generate_image`] is deliberately infallible at the
//! type level - it returns a [`GenerationOutcome`] rather than a `Result`, so
//! UI callers can render whatever comes back without wrapping every call site
//! in error handling. All failure paths are caught here and converted into an
//! outcome with `success: false` (or a degraded placeholder when one is
//! configured).

use crate::api::{GenerateRequest, ImageApiClient};
use crate::config::ClientConfig;
use crate::diagnostics::ErrorLog;
use crate::error::{ErrorCode, ErrorContext, GenError, GenResult};
use crate::fallback::FallbackGenerator;
use crate::logging::{log_debug, log_info};
use crate::retry::RetryExecutor;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Service label for log entries produced by the primary network path.
pub const PRIMARY_SERVICE: &str = "nanobanana";

const NOT_CONFIGURED_MSG: &str =
    "NanoBanana image API is not configured: set NANOBANANA_API_KEY and NANOBANANA_BASE_URL";
const DEGRADED_NOTICE: &str =
    "The image service is currently unavailable; showing a placeholder image";

/// Per-call options layered over the client's defaults.
#[derive(Debug, Clone, Default)]
pub struct GenerationOptions {
    /// Model override; the config's default model when unset.
    pub model: Option<String>,
    pub style: Option<String>,
    pub quality: Option<String>,
    pub aspect_ratio: Option<String>,
    pub seed: Option<u64>,
    pub steps: Option<u32>,
    pub guidance_scale: Option<f64>,
    /// End-user id, recorded in error contexts for diagnostics only.
    pub user_id: Option<String>,
    /// Caller user agent, recorded in error contexts for diagnostics only.
    pub user_agent: Option<String>,
}

/// Details about a completed generation.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationMetadata {
    pub request_id: Uuid,
    pub model: String,
    /// Server-reported processing time in seconds, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<f64>,
    /// Whether the image came from a fallback path rather than the primary
    /// API.
    pub fallback: bool,
}

/// What a generation call produced. Always renderable: either an image URL or
/// a user-facing error message.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// User-facing message; set on failure, and on degraded success when the
    /// fallback config asks for a notice.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<GenerationMetadata>,
}

/// Client for the NanoBanana image-generation API with retry, fallback, and
/// failure diagnostics.
pub struct GenerationClient {
    config: ClientConfig,
    api: ImageApiClient,
    executor: RetryExecutor,
    log: ErrorLog,
    fallback_service: Option<Arc<dyn FallbackGenerator>>,
    asset_cursor: AtomicUsize,
}

impl GenerationClient {
    /// Create a client with its own fresh error log.
    pub fn new(config: ClientConfig) -> GenResult<Self> {
        Self::with_error_log(config, ErrorLog::new())
    }

    /// Create a client recording failures into an injected log.
    ///
    /// Lets an application share one diagnostics log across clients without
    /// any module-level state.
    pub fn with_error_log(config: ClientConfig, log: ErrorLog) -> GenResult<Self> {
        config.validate()?;
        log_debug!(
            base_url = %config.base_url,
            has_api_key = config.api_key.is_some(),
            default_model = %config.default_model,
            "Creating generation client"
        );
        let executor = RetryExecutor::new(config.retry.clone(), log.clone());
        Ok(Self {
            api: ImageApiClient::new(),
            executor,
            log,
            config,
            fallback_service: None,
            asset_cursor: AtomicUsize::new(0),
        })
    }

    /// Create a client from environment variables.
    pub fn from_env() -> GenResult<Self> {
        Self::new(ClientConfig::from_env())
    }

    /// Attach an alternate generation path, tried once primary retries are
    /// exhausted (and only while `fallback.enabled` is set).
    pub fn with_fallback_service(mut self, service: Arc<dyn FallbackGenerator>) -> Self {
        self.fallback_service = Some(service);
        self
    }

    /// The diagnostics log this client records failures into.
    pub fn error_log(&self) -> &ErrorLog {
        &self.log
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Generate an image for the given prompt.
    ///
    /// Never returns an error: classification, retries, fallback, and logging
    /// all happen internally, and the outcome always carries either an image
    /// URL or a user-facing message. A missing API key or base URL skips
    /// network I/O entirely and goes straight to the degraded path.
    pub async fn generate_image(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> GenerationOutcome {
        let request_id = Uuid::new_v4();
        let model = options
            .model
            .clone()
            .unwrap_or_else(|| self.config.default_model.clone());

        let mut context = ErrorContext::new(PRIMARY_SERVICE, "generate_image");
        if let Some(user_id) = &options.user_id {
            context = context.with_user_id(user_id.clone());
        }
        if let Some(user_agent) = &options.user_agent {
            context = context.with_user_agent(user_agent.clone());
        }

        log_info!(
            request_id = %request_id,
            model = %model,
            "Generating image"
        );

        if !self.config.is_configured() {
            let error = GenError::new(ErrorCode::Auth, NOT_CONFIGURED_MSG, context)
                .with_fallback_available(self.config.fallback.enabled);
            self.log.record(&error);
            return self.degraded(request_id, &model, error.message.clone());
        }

        let api_key = self.config.api_key.as_deref().unwrap_or_default();
        let headers = match ImageApiClient::build_auth_headers(api_key, &context) {
            Ok(headers) => headers,
            Err(error) => {
                self.log.record(&error);
                return self.degraded(request_id, &model, error.user_message().to_string());
            }
        };

        let request = GenerateRequest {
            prompt: prompt.to_string(),
            model: model.clone(),
            style: options.style.clone(),
            quality: options.quality.clone(),
            aspect_ratio: options.aspect_ratio.clone(),
            seed: options.seed,
            steps: options.steps,
            guidance_scale: options.guidance_scale,
        };

        let started = Instant::now();
        let api = &self.api;
        let base_url = self.config.base_url.as_str();
        let headers_ref = &headers;
        let request_ref = &request;
        let context_ref = &context;

        // The bool marks whether the response came from the fallback path.
        let operation = move || async move {
            api.generate(base_url, headers_ref, request_ref, context_ref)
                .await
                .map(|response| (response, false))
        };

        let fallback_service = self
            .config
            .fallback
            .enabled
            .then(|| self.fallback_service.clone())
            .flatten();

        let result = match fallback_service {
            Some(service) => {
                let fallback = move || async move {
                    service
                        .generate(request_ref)
                        .await
                        .map(|response| (response, true))
                };
                self.executor
                    .execute_with_fallback(&context, operation, Some(fallback))
                    .await
            }
            None => self.executor.execute(&context, operation).await,
        };

        match result {
            Ok((response, via_fallback)) => {
                let Some(image_url) = response.image_url() else {
                    let error = GenError::new(
                        ErrorCode::Unknown,
                        "Generation response carried no image URL",
                        context.clone(),
                    );
                    self.log.record(&error);
                    return self.degraded(request_id, &model, error.user_message().to_string());
                };

                log_info!(
                    request_id = %request_id,
                    duration_ms = started.elapsed().as_millis(),
                    via_fallback = via_fallback,
                    "Image generated"
                );

                GenerationOutcome {
                    success: true,
                    image_url: Some(image_url.to_string()),
                    error: None,
                    metadata: Some(GenerationMetadata {
                        request_id,
                        model,
                        processing_time: response.processing_time,
                        fallback: via_fallback,
                    }),
                }
            }
            Err(error) => self.degraded(request_id, &model, error.user_message().to_string()),
        }
    }

    /// Terminal failure handling: serve the next placeholder asset when one
    /// is configured, otherwise a failed outcome with the given message.
    fn degraded(&self, request_id: Uuid, model: &str, failure_message: String) -> GenerationOutcome {
        if self.config.fallback.enabled {
            let cursor = self.asset_cursor.fetch_add(1, Ordering::Relaxed);
            if let Some(asset) = self.config.fallback.fallback_asset(cursor) {
                log_debug!(
                    request_id = %request_id,
                    asset = %asset,
                    "Serving degraded placeholder asset"
                );
                return GenerationOutcome {
                    success: true,
                    image_url: Some(asset.to_string()),
                    error: self
                        .config
                        .fallback
                        .notify_user
                        .then(|| DEGRADED_NOTICE.to_string()),
                    metadata: Some(GenerationMetadata {
                        request_id,
                        model: model.to_string(),
                        processing_time: None,
                        fallback: true,
                    }),
                };
            }
        }

        GenerationOutcome {
            success: false,
            image_url: None,
            error: Some(failure_message),
            metadata: None,
        }
    }
}
