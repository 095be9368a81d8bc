//! Error taxonomy and classification for image-generation operations.
//!
//! The main error type is [`GenError`]: an error code from the closed
//! [`ErrorCode`] taxonomy plus the message and [`ErrorContext`] describing the
//! failed call. Classification is total - [`classify_message`] maps any raw
//! error text to exactly one code, defaulting to [`ErrorCode::Unknown`].
//!
//! # Error Handling Example
//!
//! ```rust,no_run
//! use nanobanana_client::{ErrorContext, GenError};
//!
//! fn handle_error(err: GenError) {
//!     // Check if we should retry
//!     if err.retryable() {
//!         println!("Retryable error: {}", err);
//!     }
//!
//!     // Get user-friendly message
//!     println!("Tell user: {}", err.user_message());
//! }
//! ```
//!
//! # Result Type
//!
//! Use [`GenResult<T>`] as a convenient alias for `Result<T, GenError>`.

use crate::logging::{log_error, log_warn};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Convenient result type for generation operations.
pub type GenResult<T> = std::result::Result<T, GenError>;

// ============================================================================
// Error taxonomy
// ============================================================================

/// Closed set of error categories for generation failures.
///
/// Every failure maps to exactly one code; [`classify_message`] defaults to
/// [`ErrorCode::Unknown`] when nothing matches.
///
/// | Code | Retryable |
/// |------|-----------|
/// | `Network` | Yes |
/// | `Timeout` | Yes |
/// | `Auth` | No |
/// | `RateLimit` | Yes |
/// | `Server` | Yes |
/// | `Quota` | No |
/// | `Unknown` | No |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Connection-level failure reaching the API.
    #[serde(rename = "NETWORK_ERROR")]
    Network,
    /// The request did not complete within the configured timeout.
    #[serde(rename = "TIMEOUT_ERROR")]
    Timeout,
    /// The API rejected the credentials (401/403).
    #[serde(rename = "AUTH_ERROR")]
    Auth,
    /// The API is throttling requests (429).
    #[serde(rename = "RATE_LIMIT_ERROR")]
    RateLimit,
    /// The API reported a server-side failure (5xx).
    #[serde(rename = "SERVER_ERROR")]
    Server,
    /// The account's generation quota is exhausted.
    #[serde(rename = "QUOTA_ERROR")]
    Quota,
    /// Anything that could not be classified.
    #[serde(rename = "UNKNOWN_ERROR")]
    Unknown,
}

impl ErrorCode {
    /// Whether errors with this code are transient and worth retrying.
    ///
    /// Retrying does not help authentication, quota, or unclassified
    /// failures; those fail fast (but may still fall back).
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Network | Self::Timeout | Self::Server | Self::RateLimit
        )
    }

    /// Fixed code-to-copy table for user-visible text.
    ///
    /// This is the only place display text is derived from the taxonomy, so
    /// internal codes stay decoupled from what the UI shows.
    pub fn user_message(self) -> &'static str {
        match self {
            Self::Network => "Network connection issue. Please check your connection and try again",
            Self::Timeout => "The image service took too long to respond. Please try again",
            Self::Auth => "Authentication with the image service failed. Please check your API credentials",
            Self::RateLimit => "The image service is busy. Please wait a moment and try again",
            Self::Server => "The image service had a problem. Please try again shortly",
            Self::Quota => "Your image generation quota has been used up",
            Self::Unknown => "Something went wrong generating the image. Please try again",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Network => "NETWORK_ERROR",
            Self::Timeout => "TIMEOUT_ERROR",
            Self::Auth => "AUTH_ERROR",
            Self::RateLimit => "RATE_LIMIT_ERROR",
            Self::Server => "SERVER_ERROR",
            Self::Quota => "QUOTA_ERROR",
            Self::Unknown => "UNKNOWN_ERROR",
        };
        f.write_str(name)
    }
}

/// Matches a bare 5xx status code embedded in an error message.
static SERVER_STATUS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b5\d{2}\b").expect("server status pattern is valid"));

/// Classify a raw error message into an [`ErrorCode`].
///
/// Pure and total: never panics, always returns a code. The checks run in a
/// fixed order and the first match wins. Order is a policy choice, not an
/// accident: "rate limit" must be checked before the generic "limit" so a
/// throttling message is not misread as a quota failure.
pub fn classify_message(message: &str) -> ErrorCode {
    let lower = message.to_lowercase();

    if lower.contains("network") || lower.contains("fetch") {
        ErrorCode::Network
    } else if lower.contains("timeout") || lower.contains("timed out") {
        ErrorCode::Timeout
    } else if lower.contains("unauthorized") || lower.contains("401") {
        ErrorCode::Auth
    } else if lower.contains("rate limit") || lower.contains("429") {
        ErrorCode::RateLimit
    } else if lower.contains("server") || SERVER_STATUS.is_match(&lower) {
        ErrorCode::Server
    } else if lower.contains("quota") || lower.contains("limit") {
        ErrorCode::Quota
    } else {
        ErrorCode::Unknown
    }
}

// ============================================================================
// Error context
// ============================================================================

/// Metadata describing the circumstance of a failed operation.
///
/// Created fresh at call start and threaded through every retry attempt with
/// the attempt number updated via [`for_attempt`](Self::for_attempt). Never
/// mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// The service the call targeted (e.g. "nanobanana", "fallback").
    pub service: String,
    /// The operation being performed (e.g. "generate_image").
    pub operation: String,
    /// When the call started.
    pub timestamp: DateTime<Utc>,
    /// Caller's user agent, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// The end user on whose behalf the call ran, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Which attempt produced the failure (1-based).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt: Option<u32>,
}

impl ErrorContext {
    /// Create a context for a call starting now.
    pub fn new(service: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            operation: operation.into(),
            timestamp: Utc::now(),
            user_agent: None,
            user_id: None,
            attempt: None,
        }
    }

    /// Attach the end-user id.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Attach the caller's user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Copy of this context labeled with the given attempt number.
    pub fn for_attempt(&self, attempt: u32) -> Self {
        let mut ctx = self.clone();
        ctx.attempt = Some(attempt);
        ctx
    }

    /// Copy of this context relabeled to a different service.
    ///
    /// Used when a failure is handed to the fallback path so its log entries
    /// are attributed to "fallback" rather than the primary service.
    pub fn for_service(&self, service: impl Into<String>) -> Self {
        let mut ctx = self.clone();
        ctx.service = service.into();
        ctx
    }
}

// ============================================================================
// Classified error
// ============================================================================

/// A classified generation failure.
///
/// Write-once: constructed by the classifier or the API layer and never
/// mutated afterwards. `retryable` is derived solely from the code via
/// [`ErrorCode::is_retryable`], never stored independently.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct GenError {
    /// The taxonomy code this failure was classified as.
    pub code: ErrorCode,
    /// The raw error message, for diagnostics (not for display).
    pub message: String,
    /// Where and when the failure happened.
    pub context: ErrorContext,
    /// Whether a fallback path existed when this error was raised.
    pub fallback_available: bool,
}

impl GenError {
    /// Construct an error with an already-known code.
    ///
    /// Logs at a level matching the code's severity, like every constructor
    /// here.
    pub fn new(code: ErrorCode, message: impl Into<String>, context: ErrorContext) -> Self {
        let message = message.into();
        match code {
            ErrorCode::Auth | ErrorCode::Server | ErrorCode::Unknown => log_error!(
                code = %code,
                service = %context.service,
                operation = %context.operation,
                message = %message,
                "Generation request failed"
            ),
            _ => log_warn!(
                code = %code,
                service = %context.service,
                operation = %context.operation,
                message = %message,
                "Generation request failed"
            ),
        }
        Self {
            code,
            message,
            context,
            fallback_available: false,
        }
    }

    /// Classify a raw error message and wrap it.
    ///
    /// For errors originating outside the typed boundary (transport errors,
    /// free-form API bodies). Errors that already carry a code keep it; do not
    /// route them back through here.
    pub fn classified(message: impl Into<String>, context: ErrorContext) -> Self {
        let message = message.into();
        let code = classify_message(&message);
        Self::new(code, message, context)
    }

    /// A request that did not complete within the configured timeout.
    pub fn timeout(timeout_secs: u64, context: ErrorContext) -> Self {
        Self::new(
            ErrorCode::Timeout,
            format!("Request timed out after {timeout_secs}s"),
            context,
        )
    }

    /// Record whether a fallback path existed when the error was raised.
    ///
    /// Consumes self: the error is still write-once from the caller's point of
    /// view, this runs before the error is first observed.
    pub fn with_fallback_available(mut self, available: bool) -> Self {
        self.fallback_available = available;
        self
    }

    /// Copy relabeled to the fallback service, for failures of the fallback
    /// path itself.
    pub fn relabeled(&self, service: &str) -> Self {
        Self {
            code: self.code,
            message: self.message.clone(),
            context: self.context.for_service(service),
            fallback_available: self.fallback_available,
        }
    }

    /// Whether this failure is transient; derived solely from the code.
    pub fn retryable(&self) -> bool {
        self.code.is_retryable()
    }

    /// User-facing text for this failure, from the fixed code table.
    pub fn user_message(&self) -> &'static str {
        self.code.user_message()
    }
}
