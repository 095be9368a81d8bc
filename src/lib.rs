//! # nanobanana-client
//!
//! Resilient client for the NanoBanana hosted image-generation API.
//!
//! ## Key Features
//!
//! - **Retry with backoff**: transient failures (network, timeout, 5xx, rate
//!   limits) are retried with capped exponential backoff
//! - **Error taxonomy**: every failure classifies into a closed set of codes
//!   with a fixed table of user-facing messages
//! - **Fallback**: an alternate generation path and round-robin placeholder
//!   assets keep the UI renderable when the primary API is down
//! - **Diagnostics**: a bounded in-memory log of recent failures with
//!   aggregate counts by code and service
//!
//! ## Example
//!
//! ```rust,no_run
//! use nanobanana_client::{ClientConfig, GenerationClient, GenerationOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = ClientConfig::default();
//! config.api_key = Some("your-api-key".to_string());
//!
//! let client = GenerationClient::new(config)?;
//! let outcome = client
//!     .generate_image("red silk saree, studio lighting", &GenerationOptions::default())
//!     .await;
//!
//! if outcome.success {
//!     println!("image at {}", outcome.image_url.unwrap_or_default());
//! } else {
//!     println!("failed: {}", outcome.error.unwrap_or_default());
//! }
//! # Ok(())
//! # }
//! ```

// Logging utilities (re-exports tracing with log_* naming) - internal only
pub(crate) mod logging;

pub mod api;
pub mod client;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fallback;
pub mod retry;

#[cfg(test)]
pub mod tests;

// Re-export main types
pub use api::{GenerateRequest, GenerateResponse, ImageApiClient};
pub use client::{
    GenerationClient, GenerationMetadata, GenerationOptions, GenerationOutcome, PRIMARY_SERVICE,
};
pub use config::ClientConfig;
pub use diagnostics::{ErrorLog, ErrorLogEntry, ErrorStats, LOG_CAPACITY};
pub use error::{classify_message, ErrorCode, ErrorContext, GenError, GenResult};
pub use fallback::{FallbackConfig, FallbackGenerator};
pub use retry::{RetryExecutor, RetryPolicy, FALLBACK_SERVICE};
