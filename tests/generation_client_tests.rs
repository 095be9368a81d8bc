//! End-to-End Tests for the Generation Client
//!
//! INTEGRATION UNDER TEST: GenerationClient against a mock HTTP server
//!
//! BUSINESS RESPONSIBILITY:
//!   - generate_image never fails at the type level; every path yields a
//!     renderable outcome
//!   - Transient API failures are retried, permanent ones are not
//!   - An unconfigured client performs zero network I/O
//!   - Fallback service and static placeholder assets keep results flowing
//!     when the primary API is down
//!
//! TEST COVERAGE:
//!   - Successful generation with request body and auth header verification
//!   - 401 (no retry), 429 rate limit vs quota, 5xx-then-recovery
//!   - Unconfigured short-circuit and degraded static assets
//!   - Fallback service dispatch and relabeled fallback failures

use async_trait::async_trait;
use nanobanana_client::{
    ClientConfig, ErrorCode, FallbackGenerator, GenerateRequest, GenerateResponse,
    GenerationClient, GenerationOptions, GenResult, RetryPolicy,
};
use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Helpers
// ============================================================================

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
        backoff_multiplier: 2.0,
        request_timeout: Duration::from_secs(2),
    }
}

fn test_config(server: &MockServer) -> ClientConfig {
    ClientConfig {
        api_key: Some("test-key".to_string()),
        base_url: server.uri(),
        retry: fast_retry(),
        ..ClientConfig::default()
    }
}

/// Fallback backend with a fixed answer and a call counter.
struct CountingFallback {
    calls: AtomicU32,
    fail: bool,
}

impl CountingFallback {
    fn ok() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            fail: false,
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            fail: true,
        })
    }
}

#[async_trait]
impl FallbackGenerator for CountingFallback {
    async fn generate(&self, _request: &GenerateRequest) -> GenResult<GenerateResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(nanobanana_client::GenError::classified(
                "server exploded",
                nanobanana_client::ErrorContext::new("fallback-route", "generate"),
            ))
        } else {
            Ok(GenerateResponse {
                image_url: Some("https://fallback.example.com/poster.png".to_string()),
                url: None,
                processing_time: None,
            })
        }
    }
}

// ============================================================================
// Happy path
// ============================================================================

#[tokio::test]
async fn test_generate_image_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/generate"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "prompt": "red silk saree, studio lighting",
            "model": "nano-banana-v2"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "image_url": "https://cdn.example.com/out.png",
            "processing_time": 2.4
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = GenerationClient::new(test_config(&server)).unwrap();
    let outcome = client
        .generate_image("red silk saree, studio lighting", &GenerationOptions::default())
        .await;

    assert!(outcome.success, "outcome: {outcome:?}");
    assert_eq!(
        outcome.image_url.as_deref(),
        Some("https://cdn.example.com/out.png")
    );
    assert!(outcome.error.is_none());

    let metadata = outcome.metadata.expect("success carries metadata");
    assert_eq!(metadata.model, "nano-banana-v2");
    assert_eq!(metadata.processing_time, Some(2.4));
    assert!(!metadata.fallback);
    assert!(client.error_log().is_empty(), "Nothing logged on success");
}

#[tokio::test]
async fn test_generate_image_accepts_url_response_key() {
    // The API has shipped both `image_url` and `url`; either must work
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "url": "https://cdn.example.com/alt-key.png"
        })))
        .mount(&server)
        .await;

    let client = GenerationClient::new(test_config(&server)).unwrap();
    let outcome = client
        .generate_image("indigo cotton print", &GenerationOptions::default())
        .await;

    assert!(outcome.success);
    assert_eq!(
        outcome.image_url.as_deref(),
        Some("https://cdn.example.com/alt-key.png")
    );
}

#[tokio::test]
async fn test_per_call_options_override_model_and_fill_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/generate"))
        .and(body_partial_json(json!({
            "model": "nano-banana-pro",
            "style": "vintage",
            "aspect_ratio": "4:5",
            "seed": 7
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "image_url": "https://cdn.example.com/styled.png"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = GenerationClient::new(test_config(&server)).unwrap();
    let options = GenerationOptions {
        model: Some("nano-banana-pro".to_string()),
        style: Some("vintage".to_string()),
        aspect_ratio: Some("4:5".to_string()),
        seed: Some(7),
        ..GenerationOptions::default()
    };

    let outcome = client.generate_image("festival banner", &options).await;
    assert!(outcome.success);
    assert_eq!(outcome.metadata.unwrap().model, "nano-banana-pro");
}

// ============================================================================
// Failure classification and retries
// ============================================================================

#[tokio::test]
async fn test_401_fails_fast_without_retry() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "invalid api key"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = GenerationClient::new(test_config(&server)).unwrap();
    let outcome = client
        .generate_image("red silk saree", &GenerationOptions::default())
        .await;

    assert!(!outcome.success);
    assert_eq!(
        outcome.error.as_deref(),
        Some(ErrorCode::Auth.user_message()),
        "Caller sees the fixed user copy, not the raw API message"
    );

    let entries = client.error_log().entries();
    assert_eq!(entries.len(), 1, "One attempt, one log entry");
    assert_eq!(entries[0].error.code, ErrorCode::Auth);
}

#[tokio::test]
async fn test_server_errors_retry_until_recovery() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "message": "backend crashed"
        })))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "image_url": "https://cdn.example.com/recovered.png"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = GenerationClient::new(test_config(&server)).unwrap();
    let outcome = client
        .generate_image("red silk saree", &GenerationOptions::default())
        .await;

    assert!(outcome.success, "Third attempt recovers: {outcome:?}");
    let entries = client.error_log().entries();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.error.code == ErrorCode::Server));
}

#[tokio::test]
async fn test_rate_limit_is_retried_then_surfaces_rate_limit_copy() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "1")
                .set_body_json(json!({ "message": "slow down" })),
        )
        .expect(3)
        .mount(&server)
        .await;

    let client = GenerationClient::new(test_config(&server)).unwrap();
    let outcome = client
        .generate_image("red silk saree", &GenerationOptions::default())
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some(ErrorCode::RateLimit.user_message()));
    assert_eq!(client.error_log().len(), 3, "Rate limits retry to exhaustion");
}

#[tokio::test]
async fn test_429_quota_body_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "message": "monthly quota exceeded"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = GenerationClient::new(test_config(&server)).unwrap();
    let outcome = client
        .generate_image("red silk saree", &GenerationOptions::default())
        .await;

    assert!(!outcome.success);
    let entries = client.error_log().entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].error.code, ErrorCode::Quota);
}

#[tokio::test]
async fn test_malformed_success_body_is_a_failure_outcome() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = GenerationClient::new(test_config(&server)).unwrap();
    let outcome = client
        .generate_image("red silk saree", &GenerationOptions::default())
        .await;

    assert!(!outcome.success);
    assert!(outcome.error.is_some());
}

// ============================================================================
// Unconfigured client and degraded assets
// ============================================================================

#[tokio::test]
async fn test_unconfigured_client_performs_no_network_io() {
    // API key unset returns a "not configured" failure
    // without any network call being attempted
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = ClientConfig {
        api_key: None,
        base_url: server.uri(),
        retry: fast_retry(),
        ..ClientConfig::default()
    };
    let client = GenerationClient::new(config).unwrap();
    let outcome = client
        .generate_image("red silk saree", &GenerationOptions::default())
        .await;

    assert!(!outcome.success);
    let message = outcome.error.expect("failure carries a message");
    assert!(
        message.contains("not configured"),
        "got message: {message}"
    );
    assert_eq!(client.error_log().len(), 1);
    server.verify().await;
}

#[tokio::test]
async fn test_unconfigured_client_serves_static_assets_round_robin() {
    let mut config = ClientConfig {
        api_key: None,
        retry: fast_retry(),
        ..ClientConfig::default()
    };
    config.fallback.static_asset_urls = vec![
        "https://cdn.example.com/placeholder-1.jpg".to_string(),
        "https://cdn.example.com/placeholder-2.jpg".to_string(),
    ];

    let client = GenerationClient::new(config).unwrap();

    let first = client
        .generate_image("red silk saree", &GenerationOptions::default())
        .await;
    let second = client
        .generate_image("red silk saree", &GenerationOptions::default())
        .await;
    let third = client
        .generate_image("red silk saree", &GenerationOptions::default())
        .await;

    assert!(first.success, "Placeholder counts as a renderable success");
    assert_eq!(
        first.image_url.as_deref(),
        Some("https://cdn.example.com/placeholder-1.jpg")
    );
    assert_eq!(
        second.image_url.as_deref(),
        Some("https://cdn.example.com/placeholder-2.jpg")
    );
    assert_eq!(
        third.image_url.as_deref(),
        Some("https://cdn.example.com/placeholder-1.jpg"),
        "Assets cycle round-robin"
    );
    assert!(first.metadata.unwrap().fallback);
    assert!(
        first.error.is_some(),
        "notify_user default attaches a notice to degraded results"
    );
}

#[tokio::test]
async fn test_disabled_fallback_never_serves_assets() {
    let mut config = ClientConfig {
        api_key: None,
        ..ClientConfig::default()
    };
    config.fallback.enabled = false;
    config.fallback.static_asset_urls =
        vec!["https://cdn.example.com/placeholder-1.jpg".to_string()];

    let client = GenerationClient::new(config).unwrap();
    let outcome = client
        .generate_image("red silk saree", &GenerationOptions::default())
        .await;

    assert!(!outcome.success, "Disabled fallback means a plain failure");
    assert!(outcome.image_url.is_none());
}

// ============================================================================
// Fallback service dispatch
// ============================================================================

#[tokio::test]
async fn test_fallback_service_rescues_exhausted_retries() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let fallback = CountingFallback::ok();
    let client = GenerationClient::new(test_config(&server))
        .unwrap()
        .with_fallback_service(fallback.clone());

    let outcome = client
        .generate_image("red silk saree", &GenerationOptions::default())
        .await;

    assert!(outcome.success);
    assert_eq!(
        outcome.image_url.as_deref(),
        Some("https://fallback.example.com/poster.png")
    );
    assert!(outcome.metadata.unwrap().fallback);
    assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        client.error_log().len(),
        3,
        "Each failed primary attempt was logged"
    );
}

#[tokio::test]
async fn test_failing_fallback_service_is_logged_under_fallback() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let fallback = CountingFallback::failing();
    let client = GenerationClient::new(test_config(&server))
        .unwrap()
        .with_fallback_service(fallback.clone());

    let outcome = client
        .generate_image("red silk saree", &GenerationOptions::default())
        .await;

    assert!(!outcome.success);
    assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);

    let entries = client.error_log().entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].error.code, ErrorCode::Auth);
    assert_eq!(
        entries[1].error.context.service,
        "fallback",
        "Fallback failures are attributed to the fallback service"
    );
}
