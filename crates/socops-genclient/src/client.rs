//! HTTP client for the content-generation provider.
//!
//! Sends a [`GenerationRequest`] as JSON to `POST {base}/generate` and reads
//! back either `{"content": "…"}` or `{"error": "…"}`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use socops_core::ports::{ContentGenerator, GeneratedContent, GenerationRequest, UpstreamError};
use socops_core::AppConfig;

use crate::error::GenClientError;
use crate::retry::retry_with_backoff;

const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_BACKOFF_BASE_MS: u64 = 500;

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Client for the generation provider.
///
/// Use [`GenerationClient::new`] to build one from the application config or
/// [`GenerationClient::with_base_url`] to point at a mock server in tests.
pub struct GenerationClient {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl std::fmt::Debug for GenerationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("max_retries", &self.max_retries)
            .field("backoff_base_ms", &self.backoff_base_ms)
            .finish()
    }
}

impl GenerationClient {
    /// Builds a client from `SOCOPS_GENERATOR_*` settings.
    ///
    /// # Errors
    ///
    /// Returns [`GenClientError::NotConfigured`] when no generator URL is set,
    /// or any error from [`GenerationClient::with_base_url`].
    pub fn new(config: &AppConfig) -> Result<Self, GenClientError> {
        let base_url = config
            .generator_url
            .as_deref()
            .ok_or(GenClientError::NotConfigured)?;
        Ok(Self::with_base_url(
            base_url,
            config.generator_api_key.as_deref(),
            config.generator_timeout_secs,
        )?
        .with_retry(config.generator_max_retries, config.generator_backoff_base_ms))
    }

    /// # Errors
    ///
    /// Returns [`GenClientError::Http`] if the underlying `reqwest::Client`
    /// cannot be built, or [`GenClientError::InvalidBaseUrl`] if `base_url`
    /// does not parse.
    pub fn with_base_url(
        base_url: &str,
        api_key: Option<&str>,
        timeout_secs: u64,
    ) -> Result<Self, GenClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("socops/0.1 (social-content)")
            .build()?;

        // Trailing slash so `join` appends rather than replacing the last segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let endpoint = Url::parse(&normalised)
            .and_then(|u| u.join("generate"))
            .map_err(|e| GenClientError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            endpoint,
            api_key: api_key
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_owned),
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
        })
    }

    #[must_use]
    pub fn with_retry(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Generates copy, retrying transient failures.
    ///
    /// # Errors
    ///
    /// - [`GenClientError::Http`] / [`GenClientError::Status`] once retries
    ///   are exhausted.
    /// - [`GenClientError::Api`] if the provider answers with an error body.
    /// - [`GenClientError::Deserialize`] / [`GenClientError::EmptyResponse`]
    ///   if the body has neither field.
    pub async fn generate_content(
        &self,
        request: &GenerationRequest,
    ) -> Result<String, GenClientError> {
        retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            self.request_once(request)
        })
        .await
    }

    async fn request_once(&self, request: &GenerationRequest) -> Result<String, GenClientError> {
        let mut builder = self.client.post(self.endpoint.clone()).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<GenerateResponse>(&body)
                .ok()
                .and_then(|r| r.error)
                .unwrap_or_else(|| body.chars().take(200).collect());
            return Err(GenClientError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&body).map_err(|e| GenClientError::Deserialize {
                context: format!("POST {}", self.endpoint),
                source: e,
            })?;
        match (parsed.content, parsed.error) {
            (_, Some(error)) => Err(GenClientError::Api(error)),
            (Some(content), None) => Ok(content),
            (None, None) => Err(GenClientError::EmptyResponse),
        }
    }
}

#[async_trait]
impl ContentGenerator for GenerationClient {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedContent, UpstreamError> {
        tracing::debug!(
            content_type = %request.content_type,
            endpoint = %self.endpoint,
            "requesting generated copy"
        );
        self.generate_content(request)
            .await
            .map(|content| GeneratedContent { content })
            .map_err(|e| {
                tracing::warn!(content_type = %request.content_type, error = %e, "generation failed");
                UpstreamError::from(e)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_appends_generate_to_base_path() {
        let client = GenerationClient::with_base_url("https://gen.example.com/api/", None, 30)
            .expect("client construction should not fail");
        assert_eq!(client.endpoint().as_str(), "https://gen.example.com/api/generate");

        let client = GenerationClient::with_base_url("https://gen.example.com", None, 30)
            .expect("client construction should not fail");
        assert_eq!(client.endpoint().as_str(), "https://gen.example.com/generate");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = GenerationClient::with_base_url("not a url", None, 30).unwrap_err();
        assert!(matches!(err, GenClientError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn blank_api_key_is_ignored_and_debug_redacts() {
        let client = GenerationClient::with_base_url("https://gen.example.com", Some("  "), 30)
            .expect("client");
        assert!(client.api_key.is_none());

        let client = GenerationClient::with_base_url("https://gen.example.com", Some("s3cret"), 30)
            .expect("client");
        let debug = format!("{client:?}");
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("[redacted]"));
    }
}
