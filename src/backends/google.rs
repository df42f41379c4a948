use log::error;
use reqwest::Client;
use std::time::Duration;
use url::Url;

use async_trait::async_trait;

use crate::app_config::BackendKind;
use crate::backends::{check_response_arity, BatchRequest, BatchResponse, TranslationBackend};
use crate::errors::BackendError;

/// Client for the public Google web translation endpoint
///
/// The endpoint answers one text per request, so a batch is issued as a
/// sequence of GETs within a single `translate` call. Spacing between whole
/// batches is the rate limiter's job, not the adapter's.
#[derive(Debug)]
pub struct GoogleBackend {
    /// Endpoint URL of the translation service
    endpoint: String,
    /// HTTP client for making requests
    client: Client,
}

impl GoogleBackend {
    /// Create a new Google backend with the given endpoint and timeout
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                // Keep connections alive across the texts of one batch
                .pool_idle_timeout(Duration::from_secs(90))
                .tcp_keepalive(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Build the request URL for a single text
    fn request_url(&self, text: &str, source_language: &str, target_language: &str) -> Result<Url, BackendError> {
        let mut url = Url::parse(&self.endpoint).map_err(|e| {
            BackendError::invalid_response(BackendKind::Google, format!("Invalid endpoint URL: {}", e))
        })?;
        url.query_pairs_mut()
            .append_pair("client", "gtx")
            .append_pair("sl", source_language)
            .append_pair("tl", target_language)
            .append_pair("dt", "t")
            .append_pair("q", text);
        Ok(url)
    }

    /// Translate one text through the web endpoint
    async fn translate_one(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, BackendError> {
        let url = self.request_url(text, source_language, target_language)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BackendError::network(BackendKind::Google, format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Google endpoint error ({}): {}", status, error_text);
            return Err(BackendError::from_response(
                BackendKind::Google,
                status.as_u16(),
                error_text,
            ));
        }

        let body: serde_json::Value = response.json().await.map_err(|e| {
            BackendError::invalid_response(
                BackendKind::Google,
                format!("Failed to parse response JSON: {}", e),
            )
        })?;

        // The endpoint answers nested arrays: [[["<translated>", "<source>", ...], ...], ...].
        // The translation of the full input is the concatenation of the
        // first element of each segment array.
        let segments = body
            .get(0)
            .and_then(|v| v.as_array())
            .ok_or_else(|| {
                BackendError::invalid_response(
                    BackendKind::Google,
                    "Response missing translation segments".to_string(),
                )
            })?;

        let mut translated = String::new();
        for segment in segments {
            if let Some(part) = segment.get(0).and_then(|v| v.as_str()) {
                translated.push_str(part);
            }
        }

        if translated.is_empty() {
            return Err(BackendError::invalid_response(
                BackendKind::Google,
                "Response contained no translated text".to_string(),
            ));
        }

        Ok(translated)
    }
}

#[async_trait]
impl TranslationBackend for GoogleBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Google
    }

    async fn translate(&self, request: BatchRequest) -> Result<BatchResponse, BackendError> {
        let mut translations = Vec::with_capacity(request.texts.len());

        for text in &request.texts {
            let translated = self
                .translate_one(text, &request.source_language, &request.target_language)
                .await?;
            translations.push(translated);
        }

        let response = BatchResponse { translations };
        check_response_arity(BackendKind::Google, request.texts.len(), &response)?;
        Ok(response)
    }

    async fn test_connection(&self) -> Result<(), BackendError> {
        self.translate_one("hello", "en", "es").await.map(|_| ())
    }
}
