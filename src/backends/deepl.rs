use log::error;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use async_trait::async_trait;

use crate::app_config::BackendKind;
use crate::backends::{check_response_arity, BatchRequest, BatchResponse, TranslationBackend};
use crate::errors::BackendError;

/// Client for the DeepL REST API
///
/// DeepL accepts several `text` parameters per request, so a whole batch
/// goes out as one HTTP call.
#[derive(Debug)]
pub struct DeepLBackend {
    /// Endpoint URL of the translate route
    endpoint: String,
    /// API key sent as the DeepL-Auth-Key header
    api_key: String,
    /// HTTP client for making requests
    client: Client,
}

/// Translate response from the DeepL API
#[derive(Debug, Deserialize)]
struct DeepLResponse {
    /// One entry per requested text, in request order
    translations: Vec<DeepLTranslation>,
}

/// Single translation entry in a DeepL response
#[derive(Debug, Deserialize)]
struct DeepLTranslation {
    /// Language DeepL detected for the source text
    #[serde(default)]
    #[allow(dead_code)]
    detected_source_language: Option<String>,
    /// Translated text
    text: String,
}

impl DeepLBackend {
    /// Create a new DeepL backend
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .pool_idle_timeout(Duration::from_secs(90))
                .tcp_keepalive(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
        }
    }

    /// DeepL wants upper-case language codes ("EN", "KO")
    fn normalize_lang(code: &str) -> String {
        code.trim().to_uppercase()
    }
}

#[async_trait]
impl TranslationBackend for DeepLBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::DeepL
    }

    async fn translate(&self, request: BatchRequest) -> Result<BatchResponse, BackendError> {
        let mut form: Vec<(&str, String)> = request
            .texts
            .iter()
            .map(|t| ("text", t.clone()))
            .collect();
        form.push(("source_lang", Self::normalize_lang(&request.source_language)));
        form.push(("target_lang", Self::normalize_lang(&request.target_language)));

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("DeepL-Auth-Key {}", self.api_key))
            .form(&form)
            .send()
            .await
            .map_err(|e| BackendError::network(BackendKind::DeepL, format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("DeepL API error ({}): {}", status, error_text);
            return Err(BackendError::from_response(
                BackendKind::DeepL,
                status.as_u16(),
                error_text,
            ));
        }

        let parsed: DeepLResponse = response.json().await.map_err(|e| {
            BackendError::invalid_response(
                BackendKind::DeepL,
                format!("Failed to parse response JSON: {}", e),
            )
        })?;

        let batch_response = BatchResponse {
            translations: parsed.translations.into_iter().map(|t| t.text).collect(),
        };
        check_response_arity(BackendKind::DeepL, request.texts.len(), &batch_response)?;
        Ok(batch_response)
    }

    async fn test_connection(&self) -> Result<(), BackendError> {
        let request = BatchRequest::new(vec!["hello".to_string()], "en", "de");
        self.translate(request).await.map(|_| ())
    }
}
