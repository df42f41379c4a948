/*!
 * Backend adapter implementations for remote translation services.
 *
 * This module contains client implementations for the supported backends:
 * - Google: public web translation endpoint
 * - DeepL: DeepL REST API
 * - Mock: scriptable in-process backend for tests
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::app_config::BackendKind;
use crate::errors::BackendError;

/// One batch translation request: several texts, one language pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    /// Texts to translate, dispatched in one backend call
    pub texts: Vec<String>,
    /// Source language code
    pub source_language: String,
    /// Target language code
    pub target_language: String,
}

impl BatchRequest {
    /// Create a new batch request
    pub fn new(
        texts: Vec<String>,
        source_language: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            texts,
            source_language: source_language.into(),
            target_language: target_language.into(),
        }
    }

    /// Total number of characters across all texts
    pub fn total_chars(&self) -> usize {
        self.texts.iter().map(|t| t.chars().count()).sum()
    }
}

/// Response to a batch request: translations in input order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResponse {
    /// Translations, same length and order as the request texts
    pub translations: Vec<String>,
}

/// Common trait for all translation backends
///
/// Adapters perform exactly one attempt per call; retries, fallback and
/// rate limiting are the orchestrator's responsibility.
#[async_trait]
pub trait TranslationBackend: Send + Sync + Debug {
    /// Which backend this adapter talks to
    fn kind(&self) -> BackendKind;

    /// Translate a batch of texts
    ///
    /// # Arguments
    /// * `request` - Texts and language pair to translate
    ///
    /// # Returns
    /// * `Result<BatchResponse, BackendError>` - Translations in input order,
    ///   or a categorized error
    async fn translate(&self, request: BatchRequest) -> Result<BatchResponse, BackendError>;

    /// Test the connection to the backend
    ///
    /// # Returns
    /// * `Result<(), BackendError>` - Ok if the backend is reachable
    async fn test_connection(&self) -> Result<(), BackendError>;
}

/// Verify that a backend answered with one translation per input text
pub(crate) fn check_response_arity(
    backend: BackendKind,
    expected: usize,
    response: &BatchResponse,
) -> Result<(), BackendError> {
    if response.translations.len() != expected {
        return Err(BackendError::invalid_response(
            backend,
            format!(
                "Expected {} translations, backend returned {}",
                expected,
                response.translations.len()
            ),
        ));
    }
    Ok(())
}

pub mod deepl;
pub mod google;
pub mod mock;
