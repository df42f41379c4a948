/*!
 * Mock backend implementation for testing.
 *
 * This module provides a scriptable backend that simulates different
 * behaviors:
 * - `MockBackend::working()` - Always succeeds with deterministic translations
 * - `MockBackend::failing(...)` - Always fails with the given status
 * - `MockBackend::fail_first(n)` - Fails the first n calls, then succeeds
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::app_config::BackendKind;
use crate::backends::{BatchRequest, BatchResponse, TranslationBackend};
use crate::errors::BackendError;

/// Behavior mode for the mock backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a deterministic per-text translation
    Working,
    /// Always fails with the given HTTP status
    Failing { status: u16 },
    /// Fails the first `failures` calls with the given status, then succeeds
    FailFirst { failures: usize, status: u16 },
    /// Succeeds after a simulated delay
    Slow { delay_ms: u64 },
    /// Returns fewer translations than requested texts
    ShortResponse,
}

/// Mock backend for exercising orchestrator behavior
#[derive(Debug)]
pub struct MockBackend {
    /// Which backend this mock impersonates
    kind: BackendKind,
    /// Behavior mode
    behavior: MockBehavior,
    /// Call counter, shared across clones
    call_count: Arc<AtomicUsize>,
    /// Every request this mock received, in arrival order
    requests: Arc<Mutex<Vec<BatchRequest>>>,
    /// Custom response generator (optional)
    custom_response: Option<fn(&str, &str) -> String>,
}

impl MockBackend {
    /// Create a new mock backend with the specified behavior
    pub fn new(kind: BackendKind, behavior: MockBehavior) -> Self {
        Self {
            kind,
            behavior,
            call_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            custom_response: None,
        }
    }

    /// Create a working mock that always succeeds
    pub fn working() -> Self {
        Self::new(BackendKind::Mock, MockBehavior::Working)
    }

    /// Create a failing mock that always errors with the given status
    pub fn failing(status: u16) -> Self {
        Self::new(BackendKind::Mock, MockBehavior::Failing { status })
    }

    /// Create a mock that fails the first `failures` calls, then succeeds
    pub fn fail_first(failures: usize, status: u16) -> Self {
        Self::new(BackendKind::Mock, MockBehavior::FailFirst { failures, status })
    }

    /// Create a slow mock that succeeds after a delay
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(BackendKind::Mock, MockBehavior::Slow { delay_ms })
    }

    /// Impersonate a specific backend kind
    pub fn as_kind(mut self, kind: BackendKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set a custom response generator taking (text, target_language)
    pub fn with_custom_response(mut self, generator: fn(&str, &str) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Number of translate calls this mock has received
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Snapshot of every request received so far
    pub fn requests(&self) -> Vec<BatchRequest> {
        self.requests.lock().clone()
    }

    /// The deterministic translation this mock produces for a text
    pub fn expected_translation(text: &str, target_language: &str) -> String {
        format!("[{}] {}", target_language, text)
    }

    fn respond(&self, request: &BatchRequest) -> BatchResponse {
        let translations = request
            .texts
            .iter()
            .map(|text| {
                if let Some(generator) = self.custom_response {
                    generator(text, &request.target_language)
                } else {
                    Self::expected_translation(text, &request.target_language)
                }
            })
            .collect();
        BatchResponse { translations }
    }
}

impl Clone for MockBackend {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            behavior: self.behavior,
            call_count: Arc::clone(&self.call_count),
            requests: Arc::clone(&self.requests),
            custom_response: self.custom_response,
        }
    }
}

#[async_trait]
impl TranslationBackend for MockBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn translate(&self, request: BatchRequest) -> Result<BatchResponse, BackendError> {
        let count = self.call_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        match self.behavior {
            MockBehavior::Working => Ok(self.respond(&request)),

            MockBehavior::Failing { status } => Err(BackendError::from_response(
                self.kind,
                status,
                "Simulated backend failure",
            )),

            MockBehavior::FailFirst { failures, status } => {
                if count < failures {
                    Err(BackendError::from_response(
                        self.kind,
                        status,
                        format!("Simulated failure (call #{})", count + 1),
                    ))
                } else {
                    Ok(self.respond(&request))
                }
            }

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                Ok(self.respond(&request))
            }

            MockBehavior::ShortResponse => {
                let mut response = self.respond(&request);
                response.translations.pop();
                Ok(response)
            }
        }
    }

    async fn test_connection(&self) -> Result<(), BackendError> {
        match self.behavior {
            MockBehavior::Failing { status } => Err(BackendError::from_response(
                self.kind,
                status,
                "Simulated connection failure",
            )),
            _ => Ok(()),
        }
    }
}
