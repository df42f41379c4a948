/*!
 * The batch translation pipeline.
 *
 * This module wires the pipeline stages together:
 * - `segment`: sentence segmentation with exact offsets
 * - `chunk`: size- and count-bounded chunking of sentences
 * - `cache`: bounded, TTL'd, LRU-evicted translation cache
 * - `rate_limit`: per-backend request spacing
 * - `orchestrator`: batched, cached, retried backend dispatch
 */

pub mod cache;
pub mod chunk;
pub mod orchestrator;
pub mod rate_limit;
pub mod segment;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use log::info;

use crate::app_config::{BackendKind, Config};
use crate::backends::deepl::DeepLBackend;
use crate::backends::google::GoogleBackend;
use crate::backends::mock::MockBackend;
use crate::backends::TranslationBackend;
use crate::errors::{BackendError, PipelineError};

use cache::{CacheStats, TranslationCache};
use chunk::{join_translations, Chunk, Chunker};
use orchestrator::{BatchOrchestrator, OrchestratorSettings, SubmitRequest, SubmitResult};
use rate_limit::RateLimiter;
use segment::Segmenter;

/// Main entry point: owns every pipeline stage as an explicit instance.
///
/// Construct one pipeline per configuration; tests can instantiate isolated
/// pipelines with injected backends via [`TranslationPipeline::with_backends`].
pub struct TranslationPipeline {
    /// Active configuration
    config: Config,
    /// Sentence segmenter
    segmenter: Segmenter,
    /// Sentence-to-chunk packer
    chunker: Chunker,
    /// Shared translation cache
    cache: Arc<TranslationCache>,
    /// Batch orchestrator
    orchestrator: BatchOrchestrator,
}

impl TranslationPipeline {
    /// Create a pipeline from configuration, constructing the HTTP backend
    /// adapters the configuration names.
    pub fn new(config: Config) -> Result<Self> {
        let backends = Self::build_backends(&config);
        Self::with_backends(config, backends)
    }

    /// Create a pipeline with injected backend adapters
    pub fn with_backends(
        config: Config,
        backends: HashMap<BackendKind, Arc<dyn TranslationBackend>>,
    ) -> Result<Self> {
        config.validate()?;

        let cache = Arc::new(TranslationCache::new(
            config.cache.max_entries,
            Duration::from_secs(config.cache.ttl_secs),
            config.configured_backends(),
        ));
        let limiter = Arc::new(RateLimiter::new(Self::min_intervals(&config)));
        let orchestrator = BatchOrchestrator::new(
            backends,
            Arc::clone(&cache),
            limiter,
            OrchestratorSettings::from_config(&config),
        );

        Ok(Self {
            segmenter: Segmenter::new(config.batch.min_text_length),
            chunker: Chunker::new(config.batch.max_chunk_length, config.batch.max_chunk_sentences),
            cache,
            orchestrator,
            config,
        })
    }

    /// Build the adapters for every backend the configuration dispatches to
    fn build_backends(config: &Config) -> HashMap<BackendKind, Arc<dyn TranslationBackend>> {
        let mut backends: HashMap<BackendKind, Arc<dyn TranslationBackend>> = HashMap::new();

        for kind in config.configured_backends() {
            let adapter: Arc<dyn TranslationBackend> = match kind {
                BackendKind::Google => Arc::new(GoogleBackend::new(
                    config.get_endpoint(kind),
                    config.get_timeout_secs(kind),
                )),
                BackendKind::DeepL => Arc::new(DeepLBackend::new(
                    config.get_endpoint(kind),
                    config.get_api_key(kind),
                    config.get_timeout_secs(kind),
                )),
                BackendKind::Mock => Arc::new(MockBackend::working()),
            };
            backends.insert(kind, adapter);
        }

        backends
    }

    /// Per-backend minimum request intervals from configuration
    fn min_intervals(config: &Config) -> HashMap<BackendKind, Duration> {
        config
            .configured_backends()
            .into_iter()
            .map(|kind| (kind, Duration::from_millis(config.get_min_interval_ms(kind))))
            .collect()
    }

    /// The active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Split a text unit into backend-sized chunks
    pub fn prepare_chunks(&self, text: &str) -> Vec<Chunk> {
        let sentences = self.segmenter.segment(text);
        self.chunker.chunk(&sentences)
    }

    /// Translate one text unit end to end: segment, chunk, submit, and
    /// reassemble the chunk translations in unit order.
    ///
    /// Returns the assembled translation, or a per-unit failure when any
    /// chunk exhausted its retries.
    pub async fn translate_unit(
        &self,
        unit: impl Into<String>,
        text: &str,
    ) -> Result<String, PipelineError> {
        let unit = unit.into();
        let chunks = self.prepare_chunks(text);
        let total = chunks.len();

        let result = self
            .submit(SubmitRequest {
                unit: unit.clone(),
                chunks,
                source_language: self.config.source_language.clone(),
                target_language: self.config.target_language.clone(),
            })
            .await;

        if !result.is_complete() {
            let failed = result
                .chunks
                .iter()
                .filter(|c| !c.outcome.is_translated())
                .count();
            return Err(PipelineError::UnitFailed { unit, failed, total });
        }

        Ok(join_translations(
            result
                .chunks
                .iter()
                .filter_map(|c| c.chunk.translation.as_deref()),
        ))
    }

    /// Submit pre-chunked work; results come back in input order
    pub async fn submit(&self, request: SubmitRequest) -> SubmitResult {
        self.orchestrator.submit(request).await
    }

    /// Mark a text unit as gone so its queued retries are dropped silently
    pub fn invalidate_unit(&self, unit: &str) {
        self.orchestrator.invalidate_unit(unit);
    }

    /// Stop dispatching new sub-batches; in-flight calls complete
    pub fn shutdown(&self) {
        self.orchestrator.shutdown();
    }

    /// Whether the pipeline is still dispatching
    pub fn is_active(&self) -> bool {
        self.orchestrator.is_active()
    }

    /// Cache statistics snapshot
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Test the connection to the primary backend
    pub async fn test_connection(&self) -> Result<(), BackendError> {
        let kind = self.config.primary_backend;
        match self.orchestrator.backend(kind) {
            Some(adapter) => {
                info!("Testing connection to {}", kind.display_name());
                adapter.test_connection().await
            }
            None => Err(BackendError::invalid_response(
                kind,
                format!("No adapter registered for backend '{}'", kind),
            )),
        }
    }

    /// Swap in a new configuration.
    ///
    /// Cached results are backend/language-pair specific, so the cache is
    /// cleared as part of the swap.
    pub fn update_config(&mut self, config: Config) -> Result<()> {
        let backends = Self::build_backends(&config);
        let rebuilt = Self::with_backends(config, backends)?;
        self.cache.clear();
        *self = rebuilt;
        info!("Pipeline configuration updated; cache cleared");
        Ok(())
    }
}
