/*!
 * Batch orchestration.
 *
 * Consumes a backlog of pending chunks, partitions it into fixed-size
 * sub-batches, resolves cache hits, dispatches cache misses to a backend
 * adapter behind the rate limiter, applies the fallback backend on failure,
 * and re-queues unrecoverable failures into a bounded-retry queue with a
 * delayed re-attempt. Results are reported per submit call in input order.
 */

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::app_config::{BackendKind, Config};
use crate::backends::{check_response_arity, BatchRequest, TranslationBackend};
use crate::errors::{BackendError, ErrorCategory};
use crate::pipeline::cache::TranslationCache;
use crate::pipeline::chunk::Chunk;
use crate::pipeline::rate_limit::RateLimiter;

/// Caller-assigned opaque identity of a text unit
pub type UnitKey = String;

/// One submission: the chunks of a single text unit plus its language pair
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    /// Caller-assigned identity of the originating text unit
    pub unit: UnitKey,
    /// Chunks to translate, in unit order
    pub chunks: Vec<Chunk>,
    /// Source language code
    pub source_language: String,
    /// Target language code
    pub target_language: String,
}

/// Final disposition of one submitted chunk
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkOutcome {
    /// Translation delivered
    Translated {
        /// The translated text
        translation: String,
        /// Backend that produced it; None for blank chunks resolved locally
        backend: Option<BackendKind>,
        /// Whether the translation came from the cache
        from_cache: bool,
    },
    /// All backends and retries exhausted, or a configuration error
    Failed {
        /// Category of the last failure
        category: ErrorCategory,
        /// Description of the last failure
        message: String,
    },
    /// The originating unit was invalidated while the chunk waited for retry
    Dropped,
    /// The pipeline was shut down before the chunk was dispatched
    Cancelled,
}

impl ChunkOutcome {
    /// Whether this outcome carries a translation
    pub fn is_translated(&self) -> bool {
        matches!(self, Self::Translated { .. })
    }
}

/// A submitted chunk together with its outcome
#[derive(Debug, Clone)]
pub struct TranslatedChunk {
    /// The chunk, with `translation` filled when the outcome is Translated
    pub chunk: Chunk,
    /// How the chunk was resolved
    pub outcome: ChunkOutcome,
}

/// Per-submission result, chunks in input order
#[derive(Debug, Clone)]
pub struct SubmitResult {
    /// One entry per submitted chunk, in input order
    pub chunks: Vec<TranslatedChunk>,
}

impl SubmitResult {
    /// Whether every chunk was translated
    pub fn is_complete(&self) -> bool {
        self.chunks.iter().all(|c| c.outcome.is_translated())
    }
}

/// A chunk in flight through the dispatch/retry machinery
struct PendingChunk {
    /// Originating text unit
    unit: UnitKey,
    /// Text to translate
    text: String,
    /// Source language code
    source_language: String,
    /// Target language code
    target_language: String,
    /// Number of full dispatch failures so far
    retry_count: u32,
    /// Last failure seen on dispatch, reported if retries run out
    last_error: Option<BackendError>,
    /// Completion channel back to the submitting caller
    tx: oneshot::Sender<ChunkOutcome>,
}

impl PendingChunk {
    fn resolve(self, outcome: ChunkOutcome) {
        // The caller may have gone away; a dead receiver is not an error.
        let _ = self.tx.send(outcome);
    }
}

/// Clears the dispatch-pass flag when the owning future completes or is
/// dropped mid-pass.
struct PassGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Tunables for the orchestrator, derived from [`Config`]
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Backend tried first for every sub-batch
    pub primary_backend: BackendKind,
    /// Backend tried when the primary fails, if configured
    pub fallback_backend: Option<BackendKind>,
    /// Number of chunks per sub-batch
    pub batch_size: usize,
    /// Fixed delay between consecutive sub-batches
    pub batch_interval: Duration,
    /// Delay before a retry-queue pass
    pub retry_delay: Duration,
    /// Maximum full-failure cycles before a chunk fails permanently
    pub max_retry_count: u32,
    /// Per-backend timeout for one adapter call
    pub request_timeouts: HashMap<BackendKind, Duration>,
}

impl OrchestratorSettings {
    /// Derive settings from the pipeline configuration
    pub fn from_config(config: &Config) -> Self {
        let mut request_timeouts = HashMap::new();
        for kind in config.configured_backends() {
            request_timeouts.insert(kind, Duration::from_secs(config.get_timeout_secs(kind)));
        }

        Self {
            primary_backend: config.primary_backend,
            fallback_backend: config.fallback_backend,
            batch_size: config.batch.batch_size,
            batch_interval: Duration::from_millis(config.batch.batch_interval_ms),
            retry_delay: Duration::from_millis(config.batch.retry_delay_ms),
            max_retry_count: config.batch.max_retry_count,
            request_timeouts,
        }
    }
}

/// Turns bursts of pending chunks into rate-limited, cached, retried,
/// backend-dispatched requests.
pub struct BatchOrchestrator {
    /// Backend adapters, keyed by kind
    backends: HashMap<BackendKind, Arc<dyn TranslationBackend>>,
    /// Shared translation cache
    cache: Arc<TranslationCache>,
    /// Shared per-backend rate limiter
    limiter: Arc<RateLimiter>,
    /// Orchestration tunables
    settings: OrchestratorSettings,
    /// Backlog of chunks awaiting dispatch
    pending: Mutex<VecDeque<PendingChunk>>,
    /// Chunks that failed on every configured backend in a pass
    retry_queue: Mutex<Vec<PendingChunk>>,
    /// Re-entrancy flag: at most one dispatch pass runs at a time
    pass_active: AtomicBool,
    /// Cancellation flag checked before each sub-batch and retry cycle
    active: AtomicBool,
    /// Units invalidated by the caller; their retry items are dropped silently
    invalidated: Mutex<HashSet<UnitKey>>,
}

impl BatchOrchestrator {
    /// Create an orchestrator over the given backends, cache and limiter
    pub fn new(
        backends: HashMap<BackendKind, Arc<dyn TranslationBackend>>,
        cache: Arc<TranslationCache>,
        limiter: Arc<RateLimiter>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            backends,
            cache,
            limiter,
            settings,
            pending: Mutex::new(VecDeque::new()),
            retry_queue: Mutex::new(Vec::new()),
            pass_active: AtomicBool::new(false),
            active: AtomicBool::new(true),
            invalidated: Mutex::new(HashSet::new()),
        }
    }

    /// Look up a registered backend adapter
    pub fn backend(&self, kind: BackendKind) -> Option<Arc<dyn TranslationBackend>> {
        self.backends.get(&kind).cloned()
    }

    /// Whether the orchestrator is still accepting and dispatching work
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Stop dispatching: in-flight backend calls complete, but no new
    /// sub-batch is started and no retry is scheduled.
    pub fn shutdown(&self) {
        self.active.store(false, Ordering::SeqCst);
        info!("Orchestrator shut down; pending work will be cancelled");
    }

    /// Mark a text unit as gone; its queued retries are dropped silently.
    pub fn invalidate_unit(&self, unit: &str) {
        self.invalidated.lock().insert(unit.to_string());
        debug!("Unit '{}' invalidated", unit);
    }

    /// Submit the chunks of one text unit for translation.
    ///
    /// Resolves cache hits immediately, enqueues misses into the shared
    /// backlog, and drives the dispatch pass unless one is already running.
    /// Results are reported in input order regardless of which sub-batch or
    /// retry cycle resolved them. Ordinary backend flakiness never surfaces
    /// as an error here; it shows up as per-chunk `Failed` outcomes.
    pub async fn submit(&self, request: SubmitRequest) -> SubmitResult {
        let SubmitRequest {
            unit,
            chunks,
            source_language,
            target_language,
        } = request;

        let mut outcomes: Vec<Option<ChunkOutcome>> = Vec::with_capacity(chunks.len());
        outcomes.resize_with(chunks.len(), || None);
        let mut receivers: Vec<(usize, oneshot::Receiver<ChunkOutcome>)> = Vec::new();
        let mut enqueued = 0usize;

        {
            let mut pending = self.pending.lock();
            for (index, chunk) in chunks.iter().enumerate() {
                if !self.is_active() {
                    outcomes[index] = Some(ChunkOutcome::Cancelled);
                    continue;
                }

                if chunk.text.trim().is_empty() {
                    // Nothing to translate; deliver the blank as-is.
                    outcomes[index] = Some(ChunkOutcome::Translated {
                        translation: String::new(),
                        backend: None,
                        from_cache: false,
                    });
                    continue;
                }

                if let Some(hit) =
                    self.cache
                        .get(&chunk.text, &source_language, &target_language, None)
                {
                    outcomes[index] = Some(ChunkOutcome::Translated {
                        translation: hit.translation,
                        backend: Some(hit.backend),
                        from_cache: true,
                    });
                    continue;
                }

                let (tx, rx) = oneshot::channel();
                pending.push_back(PendingChunk {
                    unit: unit.clone(),
                    text: chunk.text.clone(),
                    source_language: source_language.clone(),
                    target_language: target_language.clone(),
                    retry_count: 0,
                    last_error: None,
                    tx,
                });
                receivers.push((index, rx));
                enqueued += 1;
            }
        }

        if enqueued > 0 {
            debug!(
                "Unit '{}': {} of {} chunks enqueued ({} resolved locally)",
                unit,
                enqueued,
                chunks.len(),
                chunks.len() - enqueued
            );
            self.drive_dispatch().await;
        }

        for (index, rx) in receivers {
            // A dropped sender means the orchestrator went away mid-flight.
            outcomes[index] = Some(rx.await.unwrap_or(ChunkOutcome::Cancelled));
        }

        let translated = chunks
            .into_iter()
            .zip(outcomes)
            .map(|(mut chunk, outcome)| {
                let outcome = outcome.unwrap_or(ChunkOutcome::Cancelled);
                if let ChunkOutcome::Translated { translation, .. } = &outcome {
                    chunk.translation = Some(translation.clone());
                }
                TranslatedChunk { chunk, outcome }
            })
            .collect();

        SubmitResult { chunks: translated }
    }

    /// Become the dispatcher unless a pass already runs. Re-checks the
    /// backlog after releasing the pass flag so work enqueued during the
    /// hand-off window is never stranded.
    ///
    /// The pass runs inside the submitting caller's future; the guard clears
    /// the flag even when that future is dropped mid-pass, so an abandoned
    /// caller cannot wedge later submissions.
    async fn drive_dispatch(&self) {
        loop {
            if self.pass_active.swap(true, Ordering::SeqCst) {
                // Another submit call is draining the shared backlog; it
                // re-checks after finishing and will pick our chunks up.
                return;
            }

            let guard = PassGuard {
                flag: &self.pass_active,
            };
            self.run_pass().await;
            drop(guard);

            let backlog_left = {
                !self.pending.lock().is_empty() || !self.retry_queue.lock().is_empty()
            };
            if !backlog_left {
                return;
            }
        }
    }

    /// One logical pass: drain the pending backlog in sub-batches, then run
    /// delayed retry cycles until the retry queue is empty.
    async fn run_pass(&self) {
        loop {
            loop {
                if !self.is_active() {
                    self.cancel_outstanding();
                    return;
                }

                let batch = self.drain_sub_batch();
                if batch.is_empty() {
                    break;
                }

                self.dispatch_sub_batch(batch).await;

                if !self.pending.lock().is_empty() {
                    tokio::time::sleep(self.settings.batch_interval).await;
                }
            }

            if self.retry_queue.lock().is_empty() {
                return;
            }
            if !self.is_active() {
                self.cancel_outstanding();
                return;
            }

            debug!("Retry queue non-empty; re-attempt in {:?}", self.settings.retry_delay);
            tokio::time::sleep(self.settings.retry_delay).await;
            self.fire_retry_cycle();
        }
    }

    /// Pull up to `batch_size` consecutive chunks sharing one language pair
    fn drain_sub_batch(&self) -> Vec<PendingChunk> {
        let mut pending = self.pending.lock();
        let mut batch = Vec::new();

        let Some(front) = pending.front() else {
            return batch;
        };
        let pair = (front.source_language.clone(), front.target_language.clone());

        while batch.len() < self.settings.batch_size {
            let matches = pending
                .front()
                .map_or(false, |item| item.source_language == pair.0 && item.target_language == pair.1);
            if !matches {
                break;
            }
            if let Some(item) = pending.pop_front() {
                batch.push(item);
            }
        }

        batch
    }

    /// Dispatch one sub-batch: cache re-check, rate-limited primary call,
    /// fallback call, then retry-queue or permanent failure.
    async fn dispatch_sub_batch(&self, batch: Vec<PendingChunk>) {
        // Retried chunks re-enter here; a sibling submission may have
        // translated the same text in the meantime.
        let mut misses = Vec::with_capacity(batch.len());
        for item in batch {
            if let Some(hit) =
                self.cache
                    .get(&item.text, &item.source_language, &item.target_language, None)
            {
                item.resolve(ChunkOutcome::Translated {
                    translation: hit.translation,
                    backend: Some(hit.backend),
                    from_cache: true,
                });
            } else {
                misses.push(item);
            }
        }

        if misses.is_empty() {
            return;
        }

        let source_language = misses[0].source_language.clone();
        let target_language = misses[0].target_language.clone();
        let texts: Vec<String> = misses.iter().map(|item| item.text.clone()).collect();
        let request = BatchRequest::new(texts, source_language, target_language);
        let total_chars = request.total_chars();

        info!(
            "Dispatching sub-batch of {} chunks ({} chars) to {}",
            misses.len(),
            total_chars,
            self.settings.primary_backend
        );

        let primary_error = match self
            .call_backend(self.settings.primary_backend, &request, total_chars)
            .await
        {
            Ok(translations) => {
                self.deliver(misses, translations, &request, self.settings.primary_backend);
                return;
            }
            Err(e) => e,
        };

        warn!(
            "Sub-batch failed on {}: {}",
            self.settings.primary_backend, primary_error
        );

        let final_error = match self.fallback_kind() {
            Some(fallback) => {
                info!("Retrying sub-batch on fallback backend {}", fallback);
                match self.call_backend(fallback, &request, total_chars).await {
                    Ok(translations) => {
                        self.deliver(misses, translations, &request, fallback);
                        return;
                    }
                    Err(e) => {
                        warn!("Sub-batch failed on fallback {}: {}", fallback, e);
                        e
                    }
                }
            }
            None => primary_error,
        };

        if !final_error.is_retryable() {
            // Credential problems are configuration errors; re-dispatching
            // the same key cannot succeed.
            error!(
                "Sub-batch failed with non-retryable {}: {}",
                final_error.category, final_error
            );
            for item in misses {
                item.resolve(ChunkOutcome::Failed {
                    category: final_error.category,
                    message: final_error.message.clone(),
                });
            }
            return;
        }

        let mut retry_queue = self.retry_queue.lock();
        for mut item in misses {
            item.retry_count += 1;
            item.last_error = Some(final_error.clone());
            debug!(
                "Chunk from unit '{}' queued for retry #{}",
                item.unit, item.retry_count
            );
            retry_queue.push(item);
        }
    }

    /// One rate-limited, timeout-guarded adapter call
    async fn call_backend(
        &self,
        kind: BackendKind,
        request: &BatchRequest,
        total_chars: usize,
    ) -> Result<Vec<String>, BackendError> {
        let Some(backend) = self.backends.get(&kind) else {
            return Err(BackendError::invalid_response(
                kind,
                format!("No adapter registered for backend '{}'", kind),
            ));
        };

        self.limiter.wait_for_batch(kind, total_chars).await;

        let timeout = self
            .settings
            .request_timeouts
            .get(&kind)
            .copied()
            .unwrap_or(Duration::from_secs(30));

        let response = match tokio::time::timeout(timeout, backend.translate(request.clone())).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(BackendError::network(
                    kind,
                    format!("Backend call timed out after {:?}", timeout),
                ));
            }
        };

        // A short answer would silently starve the tail chunks of the batch
        check_response_arity(kind, request.texts.len(), &response)?;

        Ok(response.translations)
    }

    /// Write results through to the cache and resolve each chunk
    fn deliver(
        &self,
        items: Vec<PendingChunk>,
        translations: Vec<String>,
        request: &BatchRequest,
        backend: BackendKind,
    ) {
        for (item, translation) in items.into_iter().zip(translations) {
            self.cache.set(
                &item.text,
                &translation,
                &request.source_language,
                &request.target_language,
                backend,
            );
            item.resolve(ChunkOutcome::Translated {
                translation,
                backend: Some(backend),
                from_cache: false,
            });
        }
    }

    /// The fallback backend, when configured and distinct from the primary
    fn fallback_kind(&self) -> Option<BackendKind> {
        self.settings
            .fallback_backend
            .filter(|fb| *fb != self.settings.primary_backend)
    }

    /// Move ripe retry items back into the pending backlog; drop invalidated
    /// units silently and exhausted items with a permanent failure.
    fn fire_retry_cycle(&self) {
        let items: Vec<PendingChunk> = std::mem::take(&mut *self.retry_queue.lock());
        let invalidated = self.invalidated.lock().clone();

        let mut requeued = 0usize;
        let mut dropped = 0usize;
        let mut exhausted = 0usize;

        let mut pending = self.pending.lock();
        for item in items {
            if invalidated.contains(&item.unit) {
                dropped += 1;
                item.resolve(ChunkOutcome::Dropped);
                continue;
            }

            if item.retry_count >= self.settings.max_retry_count {
                exhausted += 1;
                error!(
                    "Chunk from unit '{}' permanently failed after {} retries",
                    item.unit, item.retry_count
                );
                let retries = item.retry_count;
                let (category, cause) = item
                    .last_error
                    .as_ref()
                    .map(|e| (e.category, e.message.clone()))
                    .unwrap_or((ErrorCategory::Unknown, "unknown failure".to_string()));
                item.resolve(ChunkOutcome::Failed {
                    category,
                    message: format!(
                        "Translation failed after {} retry cycles: {}",
                        retries, cause
                    ),
                });
                continue;
            }

            requeued += 1;
            pending.push_back(item);
        }

        info!(
            "Retry cycle: {} re-queued, {} dropped, {} permanently failed",
            requeued, dropped, exhausted
        );
    }

    /// Resolve everything still queued as cancelled
    fn cancel_outstanding(&self) {
        let pending: Vec<PendingChunk> = self.pending.lock().drain(..).collect();
        let retries: Vec<PendingChunk> = std::mem::take(&mut *self.retry_queue.lock());

        let count = pending.len() + retries.len();
        if count > 0 {
            warn!("Cancelling {} outstanding chunks", count);
        }
        for item in pending.into_iter().chain(retries) {
            item.resolve(ChunkOutcome::Cancelled);
        }
    }
}
