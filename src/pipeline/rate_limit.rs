/*!
 * Per-backend request rate limiting.
 *
 * Enforces a minimum inter-request spacing per backend, with an additional
 * size-proportional delay for large batches. Intervals are static
 * configuration reflecting each backend's published throughput ceiling; the
 * limiter does not adapt to observed rate-limit responses.
 */

use std::collections::HashMap;
use std::time::Duration;

use log::debug;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::app_config::BackendKind;

/// Batches above this many characters earn an extra proportional delay
const LARGE_BATCH_CHARS: usize = 1000;

/// Character count per unit of extra delay
const CHAR_THRESHOLD_DIVISOR: usize = 1000;

/// Extra delay per divisor unit, milliseconds
const SCALE_MS: u64 = 100;

/// Enforces minimum spacing between requests, per backend
pub struct RateLimiter {
    /// Minimum interval between two requests, per backend
    min_intervals: HashMap<BackendKind, Duration>,
    /// Timestamp of the last permitted request, per backend
    last_request: Mutex<HashMap<BackendKind, Instant>>,
}

impl RateLimiter {
    /// Create a rate limiter from per-backend minimum intervals
    pub fn new(min_intervals: HashMap<BackendKind, Duration>) -> Self {
        Self {
            min_intervals,
            last_request: Mutex::new(HashMap::new()),
        }
    }

    /// Minimum interval configured for a backend; unknown backends are
    /// unconstrained
    fn min_interval(&self, backend: BackendKind) -> Duration {
        self.min_intervals.get(&backend).copied().unwrap_or(Duration::ZERO)
    }

    /// Suspend until the backend's minimum inter-request spacing allows
    /// another call.
    ///
    /// The last-request stamp is written immediately before returning, after
    /// any sleep, so backpressure compounds correctly under bursts. The
    /// read and the write each happen inside one lock scope, never across
    /// an await point.
    pub async fn wait_for_slot(&self, backend: BackendKind) {
        let min_interval = self.min_interval(backend);

        let wait = {
            let last = self.last_request.lock();
            match last.get(&backend) {
                Some(&stamp) => min_interval.saturating_sub(stamp.elapsed()),
                None => Duration::ZERO,
            }
        };

        if !wait.is_zero() {
            debug!("Rate limiter delaying {} request by {:?}", backend, wait);
            tokio::time::sleep(wait).await;
        }

        self.last_request.lock().insert(backend, Instant::now());
    }

    /// Suspend for a slot, then for an additional delay proportional to the
    /// batch size when it exceeds the large-batch threshold.
    pub async fn wait_for_batch(&self, backend: BackendKind, total_chars: usize) {
        self.wait_for_slot(backend).await;

        if total_chars > LARGE_BATCH_CHARS {
            let extra_ms = (total_chars / CHAR_THRESHOLD_DIVISOR) as u64 * SCALE_MS;
            if extra_ms > 0 {
                debug!(
                    "Rate limiter adding {}ms for a {}-char batch on {}",
                    extra_ms, total_chars, backend
                );
                tokio::time::sleep(Duration::from_millis(extra_ms)).await;
            }
        }
    }
}
