/*!
 * Tests for the translation cache: round-trips, TTL expiry, LRU eviction
 * and statistics.
 */

use std::time::Duration;

use babelflow::app_config::BackendKind;
use babelflow::TranslationCache;

fn cache(max_entries: usize, ttl_secs: u64) -> TranslationCache {
    TranslationCache::new(
        max_entries,
        Duration::from_secs(ttl_secs),
        BackendKind::all().to_vec(),
    )
}

#[tokio::test]
async fn test_cache_roundTrip_shouldReturnStoredTranslation() {
    let cache = cache(10, 3600);
    cache.set("hello", "bonjour", "en", "fr", BackendKind::Google);

    let hit = cache.get("hello", "en", "fr", Some(BackendKind::Google));
    assert_eq!(hit.map(|h| h.translation), Some("bonjour".to_string()));
}

#[tokio::test]
async fn test_cache_get_withMissingKey_shouldReturnNone() {
    let cache = cache(10, 3600);
    assert!(cache.get("nonexistent", "en", "fr", None).is_none());
}

#[tokio::test]
async fn test_cache_get_withDifferentLanguagePair_shouldReturnNone() {
    let cache = cache(10, 3600);
    cache.set("hello", "bonjour", "en", "fr", BackendKind::Google);

    assert!(cache.get("hello", "de", "fr", None).is_none());
    assert!(cache.get("hello", "en", "es", None).is_none());
}

#[tokio::test]
async fn test_cache_get_withoutBackend_shouldScanAllBackends() {
    let cache = cache(10, 3600);
    cache.set("hello", "Hallo", "en", "de", BackendKind::DeepL);

    let hit = cache.get("hello", "en", "de", None).expect("scan should hit");
    assert_eq!(hit.translation, "Hallo");
    assert_eq!(hit.backend, BackendKind::DeepL);
}

#[tokio::test]
async fn test_cache_get_unpinned_shouldScanOnlyConfiguredBackends() {
    let cache = TranslationCache::new(
        10,
        Duration::from_secs(3600),
        vec![BackendKind::Google],
    );
    cache.set("hello", "Hallo", "en", "de", BackendKind::DeepL);

    // The entry exists but DeepL is not in the scan set
    assert!(cache.get("hello", "en", "de", None).is_none());
    assert!(cache.get("hello", "en", "de", Some(BackendKind::DeepL)).is_some());
}

#[tokio::test]
async fn test_cache_get_withWrongBackendPinned_shouldReturnNone() {
    let cache = cache(10, 3600);
    cache.set("hello", "Hallo", "en", "de", BackendKind::DeepL);

    assert!(cache.get("hello", "en", "de", Some(BackendKind::Google)).is_none());
}

#[tokio::test]
async fn test_cache_set_withSameKey_shouldOverwrite() {
    let cache = cache(10, 3600);
    cache.set("hello", "bonjour", "en", "fr", BackendKind::Google);
    cache.set("hello", "salut", "en", "fr", BackendKind::Google);

    let hit = cache.get("hello", "en", "fr", Some(BackendKind::Google));
    assert_eq!(hit.map(|h| h.translation), Some("salut".to_string()));
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn test_cache_get_withNormalizedText_shouldMatchTrimmedKey() {
    let cache = cache(10, 3600);
    cache.set("  hello  ", "bonjour", "en", "fr", BackendKind::Google);

    let hit = cache.get("hello", "en", "fr", Some(BackendKind::Google));
    assert_eq!(hit.map(|h| h.translation), Some("bonjour".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_cache_get_afterTtlElapsed_shouldReturnNoneAndEvict() {
    let cache = cache(10, 60);
    cache.set("hello", "bonjour", "en", "fr", BackendKind::Google);

    tokio::time::advance(Duration::from_secs(61)).await;

    assert!(cache.get("hello", "en", "fr", Some(BackendKind::Google)).is_none());
    // The expired entry is physically removed, not just masked
    assert_eq!(cache.len(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cache_get_beforeTtlElapsed_shouldStillHit() {
    let cache = cache(10, 60);
    cache.set("hello", "bonjour", "en", "fr", BackendKind::Google);

    tokio::time::advance(Duration::from_secs(59)).await;

    assert!(cache.get("hello", "en", "fr", Some(BackendKind::Google)).is_some());
}

#[tokio::test]
async fn test_cache_insertBeyondCapacity_shouldEvictLeastRecentlyUsed() {
    let cache = cache(3, 3600);
    cache.set("one", "un", "en", "fr", BackendKind::Google);
    cache.set("two", "deux", "en", "fr", BackendKind::Google);
    cache.set("three", "trois", "en", "fr", BackendKind::Google);
    cache.set("four", "quatre", "en", "fr", BackendKind::Google);

    assert_eq!(cache.len(), 3);
    assert!(cache.get("one", "en", "fr", None).is_none());
    assert!(cache.get("four", "en", "fr", None).is_some());
}

#[tokio::test]
async fn test_cache_get_shouldRefreshRecencyForEviction() {
    let cache = cache(3, 3600);
    cache.set("one", "un", "en", "fr", BackendKind::Google);
    cache.set("two", "deux", "en", "fr", BackendKind::Google);
    cache.set("three", "trois", "en", "fr", BackendKind::Google);

    // Touch "one" so "two" becomes the LRU entry
    assert!(cache.get("one", "en", "fr", None).is_some());
    cache.set("four", "quatre", "en", "fr", BackendKind::Google);

    assert!(cache.get("one", "en", "fr", None).is_some());
    assert!(cache.get("two", "en", "fr", None).is_none());
}

#[tokio::test]
async fn test_cache_stats_shouldTrackHitRate() {
    let cache = cache(10, 3600);
    cache.set("hello", "bonjour", "en", "fr", BackendKind::Google);

    assert!(cache.get("hello", "en", "fr", None).is_some());
    assert!(cache.get("missing", "en", "fr", None).is_none());

    let stats = cache.stats();
    assert_eq!(stats.size, 1);
    assert_eq!(stats.total_requests, 2);
    assert_eq!(stats.cached_requests, 1);
    assert!((stats.hit_rate - 50.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_cache_stats_withNoRequests_shouldReportZeroHitRate() {
    let cache = cache(10, 3600);
    let stats = cache.stats();

    assert_eq!(stats.total_requests, 0);
    assert_eq!(stats.hit_rate, 0.0);
}

#[tokio::test]
async fn test_cache_clear_shouldEmptyStoreAndResetCounters() {
    let cache = cache(10, 3600);
    cache.set("hello", "bonjour", "en", "fr", BackendKind::Google);
    assert!(cache.get("hello", "en", "fr", None).is_some());

    cache.clear();

    assert!(cache.is_empty());
    let stats = cache.stats();
    assert_eq!(stats.total_requests, 0);
    assert_eq!(stats.cached_requests, 0);
}
