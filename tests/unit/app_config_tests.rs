/*!
 * Tests for configuration parsing, defaults and validation
 */

use std::str::FromStr;

use babelflow::app_config::{BackendKind, Config};

use crate::common::{dual_backend_config, mock_config};

#[test]
fn test_config_default_shouldValidate() {
    let config = Config::default();
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_default_shouldCarryDocumentedDefaults() {
    let config = Config::default();
    assert_eq!(config.batch.batch_size, 10);
    assert_eq!(config.batch.max_chunk_length, 500);
    assert_eq!(config.batch.max_chunk_sentences, 5);
    assert_eq!(config.batch.max_retry_count, 3);
    assert_eq!(config.batch.min_text_length, 3);
    assert_eq!(config.cache.max_entries, 1000);
    assert_eq!(config.cache.ttl_secs, 3600);
}

#[test]
fn test_backendKind_fromStr_shouldParseKnownBackends() {
    assert_eq!(BackendKind::from_str("google").unwrap(), BackendKind::Google);
    assert_eq!(BackendKind::from_str("DeepL").unwrap(), BackendKind::DeepL);
    assert_eq!(BackendKind::from_str("mock").unwrap(), BackendKind::Mock);
    assert!(BackendKind::from_str("bing").is_err());
}

#[test]
fn test_backendKind_display_shouldBeLowercase() {
    assert_eq!(BackendKind::Google.to_string(), "google");
    assert_eq!(BackendKind::DeepL.to_string(), "deepl");
}

#[test]
fn test_config_validate_withSameSourceAndTarget_shouldFail() {
    let mut config = mock_config();
    config.target_language = config.source_language.clone();
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validate_withInvalidLanguageCode_shouldFail() {
    let mut config = mock_config();
    config.source_language = "klingon".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validate_withDeeplAndNoApiKey_shouldFail() {
    let mut config = dual_backend_config();
    for backend in &mut config.backends {
        backend.api_key = String::new();
    }
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validate_withFallbackEqualToPrimary_shouldFail() {
    let mut config = mock_config();
    config.fallback_backend = Some(BackendKind::Mock);
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validate_withZeroCacheSize_shouldFail() {
    let mut config = mock_config();
    config.cache.max_entries = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validate_withZeroBatchSize_shouldFail() {
    let mut config = mock_config();
    config.batch.batch_size = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_config_jsonRoundTrip_shouldPreserveFields() {
    let config = dual_backend_config();
    let json = serde_json::to_string(&config).unwrap();
    let parsed: Config = serde_json::from_str(&json).unwrap();

    assert_eq!(parsed.source_language, config.source_language);
    assert_eq!(parsed.target_language, config.target_language);
    assert_eq!(parsed.primary_backend, config.primary_backend);
    assert_eq!(parsed.fallback_backend, config.fallback_backend);
    assert_eq!(parsed.batch.batch_size, config.batch.batch_size);
}

#[test]
fn test_config_fromJson_withMissingOptionalFields_shouldApplyDefaults() {
    let json = r#"{
        "source_language": "en",
        "target_language": "ko",
        "primary_backend": "google"
    }"#;
    let config: Config = serde_json::from_str(json).unwrap();

    assert_eq!(config.primary_backend, BackendKind::Google);
    assert!(config.fallback_backend.is_none());
    assert_eq!(config.batch.batch_size, 10);
    assert_eq!(config.cache.max_entries, 1000);
    assert!(!config.backends.is_empty());
}

#[test]
fn test_config_getMinIntervalMs_shouldFallBackToBackendDefault() {
    let config = Config {
        backends: Vec::new(),
        ..mock_config()
    };
    assert_eq!(config.get_min_interval_ms(BackendKind::Google), 1000);
    assert_eq!(config.get_min_interval_ms(BackendKind::Mock), 0);
}

#[test]
fn test_config_configuredBackends_shouldListPrimaryFirst() {
    let config = dual_backend_config();
    let backends = config.configured_backends();
    assert_eq!(backends, vec![BackendKind::Google, BackendKind::DeepL]);
}
