use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::Path;

/// Pipeline configuration module
/// This module handles the pipeline configuration including loading,
/// validating and saving configuration settings.
/// Represents the pipeline configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code (ISO)
    pub source_language: String,

    /// Target language code (ISO)
    pub target_language: String,

    /// Primary translation backend
    pub primary_backend: BackendKind,

    /// Optional fallback backend used when the primary fails
    #[serde(default)]
    pub fallback_backend: Option<BackendKind>,

    /// Per-backend settings
    #[serde(default = "default_backends")]
    pub backends: Vec<BackendConfig>,

    /// Cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Batching and retry settings
    #[serde(default)]
    pub batch: BatchConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation backend type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    // @backend: Google web translation endpoint
    #[default]
    Google,
    // @backend: DeepL REST API
    DeepL,
    // @backend: In-process mock, for tests and dry runs
    Mock,
}

impl BackendKind {
    // @returns: Capitalized backend name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Google => "Google",
            Self::DeepL => "DeepL",
            Self::Mock => "Mock",
        }
    }

    // @returns: Lowercase backend identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Google => "google".to_string(),
            Self::DeepL => "deepl".to_string(),
            Self::Mock => "mock".to_string(),
        }
    }

    /// All backend kinds
    pub fn all() -> &'static [BackendKind] {
        &[Self::Google, Self::DeepL, Self::Mock]
    }
}

// Implement Display trait for BackendKind
impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

// Implement FromStr trait for BackendKind
impl std::str::FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "deepl" => Ok(Self::DeepL),
            "mock" => Ok(Self::Mock),
            _ => Err(anyhow!("Invalid backend type: {}", s)),
        }
    }
}

/// Backend configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BackendConfig {
    // @field: Backend type identifier
    #[serde(rename = "type")]
    pub backend_type: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Minimum spacing between requests, milliseconds
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,

    // @field: Timeout seconds for one backend call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl BackendConfig {
    // @param backend_type: Backend enum
    // @returns: Backend config with defaults
    pub fn new(backend_type: BackendKind) -> Self {
        match backend_type {
            BackendKind::Google => Self {
                backend_type: "google".to_string(),
                api_key: String::new(),
                endpoint: default_google_endpoint(),
                min_interval_ms: default_google_min_interval_ms(),
                timeout_secs: default_timeout_secs(),
            },
            BackendKind::DeepL => Self {
                backend_type: "deepl".to_string(),
                api_key: String::new(),
                endpoint: default_deepl_endpoint(),
                min_interval_ms: default_deepl_min_interval_ms(),
                timeout_secs: default_timeout_secs(),
            },
            BackendKind::Mock => Self {
                backend_type: "mock".to_string(),
                api_key: String::new(),
                endpoint: String::new(),
                min_interval_ms: 0,
                timeout_secs: default_timeout_secs(),
            },
        }
    }
}

/// Translation cache configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached translations
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,

    /// Entry time-to-live in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_cache_max_entries(),
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

/// Batching, chunking and retry configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BatchConfig {
    /// Number of chunks dispatched in one backend call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Fixed delay between consecutive sub-batches, milliseconds
    #[serde(default = "default_batch_interval_ms")]
    pub batch_interval_ms: u64,

    /// Delay before a retry-queue pass, milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Maximum retry cycles for a failed chunk
    #[serde(default = "default_max_retry_count")]
    pub max_retry_count: u32,

    /// Maximum characters per chunk
    #[serde(default = "default_max_chunk_length")]
    pub max_chunk_length: usize,

    /// Maximum sentences per chunk
    #[serde(default = "default_max_chunk_sentences")]
    pub max_chunk_sentences: usize,

    /// Minimum sentence length kept by the segmenter
    #[serde(default = "default_min_text_length")]
    pub min_text_length: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            batch_interval_ms: default_batch_interval_ms(),
            retry_delay_ms: default_retry_delay_ms(),
            max_retry_count: default_max_retry_count(),
            max_chunk_length: default_max_chunk_length(),
            max_chunk_sentences: default_max_chunk_sentences(),
            min_text_length: default_min_text_length(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_min_interval_ms() -> u64 {
    1000
}

fn default_google_min_interval_ms() -> u64 {
    // The public web endpoint tolerates roughly one request per second
    1000
}

fn default_deepl_min_interval_ms() -> u64 {
    500
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_google_endpoint() -> String {
    "https://translate.googleapis.com/translate_a/single".to_string()
}

fn default_deepl_endpoint() -> String {
    "https://api-free.deepl.com/v2/translate".to_string()
}

fn default_cache_max_entries() -> usize {
    1000
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

fn default_batch_size() -> usize {
    10
}

fn default_batch_interval_ms() -> u64 {
    500
}

fn default_retry_delay_ms() -> u64 {
    5000
}

fn default_max_retry_count() -> u32 {
    3
}

fn default_max_chunk_length() -> usize {
    500
}

fn default_max_chunk_sentences() -> usize {
    5
}

fn default_min_text_length() -> usize {
    3
}

fn default_backends() -> Vec<BackendConfig> {
    vec![
        BackendConfig::new(BackendKind::Google),
        BackendConfig::new(BackendKind::DeepL),
    ]
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path.as_ref().display(), e))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path.as_ref().display(), e))?;
        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        // Validate languages
        crate::language_utils::validate_language_code(&self.source_language)?;
        crate::language_utils::validate_language_code(&self.target_language)?;

        if self.source_language.trim().eq_ignore_ascii_case(self.target_language.trim()) {
            return Err(anyhow!(
                "Source and target language must differ: {}",
                self.source_language
            ));
        }

        // Every dispatchable backend must carry a configuration entry
        if self.get_backend_config(self.primary_backend).is_none() && self.primary_backend != BackendKind::Mock {
            return Err(anyhow!(
                "No configuration entry for primary backend '{}'",
                self.primary_backend
            ));
        }
        if let Some(fallback) = self.fallback_backend {
            if fallback == self.primary_backend {
                return Err(anyhow!("Fallback backend must differ from the primary backend"));
            }
            if self.get_backend_config(fallback).is_none() && fallback != BackendKind::Mock {
                return Err(anyhow!("No configuration entry for fallback backend '{}'", fallback));
            }
        }

        // DeepL requires an API key
        for kind in [Some(self.primary_backend), self.fallback_backend].into_iter().flatten() {
            if kind == BackendKind::DeepL {
                let api_key = self.get_api_key(kind);
                if api_key.is_empty() {
                    return Err(anyhow!("API key is required for the DeepL backend"));
                }
            }
        }

        if self.cache.max_entries == 0 {
            return Err(anyhow!("cache.max_entries must be greater than zero"));
        }
        if self.batch.batch_size == 0 {
            return Err(anyhow!("batch.batch_size must be greater than zero"));
        }
        if self.batch.max_chunk_length == 0 || self.batch.max_chunk_sentences == 0 {
            return Err(anyhow!("Chunk limits must be greater than zero"));
        }

        Ok(())
    }

    /// Get a specific backend configuration entry
    pub fn get_backend_config(&self, kind: BackendKind) -> Option<&BackendConfig> {
        let kind_str = kind.to_lowercase_string();
        self.backends.iter().find(|b| b.backend_type == kind_str)
    }

    /// Get the endpoint for a backend
    pub fn get_endpoint(&self, kind: BackendKind) -> String {
        if let Some(backend_config) = self.get_backend_config(kind) {
            if !backend_config.endpoint.is_empty() {
                return backend_config.endpoint.clone();
            }
        }

        // Default fallback based on backend type
        match kind {
            BackendKind::Google => default_google_endpoint(),
            BackendKind::DeepL => default_deepl_endpoint(),
            BackendKind::Mock => String::new(),
        }
    }

    /// Get the API key for a backend
    pub fn get_api_key(&self, kind: BackendKind) -> String {
        if let Some(backend_config) = self.get_backend_config(kind) {
            if !backend_config.api_key.is_empty() {
                return backend_config.api_key.clone();
            }
        }

        String::new()
    }

    /// Get the minimum inter-request interval for a backend
    pub fn get_min_interval_ms(&self, kind: BackendKind) -> u64 {
        if let Some(backend_config) = self.get_backend_config(kind) {
            return backend_config.min_interval_ms;
        }

        match kind {
            BackendKind::Google => default_google_min_interval_ms(),
            BackendKind::DeepL => default_deepl_min_interval_ms(),
            BackendKind::Mock => 0,
        }
    }

    /// Get the request timeout for a backend
    pub fn get_timeout_secs(&self, kind: BackendKind) -> u64 {
        if let Some(backend_config) = self.get_backend_config(kind) {
            if backend_config.timeout_secs > 0 {
                return backend_config.timeout_secs;
            }
        }

        default_timeout_secs()
    }

    /// Backends the pipeline may dispatch to, primary first
    pub fn configured_backends(&self) -> Vec<BackendKind> {
        let mut kinds = vec![self.primary_backend];
        if let Some(fallback) = self.fallback_backend {
            if fallback != self.primary_backend {
                kinds.push(fallback);
            }
        }
        kinds
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: "en".to_string(),
            target_language: "ko".to_string(),
            primary_backend: BackendKind::Google,
            fallback_backend: None,
            backends: default_backends(),
            cache: CacheConfig::default(),
            batch: BatchConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
