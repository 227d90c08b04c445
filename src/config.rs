//! Configuration file parser for ~/.config/newsboard/config.toml.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Unknown keys are accepted by serde, though we log a warning so typos
//! are visible.
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::aggregate::SourceFilter;
use crate::feed::{
    FetchOptions, FetchService, Locale, ProxyConfig, DEFAULT_BASE_URL,
    DEFAULT_FETCH_SERVICE_ENDPOINT,
};

/// Environment variable that overrides `fetch_service_api_key`.
pub const FETCH_SERVICE_KEY_ENV: &str = "NEWSBOARD_FETCH_SERVICE_KEY";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    /// Well-formed TOML with a value the application cannot use.
    #[error("Invalid config value: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// The custom Debug impl masks `fetch_service_api_key`.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Google News edition language (`pt`, `en`, ...).
    pub language: String,

    /// Google News edition country (`PT`, `US`, ...).
    pub country: String,

    /// Feed root. Only changed for testing or mirrors.
    pub base_url: String,

    /// Entities to search for.
    pub queries: Vec<String>,

    /// Default date window, in days back from today.
    pub window_days: u64,

    /// Sources seen fewer times than this across a batch are dropped.
    pub min_source_count: usize,

    /// Sources always dropped.
    pub blocked_sources: Vec<String>,

    /// Searches in flight at once. 1 = strictly sequential.
    pub concurrency: usize,

    /// Forward proxy. Mutually exclusive with the fetch service.
    pub proxy: ProxyConfig,

    /// Fetch service API key (alternative to the env var, which wins).
    pub fetch_service_api_key: Option<String>,

    pub fetch_service_endpoint: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            language: "pt".to_string(),
            country: "PT".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            queries: ["CGD", "BCP", "Novo Banco", "Banco Santander Totta", "Banco Montepio"]
                .into_iter()
                .map(String::from)
                .collect(),
            window_days: 14,
            min_source_count: SourceFilter::DEFAULT_MIN_COUNT,
            blocked_sources: SourceFilter::default_blocklist(),
            concurrency: 1,
            proxy: ProxyConfig::default(),
            fetch_service_api_key: None,
            fetch_service_endpoint: DEFAULT_FETCH_SERVICE_ENDPOINT.to_string(),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("language", &self.language)
            .field("country", &self.country)
            .field("base_url", &self.base_url)
            .field("queries", &self.queries)
            .field("window_days", &self.window_days)
            .field("min_source_count", &self.min_source_count)
            .field("blocked_sources", &self.blocked_sources)
            .field("concurrency", &self.concurrency)
            .field("proxy", &self.proxy)
            .field(
                "fetch_service_api_key",
                &self.fetch_service_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("fetch_service_endpoint", &self.fetch_service_endpoint)
            .finish()
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 11] = [
        "language",
        "country",
        "base_url",
        "queries",
        "window_days",
        "min_source_count",
        "blocked_sources",
        "concurrency",
        "proxy",
        "fetch_service_api_key",
        "fetch_service_endpoint",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unusable values → `Err(ConfigError::Invalid)`
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            tracing::debug!("Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        config.validate()?;
        tracing::info!(
            language = %config.language,
            country = %config.country,
            queries = config.queries.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.language.trim().is_empty() || self.country.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "language and country must not be empty".to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if url::Url::parse(&self.base_url).is_err() {
            return Err(ConfigError::Invalid(format!(
                "base_url is not a URL: {}",
                self.base_url
            )));
        }
        Ok(())
    }

    pub fn locale(&self) -> Locale {
        Locale::new(&self.language, &self.country)
    }

    pub fn source_filter(&self) -> SourceFilter {
        SourceFilter::new(self.min_source_count, self.blocked_sources.iter().cloned())
    }

    /// Default routing for every fetch, reading the API key from
    /// [`FETCH_SERVICE_KEY_ENV`] first.
    ///
    /// A proxy and a key may both be present here; the conflict is reported
    /// by the fetcher before any request goes out.
    pub fn fetch_options(&self) -> FetchOptions {
        self.fetch_options_with_env(std::env::var(FETCH_SERVICE_KEY_ENV).ok())
    }

    fn fetch_options_with_env(&self, env_key: Option<String>) -> FetchOptions {
        let api_key = env_key
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.fetch_service_api_key.clone());

        FetchOptions {
            proxy: (!self.proxy.is_empty()).then(|| self.proxy.clone()),
            fetch_service: api_key.map(|key| {
                FetchService::with_endpoint(SecretString::from(key), &self.fetch_service_endpoint)
            }),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.language, "pt");
        assert_eq!(config.country, "PT");
        assert_eq!(config.base_url, "https://news.google.com/rss");
        assert_eq!(config.queries.len(), 5);
        assert_eq!(config.window_days, 14);
        assert_eq!(config.min_source_count, 5);
        assert_eq!(config.blocked_sources.len(), 4);
        assert_eq!(config.concurrency, 1);
        assert!(config.proxy.is_empty());
        assert!(config.fetch_service_api_key.is_none());
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/newsboard_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.language, "pt");
    }

    #[test]
    fn test_whitespace_only_file_returns_default() {
        let dir = std::env::temp_dir().join("newsboard_config_test_whitespace");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "   \n  \n  ").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.country, "PT");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_full_config() {
        let content = r#"
language = "EN"
country = "us"
queries = ["Acme Bank", "Globex"]
window_days = 30
min_source_count = 2
blocked_sources = ["Spam Daily"]
concurrency = 4
fetch_service_api_key = "test-key-123"
fetch_service_endpoint = "https://fetch.example.com/api/"

[proxy]
https = "http://proxy.example.com:8080"
"#;
        let config = Config::from_toml(content).unwrap();
        assert_eq!(config.locale().language(), "en");
        assert_eq!(config.locale().country(), "US");
        assert_eq!(config.queries, vec!["Acme Bank", "Globex"]);
        assert_eq!(config.window_days, 30);
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.proxy.https.as_deref(), Some("http://proxy.example.com:8080"));
        assert!(config.proxy.http.is_none());

        let filter = config.source_filter();
        assert_eq!(filter.min_count(), 2);
        assert!(filter.is_blocked("Spam Daily"));
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let config = Config::from_toml("window_days = 7\n").unwrap();
        assert_eq!(config.window_days, 7);
        assert_eq!(config.language, "pt");
        assert_eq!(config.min_source_count, 5);
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let err = Config::from_toml("this is not [valid toml").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));
    }

    #[test]
    fn test_wrong_type_returns_error() {
        assert!(Config::from_toml("window_days = \"two weeks\"\n").is_err());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let err = Config::from_toml("concurrency = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_bad_base_url_rejected() {
        let err = Config::from_toml("base_url = \"not a url\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let config = Config::from_toml("language = \"es\"\ntotally_fake_key = 1\n").unwrap();
        assert_eq!(config.language, "es");
    }

    #[test]
    fn test_too_large_file_rejected() {
        let dir = std::env::temp_dir().join("newsboard_config_test_too_large");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "a".repeat(1_048_577)).unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        assert!(err.to_string().contains("too large"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_env_key_takes_precedence() {
        let config = Config {
            fetch_service_api_key: Some("from-file".to_string()),
            ..Config::default()
        };
        let options = config.fetch_options_with_env(Some("from-env".to_string()));
        assert!(options.fetch_service.is_some());
        assert!(options.proxy.is_none());

        let options = config.fetch_options_with_env(Some("  ".to_string()));
        assert!(options.fetch_service.is_some());

        let options = Config::default().fetch_options_with_env(None);
        assert!(options.is_direct());
    }

    #[test]
    fn test_proxy_and_key_both_kept_for_fetcher_to_reject() {
        let config = Config::from_toml(
            "fetch_service_api_key = \"k\"\n[proxy]\nhttp = \"http://proxy:3128\"\n",
        )
        .unwrap();
        let options = config.fetch_options_with_env(None);
        assert!(options.proxy.is_some());
        assert!(options.fetch_service.is_some());
    }

    #[test]
    fn test_debug_masks_api_key() {
        let config = Config {
            fetch_service_api_key: Some("super-secret-key-12345".to_string()),
            ..Config::default()
        };
        let debug_output = format!("{:?}", config);
        assert!(!debug_output.contains("super-secret-key-12345"));
        assert!(debug_output.contains("[REDACTED]"));
    }
}
