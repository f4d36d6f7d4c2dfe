//! Configuration file parser for ~/.config/framefeed/config.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are accepted by serde but logged as a warning since they are
//! usually typos.
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Environment variable that overrides `base_url`.
pub const BASE_URL_ENV: &str = "FRAMEFEED_BASE_URL";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid base_url {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level configuration. Any subset of keys may be given.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the feed-aggregation API (`{base_url}/feeds`).
    pub base_url: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Maximum accepted response body size in bytes.
    pub max_response_bytes: usize,

    /// Delete cached items that the latest full fetch no longer returns.
    pub prune_stale_items: bool,

    /// Subscription registry contract, shown alongside pending `addFeed` calls.
    pub contract_address: Option<String>,

    /// Chain the registry contract lives on (Base mainnet by default).
    pub chain_id: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            request_timeout_secs: 30,
            max_response_bytes: 10 * 1024 * 1024,
            prune_stale_items: false,
            contract_address: None,
            chain_id: 8453,
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 6] = [
        "base_url",
        "request_timeout_secs",
        "max_response_bytes",
        "prune_stale_items",
        "contract_address",
        "chain_id",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing or empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    /// - `base_url` that is not an http(s) URL → `Err(ConfigError::InvalidBaseUrl)`
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

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        tracing::info!(path = %path.display(), base_url = %config.base_url, "Loaded configuration");
        Ok(config)
    }

    /// Apply an override for `base_url` (from the environment or the CLI).
    /// Blank values are ignored.
    pub fn with_base_url(mut self, base_url: Option<String>) -> Result<Self, ConfigError> {
        if let Some(url) = base_url.map(|u| u.trim().to_string()) {
            if !url.is_empty() {
                self.base_url = url;
                self.validate()?;
            }
        }
        Ok(self)
    }

    /// Apply `FRAMEFEED_BASE_URL` if set.
    pub fn with_env(self) -> Result<Self, ConfigError> {
        self.with_base_url(std::env::var(BASE_URL_ENV).ok())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason,
        };
        let parsed = url::Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        match parsed.scheme() {
            "http" | "https" => Ok(()),
            other => Err(invalid(format!("unsupported scheme '{}'", other))),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(name: &str, content: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("framefeed_config_test_{}", name));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    fn cleanup(path: &Path) {
        if let Some(dir) = path.parent() {
            std::fs::remove_dir_all(dir).ok();
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.max_response_bytes, 10 * 1024 * 1024);
        assert!(!config.prune_stale_items);
        assert!(config.contract_address.is_none());
        assert_eq!(config.chain_id, 8453);
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/framefeed_test_nonexistent_config.toml");
        assert_eq!(Config::load(path).unwrap(), Config::default());
    }

    #[test]
    fn test_whitespace_only_file_returns_default() {
        let path = write_config("whitespace", "   \n  \n  ");
        assert_eq!(Config::load(&path).unwrap(), Config::default());
        cleanup(&path);
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let path = write_config("partial", "prune_stale_items = true\n");
        let config = Config::load(&path).unwrap();
        assert!(config.prune_stale_items);
        assert_eq!(config.request_timeout_secs, 30);
        cleanup(&path);
    }

    #[test]
    fn test_full_config() {
        let content = r#"
base_url = "https://api.example.com/v1"
request_timeout_secs = 5
max_response_bytes = 2048
prune_stale_items = true
contract_address = "0x1234"
chain_id = 84532
"#;
        let path = write_config("full", content);
        let config = Config::load(&path).unwrap();
        assert_eq!(config.base_url, "https://api.example.com/v1");
        assert_eq!(config.request_timeout_secs, 5);
        assert_eq!(config.max_response_bytes, 2048);
        assert!(config.prune_stale_items);
        assert_eq!(config.contract_address.as_deref(), Some("0x1234"));
        assert_eq!(config.chain_id, 84532);
        cleanup(&path);
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let path = write_config("invalid", "this is not [valid toml");
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));
        cleanup(&path);
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let path = write_config("unknown", "theme = \"dark\"\nchain_id = 1\n");
        assert_eq!(Config::load(&path).unwrap().chain_id, 1);
        cleanup(&path);
    }

    #[test]
    fn test_wrong_type_returns_error() {
        let path = write_config("wrongtype", "request_timeout_secs = \"soon\"\n");
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse(_))));
        cleanup(&path);
    }

    #[test]
    fn test_non_http_base_url_rejected() {
        let path = write_config("scheme", "base_url = \"ftp://files.example.com\"\n");
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }));
        assert!(err.to_string().contains("ftp"));
        cleanup(&path);
    }

    #[test]
    fn test_too_large_file_rejected() {
        let path = write_config("too_large", &"a".repeat(1_048_577));
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        assert!(err.to_string().contains("too large"));
        cleanup(&path);
    }

    #[test]
    fn test_base_url_override() {
        let config = Config::default()
            .with_base_url(Some(" https://override.example.com ".to_string()))
            .unwrap();
        assert_eq!(config.base_url, "https://override.example.com");

        let unchanged = Config::default().with_base_url(Some("  ".to_string())).unwrap();
        assert_eq!(unchanged.base_url, "http://localhost:3000");

        assert!(Config::default()
            .with_base_url(Some("not a url".to_string()))
            .is_err());
    }
}
