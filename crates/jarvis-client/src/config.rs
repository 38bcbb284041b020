//! Client configuration.
//!
//! Settings come from three places, highest precedence first: environment
//! variables, `<JARVIS_HOME>/config.toml`, built-in defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Local-development API server.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Environment variable overriding the API base URL.
pub const API_URL_ENV: &str = "JARVIS_API_URL";

/// Environment variable overriding the request timeout (seconds).
pub const TIMEOUT_ENV: &str = "JARVIS_REQUEST_TIMEOUT_SECS";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub mod paths {
    //! Path resolution for JARVIS configuration and credential files.
    //!
    //! JARVIS_HOME resolution order:
    //! 1. JARVIS_HOME environment variable (if set)
    //! 2. ~/.config/jarvis (default)

    use std::path::PathBuf;

    /// Returns the JARVIS home directory.
    ///
    /// Falls back to the current directory when no home directory can be
    /// determined.
    pub fn jarvis_home() -> PathBuf {
        if let Ok(home) = std::env::var("JARVIS_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .map_or_else(|| PathBuf::from(".jarvis"), |h| h.join(".config").join("jarvis"))
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        jarvis_home().join("config.toml")
    }

    /// Returns the path to the durable credentials file.
    pub fn credentials_path() -> PathBuf {
        jarvis_home().join("credentials.json")
    }
}

/// Contents of `config.toml`. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub api_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

/// Resolved client configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL every request path is joined onto (no trailing slash).
    pub api_url: String,
    /// Per-request timeout, applied to the refresh call as well.
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl Config {
    /// Creates a config for the given base URL with the default timeout.
    ///
    /// # Errors
    /// Returns an error if `api_url` is not a valid URL.
    pub fn new(api_url: &str) -> Result<Self> {
        Ok(Self {
            api_url: normalize_url(api_url)?,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Loads the config from `<JARVIS_HOME>/config.toml` and the environment.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be parsed, or if a
    /// configured value is invalid.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads the config from an explicit file path and the environment.
    /// A missing file is treated as empty.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be parsed, or if a
    /// configured value is invalid.
    pub fn load_from(path: &Path) -> Result<Self> {
        let file = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str::<FileConfig>(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))?
        } else {
            FileConfig::default()
        };

        let env_url = std::env::var(API_URL_ENV).ok();
        let env_timeout = std::env::var(TIMEOUT_ENV).ok();
        Self::resolve(&file, env_url.as_deref(), env_timeout.as_deref())
    }

    /// Resolves the final config from file values and raw env values.
    ///
    /// # Errors
    /// Returns an error if the chosen URL or timeout is invalid.
    pub fn resolve(
        file: &FileConfig,
        env_url: Option<&str>,
        env_timeout: Option<&str>,
    ) -> Result<Self> {
        let api_url = resolve_api_url(env_url, file.api_url.as_deref())?;
        let request_timeout = resolve_timeout(env_timeout, file.request_timeout_secs)?;
        Ok(Self {
            api_url,
            request_timeout,
        })
    }
}

/// Resolves the base URL with precedence: env > config > default.
///
/// # Errors
/// Returns an error if the selected value is not a valid URL.
pub fn resolve_api_url(env_url: Option<&str>, config_url: Option<&str>) -> Result<String> {
    for candidate in [env_url, config_url].into_iter().flatten() {
        let trimmed = candidate.trim();
        if !trimmed.is_empty() {
            return normalize_url(trimmed);
        }
    }
    Ok(DEFAULT_API_URL.to_string())
}

/// Resolves the request timeout with precedence: env > config > default.
/// A value of zero is rejected.
///
/// # Errors
/// Returns an error if the env value is not a number or either value is zero.
pub fn resolve_timeout(env_secs: Option<&str>, config_secs: Option<u64>) -> Result<Duration> {
    let secs = match env_secs.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Some(
            raw.parse::<u64>()
                .with_context(|| format!("{TIMEOUT_ENV} must be a whole number of seconds"))?,
        ),
        None => config_secs,
    };
    match secs {
        Some(0) => anyhow::bail!("Request timeout must be greater than zero"),
        Some(secs) => Ok(Duration::from_secs(secs)),
        None => Ok(DEFAULT_REQUEST_TIMEOUT),
    }
}

fn normalize_url(url: &str) -> Result<String> {
    url::Url::parse(url).with_context(|| format!("Invalid API base URL: {url}"))?;
    Ok(url.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_env_url_wins_over_config() {
        let url = resolve_api_url(Some("http://env:9000"), Some("http://file:8000")).unwrap();
        assert_eq!(url, "http://env:9000");
    }

    #[test]
    fn test_blank_env_url_falls_back_to_config() {
        let url = resolve_api_url(Some("  "), Some("http://file:8000/")).unwrap();
        assert_eq!(url, "http://file:8000");
    }

    #[test]
    fn test_missing_url_uses_default() {
        assert_eq!(resolve_api_url(None, None).unwrap(), DEFAULT_API_URL);
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let err = resolve_api_url(None, Some("not a url")).unwrap_err();
        assert!(err.to_string().contains("Invalid API base URL"));
    }

    #[test]
    fn test_timeout_precedence() {
        assert_eq!(
            resolve_timeout(Some("3"), Some(30)).unwrap(),
            Duration::from_secs(3)
        );
        assert_eq!(
            resolve_timeout(None, Some(30)).unwrap(),
            Duration::from_secs(30)
        );
        assert_eq!(resolve_timeout(None, None).unwrap(), DEFAULT_REQUEST_TIMEOUT);
    }

    #[test]
    fn test_zero_or_garbage_timeout_is_rejected() {
        assert!(resolve_timeout(Some("0"), None).is_err());
        assert!(resolve_timeout(Some("soon"), None).is_err());
        assert!(resolve_timeout(None, Some(0)).is_err());
    }

    #[test]
    fn test_load_from_reads_toml_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "api_url = \"https://jarvis.example.com/\"\nrequest_timeout_secs = 5\n",
        )
        .unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let file: FileConfig = toml::from_str(&contents).unwrap();
        let config = Config::resolve(&file, None, None).unwrap();
        assert_eq!(config.api_url, "https://jarvis.example.com");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_malformed_config_file_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "api_url = [").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }
}
