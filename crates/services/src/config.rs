use std::env;
use std::time::Duration;

use url::Url;

use crate::error::ConfigError;

pub const API_URL_ENV: &str = "TUTOR_API_URL";
pub const API_TOKEN_ENV: &str = "TUTOR_API_TOKEN";
pub const API_TIMEOUT_ENV: &str = "TUTOR_API_TIMEOUT_SECS";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Where and how to reach the coursework backend.
#[derive(Clone)]
pub struct ApiConfig {
    pub base_url: Url,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl ApiConfig {
    /// Build a config from a base URL string.
    ///
    /// The base path always ends with `/` so endpoint segments append to it.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the URL does not parse or is not http(s).
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, ConfigError> {
        let raw = base_url.trim();
        let mut url = Url::parse(raw).map_err(|source| ConfigError::InvalidUrl {
            raw: raw.to_owned(),
            source,
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme(raw.to_owned()));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        Ok(Self {
            base_url: url,
            token: token.filter(|t| !t.trim().is_empty()),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read `TUTOR_API_URL`, `TUTOR_API_TOKEN` and `TUTOR_API_TIMEOUT_SECS`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` without a base URL, or a parse error.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = env::var(API_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing(API_URL_ENV))?;
        let token = env::var(API_TOKEN_ENV).ok();
        let config = Self::new(&base_url, token)?;

        match env::var(API_TIMEOUT_ENV) {
            Ok(raw) => Ok(config.with_timeout(parse_timeout(&raw)?)),
            Err(_) => Ok(config),
        }
    }
}

fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .ok_or_else(|| ConfigError::InvalidTimeout(raw.to_owned()))
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_path_gets_trailing_slash() {
        let config = ApiConfig::new("https://tutor.example/api", None).unwrap();
        assert_eq!(config.base_url.as_str(), "https://tutor.example/api/");
    }

    #[test]
    fn blank_token_is_dropped() {
        let config = ApiConfig::new("http://localhost:5000", Some("  ".into())).unwrap();
        assert!(config.token.is_none());
    }

    #[test]
    fn rejects_non_http_urls() {
        assert!(matches!(
            ApiConfig::new("ftp://tutor.example", None),
            Err(ConfigError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            ApiConfig::new("not a url", None),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn timeout_must_be_positive_seconds() {
        assert_eq!(parse_timeout(" 30 ").unwrap(), Duration::from_secs(30));
        assert!(parse_timeout("0").is_err());
        assert!(parse_timeout("soon").is_err());
    }

    #[test]
    fn debug_redacts_token() {
        let config = ApiConfig::new("http://localhost", Some("secret".into())).unwrap();
        assert!(!format!("{config:?}").contains("secret"));
    }
}
