// src/config.rs

use crate::error::ConfigError;
use jsonwebtoken::Algorithm;
use std::time::Duration;
use url::Url;

/// The URL the provider publishes its signing certificates at, keyed by `kid`.
pub const DEFAULT_KEY_SET_URL: &str =
    "https://www.googleapis.com/robot/v1/metadata/x509/securetoken@system.gserviceaccount.com";

/// Prefix of the `iss` claim; the project id is appended to it.
pub const ISSUER_PREFIX: &str = "https://securetoken.google.com/";

pub const PROJECT_ID_ENV: &str = "FIREBASE_PROJECT_ID";
pub const KEY_SET_URL_ENV: &str = "FIREBASE_CERT_URL";
pub const LEEWAY_ENV: &str = "FIREBASE_TOKEN_LEEWAY_SECS";

/// Contains the validation settings for an ID token.
#[derive(Debug, Clone)]
pub struct ValidationDetails {
    /// The project id. It is the expected `aud` and the suffix of the expected `iss`.
    pub project_id: String,
    /// The one signing algorithm accepted. Tokens claiming any other are rejected.
    pub algorithm: Algorithm,
    /// The tolerance for clock skew when validating `exp` and `iat`.
    pub leeway: Duration,
}

impl ValidationDetails {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            algorithm: Algorithm::RS256,
            leeway: Duration::ZERO,
        }
    }

    /// The exact `iss` value tokens for this project must carry.
    pub fn expected_issuer(&self) -> String {
        format!("{}{}", ISSUER_PREFIX, self.project_id)
    }
}

/// Where and how the provider key set is fetched and cached.
#[derive(Debug, Clone)]
pub struct KeySetConfig {
    pub url: Url,
    /// TTL used when the response carries no `Cache-Control: max-age`.
    pub cache_ttl: Duration,
    /// Upper bound on any TTL, including one advertised by the provider.
    pub max_cache_ttl: Duration,
    /// A cached key set younger than this is not refetched on an unknown `kid`.
    pub min_refresh_interval: Duration,
    pub http_timeout: Duration,
}

impl Default for KeySetConfig {
    fn default() -> Self {
        Self {
            // The default is a compile-time constant known to parse.
            url: Url::parse(DEFAULT_KEY_SET_URL).expect("default key set URL is valid"),
            cache_ttl: Duration::from_secs(60 * 60),
            max_cache_ttl: Duration::from_secs(24 * 60 * 60),
            min_refresh_interval: Duration::from_secs(60),
            http_timeout: Duration::from_secs(10),
        }
    }
}

/// The main configuration for the token verification service.
///
/// Construct it with [`ConfigBuilder`].
#[derive(Debug, Clone)]
pub struct Config {
    pub validation: ValidationDetails,
    pub key_set: KeySetConfig,
}

/// A builder for creating a `Config` instance.
#[derive(Default)]
pub struct ConfigBuilder {
    project_id: Option<String>,
    key_set_url: Option<Url>,
    algorithm: Option<Algorithm>,
    leeway: Option<Duration>,
    cache_ttl: Option<Duration>,
    max_cache_ttl: Option<Duration>,
    min_refresh_interval: Option<Duration>,
    http_timeout: Option<Duration>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a builder from the process environment.
    ///
    /// Reads `FIREBASE_PROJECT_ID`, and optionally `FIREBASE_CERT_URL` and
    /// `FIREBASE_TOKEN_LEEWAY_SECS`. Missing optional variables keep their defaults;
    /// a missing project id is reported by [`ConfigBuilder::build`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Like [`ConfigBuilder::from_env`], reading variables through `lookup`.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::new();
        if let Some(project_id) = lookup(PROJECT_ID_ENV) {
            builder = builder.project_id(project_id);
        }
        if let Some(url) = lookup(KEY_SET_URL_ENV) {
            builder = builder.key_set_url(&url)?;
        }
        if let Some(leeway) = lookup(LEEWAY_ENV) {
            let secs = leeway.trim().parse::<u64>().map_err(|e| {
                ConfigError::InvalidConfiguration(format!("{}: {}", LEEWAY_ENV, e))
            })?;
            builder = builder.leeway(Duration::from_secs(secs));
        }
        Ok(builder)
    }

    /// Sets the project id. This is a required field.
    pub fn project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Overrides the key set URL.
    pub fn key_set_url(mut self, url: &str) -> Result<Self, ConfigError> {
        let parsed_url = Url::parse(url).map_err(|e| ConfigError::InvalidUrl(e.to_string()))?;
        self.key_set_url = Some(parsed_url);
        Ok(self)
    }

    /// Sets the pinned signing algorithm. Defaults to `RS256`.
    pub fn algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = Some(algorithm);
        self
    }

    /// Sets the clock skew tolerance. Defaults to zero.
    pub fn leeway(mut self, leeway: Duration) -> Self {
        self.leeway = Some(leeway);
        self
    }

    /// Sets the fallback cache TTL for the key set.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn max_cache_ttl(mut self, ttl: Duration) -> Self {
        self.max_cache_ttl = Some(ttl);
        self
    }

    pub fn min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = Some(interval);
        self
    }

    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = Some(timeout);
        self
    }

    /// Consumes the builder and returns a `Config` object.
    ///
    /// # Errors
    ///
    /// Returns an error if the project id is missing or empty, or if the
    /// algorithm is not one of RS256, RS384 or RS512.
    pub fn build(self) -> Result<Config, ConfigError> {
        let project_id = self
            .project_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingConfiguration("project_id".to_string()))?;

        let algorithm = self.algorithm.unwrap_or(Algorithm::RS256);
        if !matches!(algorithm, Algorithm::RS256 | Algorithm::RS384 | Algorithm::RS512) {
            return Err(ConfigError::UnsupportedAlgorithm(algorithm));
        }

        let defaults = KeySetConfig::default();
        let key_set = KeySetConfig {
            url: self.key_set_url.unwrap_or(defaults.url),
            cache_ttl: self.cache_ttl.unwrap_or(defaults.cache_ttl),
            max_cache_ttl: self.max_cache_ttl.unwrap_or(defaults.max_cache_ttl),
            min_refresh_interval: self
                .min_refresh_interval
                .unwrap_or(defaults.min_refresh_interval),
            http_timeout: self.http_timeout.unwrap_or(defaults.http_timeout),
        };
        if key_set.cache_ttl > key_set.max_cache_ttl {
            return Err(ConfigError::InvalidConfiguration(
                "cache_ttl must not exceed max_cache_ttl".to_string(),
            ));
        }

        Ok(Config {
            validation: ValidationDetails {
                project_id,
                algorithm,
                leeway: self.leeway.unwrap_or(Duration::ZERO),
            },
            key_set,
        })
    }
}
