// src/client.rs

use crate::config::KeySetConfig;
use crate::error::{ConfigError, VerificationError};
use crate::model::KeySet;
use moka::future::Cache;
use moka::Expiry;
use reqwest::header::{HeaderMap, CACHE_CONTROL};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// A client for fetching and caching the provider's key set.
///
/// Clones share one cache, so a single client should be created per process
/// and handed to every verifier.
#[derive(Clone)]
pub struct KeySetClient {
    // The client is internally ref-counted to allow for cheap cloning.
    inner: Arc<Inner>,
}

struct Inner {
    config: KeySetConfig,
    http_client: reqwest::Client,
    // Cache stores key set URL -> key set. Concurrent misses share one fetch.
    cache: Cache<String, Arc<KeySet>>,
}

/// Expires each cached key set after the TTL it was fetched with.
struct KeySetExpiry;

impl Expiry<String, Arc<KeySet>> for KeySetExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Arc<KeySet>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl())
    }
}

impl KeySetClient {
    /// Creates a new `KeySetClient` with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialised.
    pub fn new(config: KeySetConfig) -> Result<Self, ConfigError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| ConfigError::InvalidConfiguration(format!("HTTP client: {}", e)))?;
        Ok(Self::with_http_client(config, http_client))
    }

    /// Creates a new `KeySetClient` that sends its requests through `http_client`.
    pub fn with_http_client(config: KeySetConfig, http_client: reqwest::Client) -> Self {
        let cache = Cache::builder()
            .max_capacity(4)
            .expire_after(KeySetExpiry)
            .build();
        Self {
            inner: Arc::new(Inner {
                config,
                http_client,
                cache,
            }),
        }
    }

    /// Returns the current key set, fetching it if the cache is cold or expired.
    ///
    /// Concurrent callers that miss the cache wait on one shared fetch.
    #[instrument(skip(self), err)]
    pub async fn key_set(&self) -> Result<Arc<KeySet>, VerificationError> {
        let url = self.inner.config.url.to_string();
        self.inner
            .cache
            .try_get_with(url, async { self.fetch_key_set().await.map(Arc::new) })
            .await
            .map_err(|e| (*e).clone())
    }

    /// Returns a key set that should contain `kid`.
    ///
    /// If the cached key set lacks `kid` and is older than the configured
    /// minimum refresh interval, it is dropped and fetched again once, to pick
    /// up rotated keys. The returned set may still lack `kid`.
    #[instrument(skip(self), err)]
    pub async fn key_set_for(&self, kid: &str) -> Result<Arc<KeySet>, VerificationError> {
        let key_set = self.key_set().await?;
        if key_set.contains(kid) {
            debug!("Key set cache hit for kid: {}", kid);
            return Ok(key_set);
        }
        if key_set.age() < self.inner.config.min_refresh_interval {
            debug!("kid {} not in a key set fetched {:?} ago, not refreshing", kid, key_set.age());
            return Ok(key_set);
        }

        debug!("kid {} not in cached key set. Refetching from provider.", kid);
        let url = self.inner.config.url.to_string();
        // Another caller may have refreshed already, or be refreshing now.
        // Only drop the exact set we saw.
        match self.inner.cache.get(&url).await {
            Some(current) if !Arc::ptr_eq(&current, &key_set) => return Ok(current),
            Some(_) => self.inner.cache.invalidate(&url).await,
            None => {}
        }
        self.key_set().await
    }

    /// Drops the cached key set so the next call fetches it again.
    pub async fn invalidate(&self) {
        self.inner
            .cache
            .invalidate(self.inner.config.url.as_str())
            .await;
    }

    /// Fetches the key set from the provider.
    async fn fetch_key_set(&self) -> Result<KeySet, VerificationError> {
        let url = &self.inner.config.url;
        debug!("Fetching key set from: {}", url);

        let response = self
            .inner
            .http_client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| {
                warn!("Key set request to {} failed: {}", url, e);
                VerificationError::KeySetUnavailable(format!("Request to {} failed: {}.", url, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Key set endpoint {} responded with {}", url, status);
            return Err(VerificationError::KeySetUnavailable(format!(
                "{} responded with {}.",
                url, status
            )));
        }

        let cache_ttl = parse_cache_control(response.headers())
            .unwrap_or(self.inner.config.cache_ttl)
            .min(self.inner.config.max_cache_ttl);

        let certificates: HashMap<String, String> = response.json().await.map_err(|e| {
            warn!("Key set from {} is not a kid to certificate map: {}", url, e);
            VerificationError::KeySetUnavailable(format!(
                "The response from {} is not a map of key ids to certificates: {}.",
                url, e
            ))
        })?;

        info!(
            "Successfully fetched {} certificates. Caching with TTL: {:?}",
            certificates.len(),
            cache_ttl
        );
        Ok(KeySet::new(certificates, cache_ttl))
    }
}

/// Parses the `max-age` directive of a `Cache-Control` header.
fn parse_cache_control(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(CACHE_CONTROL)?
        .to_str()
        .ok()?
        .split(',')
        .find_map(|part| {
            part.trim()
                .strip_prefix("max-age=")?
                .parse::<u64>()
                .ok()
                .map(Duration::from_secs)
        })
}
