// src/service.rs

use crate::client::KeySetClient;
use crate::config::{Config, ValidationDetails};
use crate::decoder::decode_unverified;
use crate::error::{ConfigError, VerificationError, VerificationFailure};
use crate::model::VerifiedToken;
use crate::resolver::resolve_key;
use crate::verifier::{check_algorithm, verify_decoded};
use jsonwebtoken::get_current_timestamp;
use tracing::{debug, instrument};

/// The ID token verifier.
///
/// This struct is initialized with a `Config` and should be created once
/// and reused for all verification requests. Clones share the key set cache.
#[derive(Clone)]
pub struct TokenVerificationService {
    validation: ValidationDetails,
    key_set_client: KeySetClient,
}

impl TokenVerificationService {
    /// Creates a new service with its own key set client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialised.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let key_set_client = KeySetClient::new(config.key_set)?;
        Ok(Self::with_key_set_client(config.validation, key_set_client))
    }

    /// Creates a service that shares an existing key set client, e.g. between projects.
    pub fn with_key_set_client(
        validation: ValidationDetails,
        key_set_client: KeySetClient,
    ) -> Self {
        Self {
            validation,
            key_set_client,
        }
    }

    pub fn project_id(&self) -> &str {
        &self.validation.project_id
    }

    /// Verifies an ID token.
    ///
    /// The token is decoded without verification to learn its `kid`, the key
    /// set is loaded, the certificate for the `kid` is resolved, and the token
    /// is then verified with that key under the pinned algorithm. The first
    /// stage that fails ends the call with its reason(s).
    ///
    /// # Returns
    ///
    /// The verified subject and claims, or every reason the token was rejected.
    #[instrument(skip_all, fields(project_id = %self.validation.project_id))]
    pub async fn verify(&self, token: &str) -> Result<VerifiedToken, VerificationFailure> {
        // 1. Decode without verification to learn the kid and alg.
        let decoded = decode_unverified(token)?;

        // 2. Refuse foreign algorithms before spending a key set lookup on them.
        check_algorithm(&decoded, self.validation.algorithm)?;

        let kid = decoded.header.kid.as_deref().ok_or_else(|| {
            VerificationError::UnknownKeyId("The token header has no 'kid'.".to_string())
        })?;

        // 3. Load the key set, refreshing it once if the kid is unknown.
        let key_set = self.key_set_client.key_set_for(kid).await?;
        debug!("Key set loaded with {} keys", key_set.len());

        // 4. Pick the key the token names.
        let key = resolve_key(kid, &key_set)?;

        // 5. Verify the signature and claims with the resolved key.
        verify_decoded(&decoded, &key, &self.validation, get_current_timestamp())
    }
}

/// Extracts the token from an `Authorization` header value using the `Bearer` scheme.
pub fn bearer_token(authorization: &str) -> Option<&str> {
    let (scheme, token) = authorization.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
