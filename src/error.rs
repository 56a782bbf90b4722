// src/error.rs

use std::fmt;
use thiserror::Error;

/// A single reason why a token could not be verified.
///
/// Every variant carries a human-readable message suitable for surfacing to
/// the caller of the API that received the token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// The token is not a structurally valid compact JWS.
    #[error("Invalid ID token. {0}")]
    MalformedToken(String),

    /// The provider's key set could not be fetched or parsed.
    #[error("Can't obtain valid public key certificates from the provider. {0}")]
    KeySetUnavailable(String),

    /// The `kid` in the token header is not part of the current key set.
    #[error("Invalid 'kid', it does not correspond to one of the valid public keys. {0}")]
    UnknownKeyId(String),

    /// The certificate for the `kid` exists but its public key is unusable.
    #[error("Invalid certificate. {0}")]
    InvalidCertificate(String),

    #[error("ID token has expired. Get a fresh token from your app and try again. {0}")]
    Expired(String),

    #[error("Invalid ID token. 'Issued-at time' (iat) must be in the past. {0}")]
    IssuedAtInFuture(String),

    #[error("Invalid ID token. 'Issuer' (iss) must be '{expected}', but got {actual}.")]
    InvalidIssuer { expected: String, actual: String },

    #[error("Invalid ID token. 'Audience' (aud) must be '{expected}', but got {actual}.")]
    InvalidAudience { expected: String, actual: String },

    #[error("Invalid ID token. 'Subject' (sub) {0}")]
    InvalidSubject(String),

    /// The token was not signed with the one algorithm this engine accepts.
    #[error("Invalid ID token. 'alg' must be '{expected}', but got {actual}.")]
    AlgorithmMismatch { expected: String, actual: String },

    #[error("ID token has invalid signature. {0}")]
    SignatureInvalid(String),
}

/// The kind of a [`VerificationError`], without its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedToken,
    KeySetUnavailable,
    UnknownKeyId,
    InvalidCertificate,
    Expired,
    IssuedAtInFuture,
    InvalidIssuer,
    InvalidAudience,
    InvalidSubject,
    AlgorithmMismatch,
    SignatureInvalid,
}

impl VerificationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedToken(_) => ErrorKind::MalformedToken,
            Self::KeySetUnavailable(_) => ErrorKind::KeySetUnavailable,
            Self::UnknownKeyId(_) => ErrorKind::UnknownKeyId,
            Self::InvalidCertificate(_) => ErrorKind::InvalidCertificate,
            Self::Expired(_) => ErrorKind::Expired,
            Self::IssuedAtInFuture(_) => ErrorKind::IssuedAtInFuture,
            Self::InvalidIssuer { .. } => ErrorKind::InvalidIssuer,
            Self::InvalidAudience { .. } => ErrorKind::InvalidAudience,
            Self::InvalidSubject(_) => ErrorKind::InvalidSubject,
            Self::AlgorithmMismatch { .. } => ErrorKind::AlgorithmMismatch,
            Self::SignatureInvalid(_) => ErrorKind::SignatureInvalid,
        }
    }
}

/// The failure outcome of a verification call.
///
/// Holds every reason collected for the token, in the order the checks ran.
/// It is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationFailure {
    errors: Vec<VerificationError>,
}

impl VerificationFailure {
    /// Builds a failure from the collected errors, or `None` if there are none.
    pub fn from_errors(errors: Vec<VerificationError>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self { errors })
        }
    }

    pub fn errors(&self) -> &[VerificationError] {
        &self.errors
    }

    /// Human-readable reasons, one per collected error.
    pub fn reasons(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    pub fn kinds(&self) -> Vec<ErrorKind> {
        self.errors.iter().map(VerificationError::kind).collect()
    }

    pub fn has_kind(&self, kind: ErrorKind) -> bool {
        self.errors.iter().any(|e| e.kind() == kind)
    }
}

impl From<VerificationError> for VerificationFailure {
    fn from(error: VerificationError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl fmt::Display for VerificationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str(" / ")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for VerificationFailure {}

/// Errors raised while building a [`crate::config::Config`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("A required configuration field is missing: {0}")]
    MissingConfiguration(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Only the RSA-with-SHA-2 family can verify the provider's certificates.
    #[error("Unsupported JWT algorithm: {0:?}")]
    UnsupportedAlgorithm(jsonwebtoken::Algorithm),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}
