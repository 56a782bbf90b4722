// src/model.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// The header of a token, decoded but not verified.
///
/// `alg` is kept as written so that algorithms the JWT library does not know
/// (such as `none`) can still be reported precisely.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UnverifiedHeader {
    pub alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
}

/// The `aud` claim, which JWT allows to be a string or an array of strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Multiple(Vec<String>),
}

impl std::fmt::Display for Audience {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Audience::Single(aud) => write!(f, "'{}'", aud),
            Audience::Multiple(auds) => write!(f, "{:?}", auds),
        }
    }
}

/// Sign-in metadata the provider nests under the `firebase` claim.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct FirebaseClaims {
    /// Provider name to the identifiers the user has with it, e.g. `google.com`.
    #[serde(default)]
    pub identities: HashMap<String, Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sign_in_provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
}

/// The claims carried by an ID token.
///
/// Every field is optional here so that a missing claim becomes a precise
/// verification failure rather than a parse error. After a successful
/// verification `iss`, `aud`, `sub`, `iat` and `exp` are guaranteed present.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_time: Option<u64>,
    /// Same value as `sub` for tokens minted by the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firebase: Option<FirebaseClaims>,
    /// Any other claims, e.g. custom claims set by the project's backend.
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl Claims {
    /// The sign-in provider recorded by the identity platform, e.g. `password`.
    pub fn sign_in_provider(&self) -> Option<&str> {
        self.firebase.as_ref()?.sign_in_provider.as_deref()
    }
}

/// The successful outcome of a verification call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerifiedToken {
    /// The verified `sub` claim, the stable identifier of the user.
    pub subject: String,
    pub claims: Claims,
}

/// The provider's key set: PEM certificates keyed by key id.
#[derive(Debug, Clone)]
pub struct KeySet {
    certificates: HashMap<String, String>,
    fetched_at: Instant,
    ttl: Duration,
}

impl KeySet {
    pub fn new(certificates: HashMap<String, String>, ttl: Duration) -> Self {
        Self {
            certificates,
            fetched_at: Instant::now(),
            ttl,
        }
    }

    pub fn contains(&self, kid: &str) -> bool {
        self.certificates.contains_key(kid)
    }

    pub fn key_ids(&self) -> impl Iterator<Item = &str> {
        self.certificates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    /// How long this key set may be served from cache.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }

    pub(crate) fn certificate(&self, kid: &str) -> Option<&str> {
        self.certificates.get(kid).map(String::as_str)
    }
}
