// src/lib.rs

//! Verification of Firebase / Google securetoken ID tokens.
//!
//! Tokens are checked against the provider's published X.509 key set, which
//! is fetched over HTTPS and cached with a bounded TTL. The entry point is
//! [`service::TokenVerificationService::verify`].

pub mod client;
pub mod config;
pub mod decoder;
pub mod error;
pub mod model;
pub mod resolver;
pub mod service;
pub mod verifier;

/// The public prelude for the `securetoken-verifier` crate.
///
/// This module re-exports the most commonly used types for convenience.
pub mod prelude {
    pub use crate::client::KeySetClient;
    pub use crate::config::{Config, ConfigBuilder, ValidationDetails};
    pub use crate::error::{ConfigError, ErrorKind, VerificationError, VerificationFailure};
    pub use crate::model::{Claims, VerifiedToken};
    pub use crate::service::{bearer_token, TokenVerificationService};
    pub use jsonwebtoken::Algorithm;
}
