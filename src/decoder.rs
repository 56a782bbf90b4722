// src/decoder.rs

//! Decoding of a token without any verification.
//!
//! The key that verifies a token is named by the token itself, so the header
//! has to be read before anything can be trusted. Nothing returned from here
//! may be used for an authorization decision.

use crate::error::VerificationError;
use crate::model::{Claims, UnverifiedHeader};
use base64::engine::{general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::de::DeserializeOwned;

/// A token split into its parts, none of which has been verified.
#[derive(Debug, Clone)]
pub struct UnverifiedToken {
    pub header: UnverifiedHeader,
    pub claims: Claims,
    signing_input: String,
    signature: String,
}

impl UnverifiedToken {
    /// The `header.payload` bytes the signature was computed over.
    pub fn signing_input(&self) -> &str {
        &self.signing_input
    }

    /// The base64url encoded signature segment.
    pub fn signature(&self) -> &str {
        &self.signature
    }
}

/// Splits `token` into header and claims without checking the signature or any claim.
///
/// The token must consist of exactly three dot-separated segments; header and
/// payload must be base64url encoded JSON objects. The signature segment may be
/// empty, so that unsigned tokens are reported for their algorithm rather than
/// their shape.
///
/// A payload altered so that it no longer decodes to a JSON object is reported
/// as `MalformedToken` here, before any key is looked up; it never reaches the
/// signature check.
pub fn decode_unverified(token: &str) -> Result<UnverifiedToken, VerificationError> {
    let token = token.trim();
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(VerificationError::MalformedToken(format!(
            "Expected 3 dot-separated segments, found {}.",
            segments.len()
        )));
    }
    let (header_segment, payload_segment, signature_segment) =
        (segments[0], segments[1], segments[2]);

    let header: UnverifiedHeader = decode_segment(header_segment, "header")?;
    let claims: Claims = decode_segment(payload_segment, "payload")?;
    URL_SAFE_NO_PAD.decode(signature_segment).map_err(|e| {
        VerificationError::MalformedToken(format!("The signature is not valid base64url: {}.", e))
    })?;

    Ok(UnverifiedToken {
        header,
        claims,
        signing_input: format!("{}.{}", header_segment, payload_segment),
        signature: signature_segment.to_string(),
    })
}

fn decode_segment<T: DeserializeOwned>(segment: &str, name: &str) -> Result<T, VerificationError> {
    if segment.is_empty() {
        return Err(VerificationError::MalformedToken(format!("The {} segment is empty.", name)));
    }
    let bytes = URL_SAFE_NO_PAD.decode(segment).map_err(|e| {
        VerificationError::MalformedToken(format!("The {} is not valid base64url: {}.", name, e))
    })?;
    serde_json::from_slice(&bytes).map_err(|e| {
        VerificationError::MalformedToken(format!(
            "The {} is not a valid JSON object: {}.",
            name, e
        ))
    })
}
