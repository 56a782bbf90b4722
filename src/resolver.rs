// src/resolver.rs

use crate::error::VerificationError;
use crate::model::KeySet;
use base64::engine::{general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::DecodingKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::traits::PublicKeyParts;
use rsa::RsaPublicKey;
use std::fmt;
use tracing::debug;
use x509_cert::der::{DecodePem, Encode};
use x509_cert::Certificate;

/// The public key a token names, ready to verify signatures with.
#[derive(Clone)]
pub struct ResolvedKey {
    kid: String,
    key: DecodingKey,
}

impl ResolvedKey {
    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub(crate) fn decoding_key(&self) -> &DecodingKey {
        &self.key
    }
}

// The key material itself stays out of logs.
impl fmt::Debug for ResolvedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedKey").field("kid", &self.kid).finish_non_exhaustive()
    }
}

/// Looks up the certificate for `kid` and extracts its RSA public key.
pub fn resolve_key(kid: &str, key_set: &KeySet) -> Result<ResolvedKey, VerificationError> {
    let pem = key_set.certificate(kid).ok_or_else(|| {
        VerificationError::UnknownKeyId(format!(
            "No certificate for kid '{}' among {} published keys.",
            kid,
            key_set.len()
        ))
    })?;

    let key = decoding_key_from_certificate(pem)?;
    debug!("Resolved public key for kid: {}", kid);
    Ok(ResolvedKey {
        kid: kid.to_string(),
        key,
    })
}

fn decoding_key_from_certificate(pem: &str) -> Result<DecodingKey, VerificationError> {
    let certificate = Certificate::from_pem(pem.as_bytes())
        .map_err(|e| {
            VerificationError::InvalidCertificate(format!(
                "Failed to parse PEM certificate: {}.",
                e
            ))
        })?;

    let spki_der = certificate
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| {
            VerificationError::InvalidCertificate(format!(
                "Failed to encode the public key info: {}.",
                e
            ))
        })?;

    let public_key = RsaPublicKey::from_public_key_der(&spki_der)
        .map_err(|e| {
            VerificationError::InvalidCertificate(format!(
                "The certificate does not hold an RSA public key: {}.",
                e
            ))
        })?;

    let n = URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be());
    let e = URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be());
    DecodingKey::from_rsa_components(&n, &e)
        .map_err(|err| {
            VerificationError::InvalidCertificate(format!("Unusable RSA key: {}.", err))
        })
}
