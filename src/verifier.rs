// src/verifier.rs

use crate::config::ValidationDetails;
use crate::decoder::{decode_unverified, UnverifiedToken};
use crate::error::{VerificationError, VerificationFailure};
use crate::model::{Audience, Claims, VerifiedToken};
use crate::resolver::ResolvedKey;
use jsonwebtoken::{crypto, get_current_timestamp, Algorithm};
use tracing::{debug, instrument};

/// The provider rejects subjects longer than this many characters.
const MAX_SUBJECT_LEN: usize = 128;

/// Checks whether the algorithm a token claims is the pinned one.
pub fn check_algorithm(
    token: &UnverifiedToken,
    pinned: Algorithm,
) -> Result<(), VerificationError> {
    match token.header.alg.parse::<Algorithm>() {
        Ok(alg) if alg == pinned => Ok(()),
        _ => Err(VerificationError::AlgorithmMismatch {
            expected: format!("{:?}", pinned),
            actual: format!("'{}'", token.header.alg),
        }),
    }
}

/// Verifies the signature and claims of a raw token with an already resolved key.
pub fn verify_token(
    token: &str,
    key: &ResolvedKey,
    validation: &ValidationDetails,
) -> Result<VerifiedToken, VerificationFailure> {
    let decoded = decode_unverified(token)?;
    verify_decoded(&decoded, key, validation, get_current_timestamp())
}

/// Verifies a decoded token as of `now` (seconds since the Unix epoch).
///
/// Every check runs, and all failures are reported together in a fixed
/// order: algorithm, signature, `exp`, `iat`, `iss`, `aud`, `sub`. Claims are
/// inspected even when the signature is bad, for diagnostics only; the
/// outcome is then still a failure.
#[instrument(skip_all, fields(kid = key.kid()))]
pub fn verify_decoded(
    token: &UnverifiedToken,
    key: &ResolvedKey,
    validation: &ValidationDetails,
    now: u64,
) -> Result<VerifiedToken, VerificationFailure> {
    let mut errors = Vec::new();

    match check_algorithm(token, validation.algorithm) {
        // The signature is only meaningful under the pinned algorithm.
        Ok(()) => {
            if let Err(e) = check_signature(token, key, validation.algorithm) {
                errors.push(e);
            }
        }
        Err(e) => errors.push(e),
    }

    errors.extend(check_claims(&token.claims, validation, now));

    if let Some(failure) = VerificationFailure::from_errors(errors) {
        debug!("Token rejected: {:?}", failure.kinds());
        return Err(failure);
    }

    // check_claims guarantees a valid `sub` when it reports nothing.
    let subject = token.claims.sub.clone().unwrap_or_default();
    debug!("Token verified for subject: {}", subject);
    Ok(VerifiedToken {
        subject,
        claims: token.claims.clone(),
    })
}

fn check_signature(
    token: &UnverifiedToken,
    key: &ResolvedKey,
    algorithm: Algorithm,
) -> Result<(), VerificationError> {
    match crypto::verify(
        token.signature(),
        token.signing_input().as_bytes(),
        key.decoding_key(),
        algorithm,
    ) {
        Ok(true) => Ok(()),
        Ok(false) => Err(VerificationError::SignatureInvalid(format!(
            "The signature does not match the key '{}'.",
            key.kid()
        ))),
        Err(e) => Err(VerificationError::SignatureInvalid(e.to_string())),
    }
}

/// Validates the registered claims, returning every violation found.
pub fn check_claims(
    claims: &Claims,
    validation: &ValidationDetails,
    now: u64,
) -> Vec<VerificationError> {
    let leeway = validation.leeway.as_secs();
    let mut errors = Vec::new();

    match claims.exp {
        Some(exp) if exp.saturating_add(leeway) > now => {}
        Some(exp) => errors.push(VerificationError::Expired(format!(
            "'exp' {} is not after the current time {}.",
            exp, now
        ))),
        None => errors.push(VerificationError::Expired("The 'exp' claim is missing.".to_string())),
    }

    match claims.iat {
        Some(iat) if iat <= now.saturating_add(leeway) => {}
        Some(iat) => errors.push(VerificationError::IssuedAtInFuture(format!(
            "'iat' {} is after the current time {}.",
            iat, now
        ))),
        None => errors.push(VerificationError::IssuedAtInFuture(
            "The 'iat' claim is missing.".to_string(),
        )),
    }

    let expected_issuer = validation.expected_issuer();
    if claims.iss.as_deref() != Some(expected_issuer.as_str()) {
        errors.push(VerificationError::InvalidIssuer {
            expected: expected_issuer,
            actual: describe(claims.iss.as_deref()),
        });
    }

    match &claims.aud {
        Some(Audience::Single(aud)) if *aud == validation.project_id => {}
        other => errors.push(VerificationError::InvalidAudience {
            expected: validation.project_id.clone(),
            actual: other
                .as_ref()
                .map_or_else(|| "nothing".to_string(), ToString::to_string),
        }),
    }

    match claims.sub.as_deref() {
        Some(sub) if !sub.is_empty() && sub.chars().count() <= MAX_SUBJECT_LEN => {}
        Some(sub) if !sub.is_empty() => errors.push(VerificationError::InvalidSubject(format!(
            "must be at most {} characters long.",
            MAX_SUBJECT_LEN
        ))),
        _ => errors.push(VerificationError::InvalidSubject(
            "must be a non-empty string.".to_string(),
        )),
    }

    errors
}

fn describe(value: Option<&str>) -> String {
    value.map_or_else(|| "nothing".to_string(), |v| format!("'{}'", v))
}
