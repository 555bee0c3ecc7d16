//! Google Identity Services credential decoding.
//!
//! The sign-in SDK posts the ID token it received from accounts.google.com.
//! This module reads the profile claims out of the token payload and checks
//! the audience against the configured client id. Signature verification
//! against Google's certificates is out of scope here; the token is accepted
//! only from the first-party client over the authenticated origin.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

use super::AuthError;

/// Profile claims extracted from a Google ID token.
#[derive(Debug, Clone)]
pub struct GoogleProfile {
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// Raw ID token payload (only the claims used here).
#[derive(Debug, Deserialize)]
struct TokenPayload {
    #[serde(default)]
    aud: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

/// Decode the payload of a Google ID token credential.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredential` if the token is not a three-segment
/// JWT, the payload is not valid base64url JSON, the audience does not match
/// `expected_audience` (when configured), or no email claim is present.
pub fn decode_credential(
    credential: &str,
    expected_audience: Option<&str>,
) -> Result<GoogleProfile, AuthError> {
    let mut segments = credential.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(AuthError::InvalidCredential(
            "credential is not a JWT".to_string(),
        ));
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| AuthError::InvalidCredential("payload is not base64url".to_string()))?;

    let payload: TokenPayload = serde_json::from_slice(&bytes)
        .map_err(|_| AuthError::InvalidCredential("payload is not JSON".to_string()))?;

    if let Some(expected) = expected_audience
        && payload.aud.as_deref() != Some(expected)
    {
        return Err(AuthError::InvalidCredential(
            "audience mismatch".to_string(),
        ));
    }

    let email = payload.email.ok_or_else(|| {
        AuthError::InvalidCredential("credential carries no email".to_string())
    })?;

    Ok(GoogleProfile {
        email,
        name: payload.name,
        picture: payload.picture,
    })
}
