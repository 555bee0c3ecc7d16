//! Session token issuance and verification.
//!
//! Sessions are stateless HS256 JWTs carried in an HTTP-only cookie. The
//! claims hold everything `me` needs to re-identify the user; revocation is
//! by expiry only (7 days).

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use rangoli_core::{Email, UserId};

use super::AuthError;

/// Session lifetime in seconds (7 days).
pub const TOKEN_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Claims embedded in every session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Numeric user ID (matches `users.id`).
    pub sub: i32,
    /// Normalized email at issuance time.
    pub email: String,
    /// Issued-at (Unix timestamp, seconds).
    pub iat: i64,
    /// Standard JWT expiry (Unix timestamp, seconds).
    pub exp: i64,
}

impl Claims {
    /// The user id carried by the token.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        UserId::new(self.sub)
    }
}

/// Issue a signed session token for a user.
///
/// # Errors
///
/// Returns `AuthError::TokenIssue` if signing fails.
pub fn issue(secret: &SecretString, user_id: UserId, email: &Email) -> Result<String, AuthError> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.as_i32(),
        email: email.as_str().to_string(),
        iat: now,
        exp: now + TOKEN_TTL_SECONDS,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.expose_secret().as_bytes()),
    )
    .map_err(|_| AuthError::TokenIssue)
}

/// Verify a session token's signature and expiry.
///
/// # Errors
///
/// Returns `AuthError::InvalidToken` on any verification failure. Signature
/// failures are terminal - the caller must not retry.
pub fn verify(secret: &SecretString, token: &str) -> Result<Claims, AuthError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.expose_secret().as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AuthError::InvalidToken)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn secret() -> SecretString {
        SecretString::from("k9#mQ2$vX7!pL4@wZ8&nR3*jT6^hB1%d")
    }

    #[test]
    fn test_issue_verify_roundtrip() {
        let email = Email::parse("user@example.com").unwrap();
        let token = issue(&secret(), UserId::new(42), &email).unwrap();

        let claims = verify(&secret(), &token).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.user_id(), UserId::new(42));
        assert_eq!(claims.email, "user@example.com");
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_SECONDS);
    }

    #[test]
    fn test_verify_rejects_wrong_secret() {
        let email = Email::parse("user@example.com").unwrap();
        let token = issue(&secret(), UserId::new(1), &email).unwrap();

        let other = SecretString::from("z1!aB2@cD3#eF4$gH5%iJ6^kL7&mN8*o");
        assert!(matches!(
            verify(&other, &token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_verify_rejects_tampered_token() {
        let email = Email::parse("user@example.com").unwrap();
        let token = issue(&secret(), UserId::new(1), &email).unwrap();

        let mut tampered = token;
        tampered.push('x');
        assert!(matches!(
            verify(&secret(), &tampered),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_verify_rejects_expired_token() {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: 1,
            email: "user@example.com".to_string(),
            iat: now - 2 * TOKEN_TTL_SECONDS,
            exp: now - TOKEN_TTL_SECONDS,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret().expose_secret().as_bytes()),
        )
        .unwrap();

        assert!(matches!(
            verify(&secret(), &token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_verify_rejects_garbage() {
        assert!(matches!(
            verify(&secret(), "not-a-token"),
            Err(AuthError::InvalidToken)
        ));
    }
}
