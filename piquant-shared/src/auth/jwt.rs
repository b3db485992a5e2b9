/// Bearer token issuance and verification
///
/// Tokens are JWTs signed with HS256 (HMAC-SHA256). Each token embeds the
/// authenticated user id and an absolute expiry 24 hours after issuance.
/// There is no refresh mechanism: an expired token means the caller must log
/// in again.
///
/// # Security
///
/// - **Algorithm**: HS256 only; no algorithm negotiation
/// - **Expiration**: 24 hours, validated on every verify
/// - **Secret**: process-wide configuration, loaded once at startup,
///   at least 32 bytes (enforced by the config layer)
///
/// # Example
///
/// ```
/// use piquant_shared::auth::jwt::{create_token, validate_token, Claims};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let user_id = Uuid::new_v4();
/// let secret = "an-example-signing-secret-of-32-bytes!!";
///
/// let token = create_token(&Claims::new(user_id), secret)?;
/// let claims = validate_token(&token, secret)?;
/// assert_eq!(claims.sub, user_id);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Token issuer embedded in and required of every token
const ISSUER: &str = "piquant";

/// How long an issued token stays valid
pub fn token_lifetime() -> Duration {
    Duration::hours(24)
}

/// Error type for token operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to sign a new token
    #[error("failed to create token: {0}")]
    Create(String),

    /// Token is structurally malformed, carries a bad signature, or names
    /// the wrong issuer
    #[error("invalid token: {0}")]
    Invalid(String),

    /// Token was once valid but its embedded expiry has passed
    #[error("token has expired")]
    Expired,
}

/// Claims carried by every issued token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - the authenticated user id
    pub sub: Uuid,

    /// Issuer - always "piquant"
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Creates claims for `user_id` expiring 24 hours from now
    pub fn new(user_id: Uuid) -> Self {
        Self::with_lifetime(user_id, token_lifetime())
    }

    /// Creates claims with a custom lifetime
    ///
    /// Mostly useful in tests to fabricate already-expired tokens by passing
    /// a negative duration.
    pub fn with_lifetime(user_id: Uuid, lifetime: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
        }
    }

    /// Whether the embedded expiry has passed
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Signs a token from claims
///
/// # Errors
///
/// Returns [`JwtError::Create`] if encoding fails.
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key).map_err(|e| JwtError::Create(e.to_string()))
}

/// Verifies a token and extracts its claims
///
/// Checks the signature, the expiry and the issuer. Expiry failures are
/// reported as [`JwtError::Expired`] so callers can distinguish a stale
/// credential from a forged one; every other failure collapses into
/// [`JwtError::Invalid`].
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        _ => JwtError::Invalid(e.to_string()),
    })?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-signing-secret-at-least-32-bytes";

    #[test]
    fn test_claims_embed_subject_and_expiry() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(user_id);

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.iss, ISSUER);
        assert!(!claims.is_expired());
        assert_eq!(claims.exp - claims.iat, token_lifetime().num_seconds());
    }

    #[test]
    fn test_create_and_validate_roundtrip() {
        let user_id = Uuid::new_v4();
        let token = create_token(&Claims::new(user_id), SECRET).expect("should sign");

        let claims = validate_token(&token, SECRET).expect("should validate");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.iss, ISSUER);
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let token = create_token(&Claims::new(Uuid::new_v4()), SECRET).unwrap();

        let result = validate_token(&token, "a-different-secret-of-32-bytes-xxxx");
        assert!(matches!(result, Err(JwtError::Invalid(_))));
    }

    #[test]
    fn test_tampered_signature_is_invalid() {
        let token = create_token(&Claims::new(Uuid::new_v4()), SECRET).unwrap();

        // Rewrite the final signature character so the decoded bytes change
        // even for decoders that ignore unused trailing bits.
        let mut tampered = token.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if matches!(last, 'A'..='D') { 'Q' } else { 'A' });

        let result = validate_token(&tampered, SECRET);
        assert!(matches!(result, Err(JwtError::Invalid(_))));
    }

    #[test]
    fn test_garbage_token_is_invalid() {
        let result = validate_token("not-a-jwt", SECRET);
        assert!(matches!(result, Err(JwtError::Invalid(_))));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let claims = Claims::with_lifetime(Uuid::new_v4(), Duration::hours(-25));
        assert!(claims.is_expired());

        let token = create_token(&claims, SECRET).unwrap();
        let result = validate_token(&token, SECRET);
        assert!(matches!(result, Err(JwtError::Expired)));
    }

    #[test]
    fn test_wrong_issuer_is_rejected() {
        let mut claims = Claims::new(Uuid::new_v4());
        claims.iss = "someone-else".to_string();

        let token = create_token(&claims, SECRET).unwrap();
        let result = validate_token(&token, SECRET);
        assert!(matches!(result, Err(JwtError::Invalid(_))));
    }
}
