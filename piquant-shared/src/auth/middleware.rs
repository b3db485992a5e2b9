/// Bearer authentication middleware for Axum
///
/// Every protected route runs this guard first: it reads the
/// `Authorization: Bearer <token>` header, verifies the token, and injects
/// the resolved identity into the request extensions as [`AuthUser`]. A
/// request that fails here is rejected before any database or filesystem
/// access happens.
///
/// Handlers receive the identity explicitly via Axum's `Extension`
/// extractor; there is no ambient or global notion of "current user".
///
/// # Example
///
/// ```no_run
/// use axum::extract::Request;
/// use axum::middleware::Next;
/// use axum::{middleware, routing::get, Extension, Router};
/// use piquant_shared::auth::middleware::{bearer_auth, AuthUser};
///
/// async fn whoami(Extension(auth): Extension<AuthUser>) -> String {
///     format!("you are {}", auth.user_id)
/// }
///
/// let secret = "an-example-signing-secret-of-32-bytes!!".to_string();
/// let app: Router = Router::new()
///     .route("/whoami", get(whoami))
///     .layer(middleware::from_fn(move |req: Request, next: Next| {
///         bearer_auth(secret.clone(), req, next)
///     }));
/// ```

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::{validate_token, JwtError};

/// The authenticated caller, injected into request extensions on success
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Verified user id from the token's subject claim
    pub user_id: Uuid,
}

/// Error type for the authentication guard
#[derive(Debug)]
pub enum AuthError {
    /// No authorization header present
    MissingCredentials,

    /// Header present but not of the `Bearer <token>` shape
    InvalidFormat(String),

    /// Token failed verification (bad signature, malformed, wrong issuer)
    InvalidToken(String),

    /// Token verified but its expiry has passed
    ExpiredToken,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::MissingCredentials => {
                (StatusCode::UNAUTHORIZED, "Missing credentials").into_response()
            }
            AuthError::InvalidFormat(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            AuthError::InvalidToken(msg) => (StatusCode::UNAUTHORIZED, msg).into_response(),
            AuthError::ExpiredToken => {
                (StatusCode::UNAUTHORIZED, "Token expired").into_response()
            }
        }
    }
}

/// Pulls the bearer token out of an `Authorization` header value
///
/// Returns [`AuthError::InvalidFormat`] if the header does not start with
/// the `Bearer ` scheme prefix.
pub fn extract_bearer(header_value: &str) -> Result<&str, AuthError> {
    header_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))
}

/// Bearer authentication middleware
///
/// # Errors
///
/// Returns 401 Unauthorized when the header is missing, the token fails
/// verification, or the token has expired; 400 Bad Request when the header
/// is present but not a bearer credential.
pub async fn bearer_auth(
    secret: String,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token = extract_bearer(auth_header)?;

    let claims = validate_token(token, &secret).map_err(|e| match e {
        JwtError::Expired => AuthError::ExpiredToken,
        e => AuthError::InvalidToken(e.to_string()),
    })?;

    req.extensions_mut().insert(AuthUser {
        user_id: claims.sub,
    });

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer abc.def.ghi").unwrap(), "abc.def.ghi");
        assert!(matches!(
            extract_bearer("Basic dXNlcjpwYXNz"),
            Err(AuthError::InvalidFormat(_))
        ));
        assert!(matches!(
            extract_bearer("bearer lowercase-scheme"),
            Err(AuthError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_auth_error_status_codes() {
        let response = AuthError::MissingCredentials.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = AuthError::InvalidFormat("bad".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = AuthError::InvalidToken("bad".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = AuthError::ExpiredToken.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
