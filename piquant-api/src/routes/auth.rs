/// Authentication endpoints
///
/// This module provides the public authentication endpoints:
///
/// - `POST /v1/auth/signup` - create an account
/// - `POST /v1/auth/login` - exchange credentials for a bearer token
///
/// Login failures are deliberately indistinguishable: an unknown email and a
/// wrong password both produce the same 401 with the same message, so the
/// endpoint does not leak which half of the pair was wrong.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, http::StatusCode, Json};
use piquant_shared::{
    auth::{jwt, password},
    models::user::{CreateUser, User},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// The one message returned for every credential failure
const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Signup request
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SignupRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Signup response
#[derive(Debug, Serialize)]
pub struct SignupResponse {
    /// Id of the created user
    pub user_id: Uuid,

    /// Confirmation message
    pub message: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Id of the authenticated user
    pub user_id: Uuid,

    /// Bearer token, valid for 24 hours
    pub token: String,
}

/// Create a new user account
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/signup
/// Content-Type: application/json
///
/// {
///   "email": "user@example.com",
///   "password": "at-least-8-chars"
/// }
/// ```
///
/// # Errors
///
/// - `409 Conflict`: email already registered
/// - `422 Unprocessable Entity`: validation failed
/// - `500 Internal Server Error`: hashing or database failure
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<(StatusCode, Json<SignupResponse>)> {
    req.validate()?;

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            email: req.email,
            password_hash,
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, "user account created");

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            user_id: user.id,
            message: "Account created".to_string(),
        }),
    ))
}

/// Authenticate and issue a bearer token
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/login
/// Content-Type: application/json
///
/// {
///   "email": "user@example.com",
///   "password": "at-least-8-chars"
/// }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "user_id": "uuid",
///   "token": "eyJ..."
/// }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: unknown email or wrong password (same message for both)
/// - `422 Unprocessable Entity`: validation failed
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    req.validate()?;

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    let valid = password::verify_password(&req.password, &user.password_hash)?;
    if !valid {
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    let token = jwt::create_token(&jwt::Claims::new(user.id), state.jwt_secret())?;

    Ok(Json(LoginResponse {
        user_id: user.id,
        token,
    }))
}
