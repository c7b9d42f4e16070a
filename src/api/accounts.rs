// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    auth::{Auth, AuthServiceError},
    error::ApiError,
    state::AuthState,
};

/// Credentials submitted for registration or login.
///
/// Deliberately not `Debug`; the password must never reach a log line.
#[derive(Deserialize, ToSchema)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    pub message: String,
    pub user_id: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ValidateResponse {
    pub user_id: String,
    /// Token expiry (RFC 3339).
    pub expires: DateTime<Utc>,
}

fn json_body(
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<CredentialsRequest, ApiError> {
    payload.map(|Json(request)| request).map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected request body");
        ApiError::bad_request("invalid request body")
    })
}

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = CredentialsRequest,
    tag = "Auth",
    responses(
        (status = 201, body = RegisterResponse),
        (status = 400, description = "Invalid email or password"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register(
    State(state): State<AuthState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let request = json_body(payload)?;
    let credential = state.auth.register(&request.email, &request.password).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "user registered".to_string(),
            user_id: credential.id.to_string(),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = CredentialsRequest,
    tag = "Auth",
    responses(
        (status = 200, body = LoginResponse),
        (status = 400, description = "Malformed request"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AuthState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let request = json_body(payload)?;
    let issued = state.auth.login(&request.email, &request.password).await?;
    Ok(Json(LoginResponse {
        token: issued.token,
    }))
}

#[utoipa::path(
    get,
    path = "/auth/validate",
    tag = "Auth",
    security(("bearer" = [])),
    responses(
        (status = 200, body = ValidateResponse),
        (status = 401, description = "Missing, invalid or expired token")
    )
)]
pub async fn validate(Auth(user): Auth) -> Result<Json<ValidateResponse>, ApiError> {
    let expires = DateTime::from_timestamp(user.expires_at, 0)
        .ok_or_else(|| ApiError::from(AuthServiceError::Internal))?;

    Ok(Json(ValidateResponse {
        user_id: user.user_id,
        expires,
    }))
}
