// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AuthState;

/// Readiness response with individual component status.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Overall status ("ok" or "degraded").
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    /// Whether the service process is running.
    pub service: String,
    /// Credential store round trip ("ok" or "unavailable").
    pub credential_store: String,
}

/// Simple health check response for liveness probes.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Liveness probe handler.
///
/// Always returns 200 if the process is running. Shared by the gateway and
/// the auth service; never authenticated.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness probe handler.
///
/// Returns 200 only if the credential store answers within its timeout.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready", body = ReadyResponse),
        (status = 503, description = "Service is not ready", body = ReadyResponse)
    )
)]
pub async fn readiness(State(state): State<AuthState>) -> (StatusCode, Json<ReadyResponse>) {
    let store_ok = state.auth.check_store().await;

    let response = ReadyResponse {
        status: if store_ok { "ok" } else { "degraded" }.to_string(),
        checks: HealthChecks {
            service: "ok".to_string(),
            credential_store: if store_ok { "ok" } else { "unavailable" }.to_string(),
        },
    };

    let status = if store_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::auth::codec::DEFAULT_TOKEN_TTL;
    use crate::auth::{AuthService, PasswordHasher, TokenCodec};
    use crate::credentials::InMemoryCredentialStore;

    #[tokio::test]
    async fn liveness_is_always_ok() {
        let Json(body) = liveness().await;
        assert_eq!(body.status, "ok");
    }

    #[tokio::test]
    async fn readiness_reports_store() {
        let codec = Arc::new(TokenCodec::new(b"health-secret", DEFAULT_TOKEN_TTL).unwrap());
        let service = AuthService::new(
            Arc::new(InMemoryCredentialStore::new()),
            codec,
            PasswordHasher::new(1024, 1).unwrap(),
        );

        let (status, Json(body)) = readiness(State(AuthState::new(service))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "ok");
        assert_eq!(body.checks.credential_store, "ok");
    }
}
