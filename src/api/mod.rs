// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::state::AuthState;

pub mod accounts;
pub mod health;

/// Auth service router. Account routes live under `/auth` because the
/// gateway forwards the full request path.
pub fn router(state: AuthState) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(accounts::register))
        .route("/login", post(accounts::login))
        .route("/validate", get(accounts::validate));

    Router::new()
        .nest("/auth", auth_routes)
        .route("/health", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        accounts::register,
        accounts::login,
        accounts::validate,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            accounts::CredentialsRequest,
            accounts::RegisterResponse,
            accounts::LoginResponse,
            accounts::ValidateResponse,
            health::HealthResponse,
            health::ReadyResponse,
            health::HealthChecks
        )
    ),
    modifiers(&BearerSecurity),
    tags(
        (name = "Auth", description = "Registration, login and token introspection"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
pub struct ApiDoc;
