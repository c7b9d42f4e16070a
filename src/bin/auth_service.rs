// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Auth service binary.

use std::process::ExitCode;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use gatekeeper::{
    api,
    auth::{AuthService, PasswordHasher},
    config::AuthServiceConfig,
    credentials::{CredentialStore, InMemoryCredentialStore, RedbCredentialStore},
    server,
    state::AuthState,
    telemetry, token_codec,
};

#[tokio::main]
async fn main() -> ExitCode {
    telemetry::init();
    info!("Gatekeeper auth service v{}", env!("CARGO_PKG_VERSION"));

    let config = match AuthServiceConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let codec = match token_codec(&config.token) {
        Ok(codec) => codec,
        Err(e) => {
            error!(error = %e, "Invalid token settings");
            return ExitCode::FAILURE;
        }
    };

    let hasher = match PasswordHasher::new(config.password_memory_kib, config.password_iterations) {
        Ok(hasher) => hasher,
        Err(e) => {
            error!(error = %e, "Invalid password hashing parameters");
            return ExitCode::FAILURE;
        }
    };

    let store: Arc<dyn CredentialStore> = match &config.credentials_db {
        Some(path) => match RedbCredentialStore::open(path) {
            Ok(store) => {
                info!(path = %path.display(), "Credential store opened");
                Arc::new(store)
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to open credential store");
                return ExitCode::FAILURE;
            }
        },
        None => {
            warn!("CREDENTIALS_DB not set, credentials are kept in memory only");
            Arc::new(InMemoryCredentialStore::new())
        }
    };

    let service = AuthService::new(store, codec, hasher).with_store_timeout(config.store_timeout);
    let app = api::router(AuthState::new(service));

    let shutdown = CancellationToken::new();
    tokio::spawn(server::shutdown_on_signal(shutdown.clone()));

    if let Err(e) = server::serve(config.bind_addr, app, shutdown).await {
        error!(error = %e, "Auth service stopped with error");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
