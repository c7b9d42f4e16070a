// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Gateway binary.

use std::process::ExitCode;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use gatekeeper::{config::GatewayConfig, gateway, server, telemetry, token_codec};

#[tokio::main]
async fn main() -> ExitCode {
    telemetry::init();
    info!("Gatekeeper gateway v{}", env!("CARGO_PKG_VERSION"));

    let config = match GatewayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let state = match token_codec(&config.token).and_then(|codec| gateway::build_state(&config, codec)) {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "Failed to initialize gateway");
            return ExitCode::FAILURE;
        }
    };

    let app = gateway::router(state, config.max_body_bytes);

    let shutdown = CancellationToken::new();
    tokio::spawn(server::shutdown_on_signal(shutdown.clone()));

    if let Err(e) = server::serve(config.bind_addr, app, shutdown).await {
        error!(error = %e, "Gateway stopped with error");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
