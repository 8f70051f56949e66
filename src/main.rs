// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atelier Labs

use std::{env, net::SocketAddr, path::PathBuf, sync::Arc};

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use edge_gateway::{
    ai::AiClient,
    api::router,
    auth::TokenExpectations,
    config::{GatewayConfig, DATA_DIR_ENV, HOST_ENV, PORT_ENV},
    logging,
    rate_limit::{CounterSweeper, RateLimiter, RedbCounterStore},
    secrets::{EnvSecrets, SecretProvider},
    state::AppState,
    storage::{Presigner, R2Client},
};

#[tokio::main]
async fn main() {
    logging::init();

    let secrets: Arc<dyn SecretProvider> = Arc::new(EnvSecrets);
    let config = match GatewayConfig::from_secrets(secrets.as_ref()) {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "gateway configuration is incomplete");
            std::process::exit(1);
        }
    };

    // Durable rate-limit counters live under DATA_DIR.
    let data_dir = env::var(DATA_DIR_ENV).unwrap_or_else(|_| "/data".to_string());
    let counter_path = PathBuf::from(data_dir).join("rate_limit.redb");
    let counters = Arc::new(
        RedbCounterStore::open(&counter_path).expect("open rate limit counter store"),
    );
    let limiter = Arc::new(RateLimiter::new(
        counters.clone(),
        config.max_requests_per_minute,
    ));

    let presigner = Presigner::new(
        &config.account_id,
        &config.bucket,
        &config.access_key_id,
        &config.secret_access_key,
    )
    .with_region(&config.region);
    let objects = Arc::new(R2Client::new(presigner.clone()).expect("build storage client"));

    let ai = Arc::new(
        AiClient::new(
            secrets.clone(),
            config.ai_gateway_id.clone(),
            &config.account_id,
        )
        .expect("build AI client"),
    );

    let expectations = Arc::new(TokenExpectations {
        issuer: config.issuer.clone(),
        audience: config.audience.clone(),
    });

    let state = AppState::new(
        secrets,
        expectations,
        limiter,
        objects,
        Arc::new(presigner),
        ai,
    );
    let app = router(state);

    // Background sweeper keeps the counter table from accumulating
    // expired windows.
    let shutdown = CancellationToken::new();
    tokio::spawn(CounterSweeper::new(counters).run(shutdown.clone()));

    // Parse bind address
    let host = env::var(HOST_ENV).unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var(PORT_ENV)
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .unwrap_or(8080);

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .expect("Failed to parse bind address");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind");

    info!("edge gateway listening on http://{addr} (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .expect("HTTP server failed");
}

/// Resolve on SIGINT or SIGTERM and cancel background tasks.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received");
    shutdown.cancel();
}
