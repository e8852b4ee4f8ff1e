// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{net::SocketAddr, process::ExitCode, sync::Arc};

use axum_server::tls_rustls::RustlsConfig;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use token_lifecycle_server::{
    api::router,
    auth::{RedbRegistry, RenewalRegistry, SystemClock, TokenLifecycle},
    config::{Config, LogFormat, DEFAULT_LOG_FILTER},
    state::AppState,
    sweeper::RegistrySweeper,
};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer().with_target(false)).init(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(config.log_format);
    info!(?config, "Configuration loaded");

    // Must happen before any TLS operation.
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        warn!("A rustls crypto provider was already installed");
    }

    let registry = match &config.registry_path {
        Some(path) => match RedbRegistry::open(path) {
            Ok(store) => {
                info!(path = %path.display(), "Using durable refresh registry");
                RenewalRegistry::new(Arc::new(store))
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to open refresh registry");
                return ExitCode::FAILURE;
            }
        },
        None => {
            info!("Using in-memory refresh registry; sessions end on restart");
            RenewalRegistry::in_memory()
        }
    };

    let lifecycle = Arc::new(TokenLifecycle::new(
        config.access_secret.as_bytes(),
        config.refresh_secret.as_bytes(),
        config.policy,
        registry,
        Arc::new(SystemClock),
    ));

    let shutdown = CancellationToken::new();
    let sweeper = RegistrySweeper::new(lifecycle.clone(), config.sweep_interval);
    let sweeper_handle = tokio::spawn(sweeper.run(shutdown.clone()));

    let app = router(AppState::new(lifecycle));

    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!(host = %config.host, port = config.port, error = %e, "Invalid bind address");
            return ExitCode::FAILURE;
        }
    };

    let server = async {
        match &config.tls {
            Some(tls) => {
                let tls_config = RustlsConfig::from_pem_file(&tls.cert, &tls.key).await?;
                info!(%addr, "Token lifecycle server listening on https (docs at /docs)");
                axum_server::bind_rustls(addr, tls_config)
                    .serve(app.into_make_service())
                    .await
            }
            None => {
                info!(%addr, "Token lifecycle server listening on http (docs at /docs)");
                axum_server::bind(addr).serve(app.into_make_service()).await
            }
        }
    };

    let exit = tokio::select! {
        result = server => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!(error = %e, "Server failed");
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
            ExitCode::SUCCESS
        }
    };

    shutdown.cancel();
    if let Err(e) = sweeper_handle.await {
        warn!(error = %e, "Registry sweeper task ended abnormally");
    }

    exit
}
