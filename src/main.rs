// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use asset_custody_server::{
    api::router,
    config::{AuthSettings, LogFormat, ServerConfig},
    state::{AppState, AuthConfig},
    storage::StoragePaths,
    transform::{CodeTransformer, GeminiTransformer, UnconfiguredTransformer},
};
use axum_server::tls_rustls::RustlsConfig;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let fmt_layer = match format {
        LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

fn exit_with(message: &str, err: impl std::fmt::Display) -> ! {
    error!(error = %err, "{message}");
    std::process::exit(1);
}

fn build_transformer() -> Arc<dyn CodeTransformer> {
    if !GeminiTransformer::is_configured() {
        warn!("GEMINI_API_KEY not set; modification requests will fail");
        return Arc::new(UnconfiguredTransformer);
    }
    match GeminiTransformer::from_env() {
        Ok(transformer) => Arc::new(transformer),
        Err(e) => exit_with("Failed to configure code transformer", e),
    }
}

#[tokio::main]
async fn main() {
    let config = ServerConfig::from_env();
    init_tracing(
        config
            .as_ref()
            .map(|c| c.log_format)
            .unwrap_or_default(),
    );
    let config = match config {
        Ok(config) => config,
        Err(e) => exit_with("Invalid server configuration", e),
    };

    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        exit_with("Failed to install rustls crypto provider", "already installed");
    }

    let auth_config = AuthConfig::from_settings(AuthSettings::from_env());
    if !auth_config.is_configured() {
        if cfg!(feature = "dev") {
            warn!("No token verifier configured; accepting unverified tokens (dev build)");
        } else {
            warn!("No token verifier configured; every authenticated request will fail");
        }
    }

    let paths = StoragePaths::new(&config.data_dir);
    let state = match AppState::open(
        paths,
        build_transformer(),
        chrono::Duration::seconds(config.orphan_grace_secs),
    ) {
        Ok(state) => state.with_auth_config(auth_config),
        Err(e) => exit_with("Failed to open storage", e),
    };
    info!(
        data_dir = %config.data_dir.display(),
        orphan_grace_secs = config.orphan_grace_secs,
        "Storage opened"
    );

    let app = router(state).into_make_service();
    let addr = config.bind_addr;

    let served = match &config.tls {
        Some(tls) => {
            let tls_config = match RustlsConfig::from_pem_file(&tls.cert, &tls.key).await {
                Ok(tls_config) => tls_config,
                Err(e) => exit_with("Failed to load TLS certificate", e),
            };
            info!(%addr, "Asset custody server listening (HTTPS)");
            axum_server::bind_rustls(addr, tls_config).serve(app).await
        }
        None => {
            warn!("TLS_CERT_PATH/TLS_KEY_PATH not set; serving plain HTTP");
            info!(%addr, "Asset custody server listening (HTTP)");
            axum_server::bind(addr).serve(app).await
        }
    };

    if let Err(e) = served {
        exit_with("Server terminated", e);
    }
}
