// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use chrono::Duration;

use crate::auth::JwksManager;
use crate::config::AuthSettings;
use crate::custody::CustodyGateway;
use crate::storage::{
    AuditRepository, FsAssetStore, LedgerError, RedbLedger, StorageError, StoragePaths,
};
use crate::transform::CodeTransformer;

/// Runtime token verification configuration.
#[derive(Clone, Default)]
pub struct AuthConfig {
    /// Present when `AUTH_JWKS_URL` is configured.
    pub jwks: Option<JwksManager>,
    /// HS256 project secret.
    pub jwt_secret: Option<String>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

impl AuthConfig {
    pub fn from_settings(settings: AuthSettings) -> Self {
        Self {
            jwks: settings.jwks_url.map(JwksManager::new),
            jwt_secret: settings.jwt_secret,
            issuer: settings.issuer,
            audience: settings.audience,
        }
    }

    /// Whether any verifier is available outside the `dev` feature.
    pub fn is_configured(&self) -> bool {
        self.jwks.is_some() || self.jwt_secret.is_some()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to open asset store: {0}")]
    Store(#[from] StorageError),

    #[error("failed to open ownership ledger: {0}")]
    Ledger(#[from] LedgerError),
}

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<CustodyGateway>,
    pub auth_config: AuthConfig,
    pub paths: StoragePaths,
}

impl AppState {
    pub fn new(gateway: CustodyGateway, paths: StoragePaths) -> Self {
        Self {
            gateway: Arc::new(gateway),
            auth_config: AuthConfig::default(),
            paths,
        }
    }

    /// Open the asset store, ledger and audit log under `paths`.
    pub fn open(
        paths: StoragePaths,
        transformer: Arc<dyn CodeTransformer>,
        orphan_grace: Duration,
    ) -> Result<Self, StartupError> {
        let store = FsAssetStore::open(paths.clone())?;
        let ledger = RedbLedger::open(&paths.ledger_db())?;
        let audit = AuditRepository::new(paths.clone());

        let gateway = CustodyGateway::new(
            Arc::new(store),
            Arc::new(ledger),
            transformer,
            Arc::new(audit),
        )
        .with_orphan_grace(orphan_grace);

        Ok(Self::new(gateway, paths))
    }

    pub fn with_auth_config(mut self, auth_config: AuthConfig) -> Self {
        self.auth_config = auth_config;
        self
    }
}
