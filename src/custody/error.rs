// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use uuid::Uuid;

use crate::crypto::CryptoError;
use crate::storage::{LedgerError, StorageError};
use crate::transform::TransformError;

/// Failure taxonomy of the custody gateway.
///
/// `AccessDenied` deliberately covers both "no such purchase" and "not your
/// purchase" so callers cannot probe for existence.
#[derive(Debug, thiserror::Error)]
pub enum CustodyError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("purchase not found or access denied")]
    AccessDenied,

    #[error("listing already purchased")]
    AlreadyPurchased,

    #[error("corrupt record: {0}")]
    CorruptRecord(String),

    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("crypto failure: {0}")]
    Crypto(#[from] CryptoError),

    #[error("transformation failed: {0}")]
    TransformFailed(String),

    #[error("version {version_number} of purchase {purchase_id} already exists")]
    VersionConflict {
        purchase_id: Uuid,
        version_number: u32,
    },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("persistence error: {0}")]
    Persistence(LedgerError),
}

impl From<LedgerError> for CustodyError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::VersionConflict {
                purchase_id,
                version_number,
            } => CustodyError::VersionConflict {
                purchase_id,
                version_number,
            },
            LedgerError::DuplicatePurchase { .. } => CustodyError::AlreadyPurchased,
            other => CustodyError::Persistence(other),
        }
    }
}

impl From<TransformError> for CustodyError {
    fn from(e: TransformError) -> Self {
        CustodyError::TransformFailed(e.to_string())
    }
}

pub type CustodyResult<T> = Result<T, CustodyError>;
