// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Custody Storage
//!
//! Persistent state for the custody pipeline: ciphertext blobs, the
//! ownership ledger, and the audit trail.
//!
//! ## Storage Layout
//!
//! ```text
//! {DATA_DIR}/
//!   blobs/
//!     {seller_id}/{millis}_{file_name}.enc                  # Original assets
//!     versions/{buyer_id}/{listing_id}/v{n}.{ext}.enc       # Derived versions
//!   staging/                                                # In-flight blob writes
//!   ledger.redb                                             # Listings, purchases, versions
//!   audit/
//!     {date}/events.jsonl                                   # Daily audit logs
//! ```
//!
//! ## Important Notes
//!
//! - Blobs are ciphertext only; plaintext never touches this module
//! - Blob paths are write-once
//! - Keys live in the ledger, never next to their blobs

pub mod audit;
pub mod blob_store;
pub mod ledger;
pub mod paths;
pub mod records;

pub use audit::{AuditEvent, AuditEventType, AuditRepository};
pub use blob_store::{AssetStore, FsAssetStore, StorageError, StorageResult, StoredBlob};
pub use ledger::{LedgerError, LedgerResult, OwnershipLedger, RedbLedger};
pub use paths::StoragePaths;
pub use records::{ListingRecord, PurchaseRecord, VersionRecord};
