// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ownership ledger backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `listings`: listing_id → serialized ListingRecord
//! - `listing_paths`: original storage path → listing_id
//! - `purchases`: purchase_id → serialized PurchaseRecord
//! - `buyer_listing_index`: composite key (buyer|listing) → purchase_id
//! - `versions`: composite key (purchase|version_be32) → serialized VersionRecord
//!
//! ## Uniqueness
//!
//! Both ledger invariants are checked inside the same write transaction
//! that performs the insert. redb serializes writers, so a check and its
//! insert can never interleave with another writer.
//!
//! - (buyer, listing) has at most one purchase.
//! - (purchase, version_number) is unique and equals the current max + 1.

use std::collections::HashSet;
use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use uuid::Uuid;

use super::records::{ListingRecord, PurchaseRecord, VersionRecord};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: listing_id → serialized ListingRecord (JSON bytes).
const LISTINGS: TableDefinition<&str, &[u8]> = TableDefinition::new("listings");

/// Index: original ciphertext path → listing_id.
const LISTING_PATHS: TableDefinition<&str, &str> = TableDefinition::new("listing_paths");

/// Primary table: purchase_id → serialized PurchaseRecord (JSON bytes).
const PURCHASES: TableDefinition<&str, &[u8]> = TableDefinition::new("purchases");

/// Index: `len_be32 | buyer_id | listing_uuid` → purchase_id.
const BUYER_LISTING_INDEX: TableDefinition<&[u8], &str> =
    TableDefinition::new("buyer_listing_index");

/// Versions: `purchase_uuid | version_be32` → serialized VersionRecord.
const VERSIONS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("versions");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("buyer {buyer_id} already purchased listing {listing_id}")]
    DuplicatePurchase { buyer_id: String, listing_id: Uuid },

    #[error("version {version_number} conflicts with existing versions of purchase {purchase_id}")]
    VersionConflict {
        purchase_id: Uuid,
        version_number: u32,
    },

    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

// =============================================================================
// Ledger Trait
// =============================================================================

/// Relational records gating every key release.
pub trait OwnershipLedger: Send + Sync {
    fn insert_listing(&self, listing: &ListingRecord) -> LedgerResult<()>;
    fn get_listing(&self, listing_id: Uuid) -> LedgerResult<Option<ListingRecord>>;
    fn find_listing_by_path(&self, storage_path: &str) -> LedgerResult<Option<ListingRecord>>;

    /// Fails with [`LedgerError::DuplicatePurchase`] for a repeat (buyer, listing).
    fn insert_purchase(&self, purchase: &PurchaseRecord) -> LedgerResult<()>;
    fn get_purchase(&self, purchase_id: Uuid) -> LedgerResult<Option<PurchaseRecord>>;
    fn find_purchase(&self, buyer_id: &str, listing_id: Uuid)
        -> LedgerResult<Option<PurchaseRecord>>;
    fn purchases_by_buyer(&self, buyer_id: &str) -> LedgerResult<Vec<PurchaseRecord>>;

    /// Fails with [`LedgerError::VersionConflict`] unless the number is
    /// exactly one above the purchase's current latest.
    fn insert_version(&self, version: &VersionRecord) -> LedgerResult<()>;
    fn get_version(&self, purchase_id: Uuid, version_number: u32)
        -> LedgerResult<Option<VersionRecord>>;
    fn latest_version(&self, purchase_id: Uuid) -> LedgerResult<Option<VersionRecord>>;
    /// Ascending by version number.
    fn versions_for_purchase(&self, purchase_id: Uuid) -> LedgerResult<Vec<VersionRecord>>;

    /// Every storage path referenced by a listing or a version.
    fn referenced_paths(&self) -> LedgerResult<HashSet<String>>;

    fn health_check(&self) -> LedgerResult<()>;
}

// =============================================================================
// Composite Key Helpers
// =============================================================================

const VERSION_KEY_LEN: usize = 16 + 4;

/// Build a versions key: `purchase_uuid_bytes | version_number_be`.
///
/// Big-endian numbers sort numerically, so the last key in a purchase's
/// range is its latest version.
fn version_key(purchase_id: Uuid, version_number: u32) -> [u8; VERSION_KEY_LEN] {
    let mut key = [0u8; VERSION_KEY_LEN];
    key[..16].copy_from_slice(purchase_id.as_bytes());
    key[16..].copy_from_slice(&version_number.to_be_bytes());
    key
}

fn version_number_from_key(key: &[u8]) -> LedgerResult<u32> {
    let tail: [u8; 4] = key
        .get(16..VERSION_KEY_LEN)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| LedgerError::InvalidRecord("malformed version key".to_string()))?;
    Ok(u32::from_be_bytes(tail))
}

/// Build the buyer/listing prefix: `buyer_len_be | buyer_id`.
///
/// The length prefix keeps buyer ids that share a textual prefix apart.
fn buyer_prefix(buyer_id: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(4 + buyer_id.len() + 16);
    prefix.extend_from_slice(&(buyer_id.len() as u32).to_be_bytes());
    prefix.extend_from_slice(buyer_id.as_bytes());
    prefix
}

fn buyer_listing_key(buyer_id: &str, listing_id: Uuid) -> Vec<u8> {
    let mut key = buyer_prefix(buyer_id);
    key.extend_from_slice(listing_id.as_bytes());
    key
}

// =============================================================================
// RedbLedger
// =============================================================================

/// Embedded ACID ownership ledger.
pub struct RedbLedger {
    db: Database,
}

impl RedbLedger {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> LedgerResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(LISTINGS)?;
            let _ = write_txn.open_table(LISTING_PATHS)?;
            let _ = write_txn.open_table(PURCHASES)?;
            let _ = write_txn.open_table(BUYER_LISTING_INDEX)?;
            let _ = write_txn.open_table(VERSIONS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }
}

impl OwnershipLedger for RedbLedger {
    // =========================================================================
    // Listings
    // =========================================================================

    fn insert_listing(&self, listing: &ListingRecord) -> LedgerResult<()> {
        let id = listing.id.to_string();
        let json = serde_json::to_vec(listing)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut listings = write_txn.open_table(LISTINGS)?;
            if listings.get(id.as_str())?.is_some() {
                return Err(LedgerError::AlreadyExists(format!("listing {id}")));
            }

            let mut paths = write_txn.open_table(LISTING_PATHS)?;
            if paths.get(listing.storage_path.as_str())?.is_some() {
                return Err(LedgerError::AlreadyExists(format!(
                    "storage path {}",
                    listing.storage_path
                )));
            }

            listings.insert(id.as_str(), json.as_slice())?;
            paths.insert(listing.storage_path.as_str(), id.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn get_listing(&self, listing_id: Uuid) -> LedgerResult<Option<ListingRecord>> {
        let id = listing_id.to_string();
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LISTINGS)?;
        match table.get(id.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn find_listing_by_path(&self, storage_path: &str) -> LedgerResult<Option<ListingRecord>> {
        let read_txn = self.db.begin_read()?;
        let paths = read_txn.open_table(LISTING_PATHS)?;
        let Some(id) = paths.get(storage_path)? else {
            return Ok(None);
        };

        let listings = read_txn.open_table(LISTINGS)?;
        match listings.get(id.value())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    // =========================================================================
    // Purchases
    // =========================================================================

    fn insert_purchase(&self, purchase: &PurchaseRecord) -> LedgerResult<()> {
        let id = purchase.id.to_string();
        let json = serde_json::to_vec(purchase)?;
        let index_key = buyer_listing_key(&purchase.buyer_id, purchase.listing_id);

        let write_txn = self.db.begin_write()?;
        {
            let mut index = write_txn.open_table(BUYER_LISTING_INDEX)?;
            if index.get(index_key.as_slice())?.is_some() {
                return Err(LedgerError::DuplicatePurchase {
                    buyer_id: purchase.buyer_id.clone(),
                    listing_id: purchase.listing_id,
                });
            }

            let mut purchases = write_txn.open_table(PURCHASES)?;
            if purchases.get(id.as_str())?.is_some() {
                return Err(LedgerError::AlreadyExists(format!("purchase {id}")));
            }

            purchases.insert(id.as_str(), json.as_slice())?;
            index.insert(index_key.as_slice(), id.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn get_purchase(&self, purchase_id: Uuid) -> LedgerResult<Option<PurchaseRecord>> {
        let id = purchase_id.to_string();
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PURCHASES)?;
        match table.get(id.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn find_purchase(
        &self,
        buyer_id: &str,
        listing_id: Uuid,
    ) -> LedgerResult<Option<PurchaseRecord>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(BUYER_LISTING_INDEX)?;
        let key = buyer_listing_key(buyer_id, listing_id);
        let Some(purchase_id) = index.get(key.as_slice())? else {
            return Ok(None);
        };

        let purchases = read_txn.open_table(PURCHASES)?;
        match purchases.get(purchase_id.value())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn purchases_by_buyer(&self, buyer_id: &str) -> LedgerResult<Vec<PurchaseRecord>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(BUYER_LISTING_INDEX)?;
        let purchases = read_txn.open_table(PURCHASES)?;

        let mut start = buyer_prefix(buyer_id);
        let mut end = start.clone();
        start.extend_from_slice(&[0x00; 16]);
        end.extend_from_slice(&[0xFF; 16]);

        let mut results = Vec::new();
        for entry in index.range(start.as_slice()..=end.as_slice())? {
            let (_, purchase_id) = entry?;
            if let Some(value) = purchases.get(purchase_id.value())? {
                results.push(serde_json::from_slice::<PurchaseRecord>(value.value())?);
            }
        }

        results.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(results)
    }

    // =========================================================================
    // Versions
    // =========================================================================

    fn insert_version(&self, version: &VersionRecord) -> LedgerResult<()> {
        if version.version_number == 0 {
            return Err(LedgerError::InvalidRecord(
                "version 0 is reserved for the original asset".to_string(),
            ));
        }

        let purchase_id = version.purchase_id.to_string();
        let json = serde_json::to_vec(version)?;
        let key = version_key(version.purchase_id, version.version_number);
        let start = version_key(version.purchase_id, 0);
        let end = version_key(version.purchase_id, u32::MAX);

        let write_txn = self.db.begin_write()?;
        {
            let purchases = write_txn.open_table(PURCHASES)?;
            if purchases.get(purchase_id.as_str())?.is_none() {
                return Err(LedgerError::NotFound(format!("purchase {purchase_id}")));
            }

            let mut versions = write_txn.open_table(VERSIONS)?;
            let current = match versions
                .range(start.as_slice()..=end.as_slice())?
                .next_back()
            {
                Some(entry) => {
                    let (k, _) = entry?;
                    version_number_from_key(k.value())?
                }
                None => 0,
            };

            if current.checked_add(1) != Some(version.version_number) {
                return Err(LedgerError::VersionConflict {
                    purchase_id: version.purchase_id,
                    version_number: version.version_number,
                });
            }

            versions.insert(key.as_slice(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn get_version(
        &self,
        purchase_id: Uuid,
        version_number: u32,
    ) -> LedgerResult<Option<VersionRecord>> {
        let key = version_key(purchase_id, version_number);
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(VERSIONS)?;
        match table.get(key.as_slice())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn latest_version(&self, purchase_id: Uuid) -> LedgerResult<Option<VersionRecord>> {
        let start = version_key(purchase_id, 0);
        let end = version_key(purchase_id, u32::MAX);
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(VERSIONS)?;
        let last = table.range(start.as_slice()..=end.as_slice())?.next_back();
        match last {
            Some(entry) => {
                let (_, value) = entry?;
                Ok(Some(serde_json::from_slice(value.value())?))
            }
            None => Ok(None),
        }
    }

    fn versions_for_purchase(&self, purchase_id: Uuid) -> LedgerResult<Vec<VersionRecord>> {
        let start = version_key(purchase_id, 0);
        let end = version_key(purchase_id, u32::MAX);
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(VERSIONS)?;

        let mut results = Vec::new();
        for entry in table.range(start.as_slice()..=end.as_slice())? {
            let (_, value) = entry?;
            results.push(serde_json::from_slice(value.value())?);
        }
        Ok(results)
    }

    fn referenced_paths(&self) -> LedgerResult<HashSet<String>> {
        let read_txn = self.db.begin_read()?;
        let mut paths = HashSet::new();

        let listing_paths = read_txn.open_table(LISTING_PATHS)?;
        for entry in listing_paths.iter()? {
            let (path, _) = entry?;
            paths.insert(path.value().to_string());
        }

        let versions = read_txn.open_table(VERSIONS)?;
        for entry in versions.iter()? {
            let (_, value) = entry?;
            let version: VersionRecord = serde_json::from_slice(value.value())?;
            paths.insert(version.storage_path);
        }

        Ok(paths)
    }

    fn health_check(&self) -> LedgerResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(LISTINGS)?;
        Ok(())
    }
}
