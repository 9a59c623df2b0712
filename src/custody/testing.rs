// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Test doubles for the custody gateway.
//!
//! Real filesystem store and redb ledger under a temp dir, wrapped so tests
//! can inject failures and pause between "read latest" and "write".

use std::collections::HashSet;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tempfile::TempDir;
use uuid::Uuid;

use super::{CustodyGateway, UploadRequest, DEFAULT_ORPHAN_GRACE_SECS};
use crate::storage::{
    AssetStore, AuditRepository, FsAssetStore, LedgerError, LedgerResult, ListingRecord,
    OwnershipLedger, PurchaseRecord, RedbLedger, StorageError, StoragePaths, StorageResult,
    StoredBlob, VersionRecord,
};
use crate::transform::{CodeTransformer, TransformError};

pub(crate) fn upload_request(file_name: &str, code: &str) -> UploadRequest {
    UploadRequest {
        title: "Fixture".to_string(),
        description: "Fixture asset".to_string(),
        price_cents: 500,
        requirements: vec!["python3".to_string()],
        file_name: file_name.to_string(),
        plaintext: code.as_bytes().to_vec(),
    }
}

pub(crate) struct Harness {
    pub store: Arc<TestStore>,
    pub ledger: Arc<TestLedger>,
    pub transformer: Arc<ScriptedTransformer>,
    pub gateway: CustodyGateway,
    _temp: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_orphan_grace(Duration::seconds(DEFAULT_ORPHAN_GRACE_SECS))
    }

    pub fn with_orphan_grace(grace: Duration) -> Self {
        let temp = TempDir::new().unwrap();
        let paths = StoragePaths::new(temp.path());

        let store = Arc::new(TestStore {
            inner: FsAssetStore::open(paths.clone()).unwrap(),
            fail_puts: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
        });
        let ledger = Arc::new(TestLedger {
            inner: RedbLedger::open(&paths.ledger_db()).unwrap(),
            fail_inserts: AtomicBool::new(false),
            hide_latest: AtomicBool::new(false),
            latest_barrier: Mutex::new(None),
        });
        let transformer = Arc::new(ScriptedTransformer::default());
        let audit = Arc::new(AuditRepository::new(paths));

        let gateway = CustodyGateway::new(
            store.clone(),
            ledger.clone(),
            transformer.clone(),
            audit,
        )
        .with_orphan_grace(grace);

        Self {
            store,
            ledger,
            transformer,
            gateway,
            _temp: temp,
        }
    }

    /// A listing whose key column was never written.
    pub fn insert_keyless_listing(&self, seller_id: &str) -> ListingRecord {
        let listing = ListingRecord {
            id: Uuid::new_v4(),
            seller_id: seller_id.to_string(),
            title: "Keyless".to_string(),
            description: "Row without a key".to_string(),
            price_cents: 0,
            file_name: "keyless.py".to_string(),
            storage_path: format!("{seller_id}/0_keyless.py.enc"),
            encryption_key: None,
            requirements: Vec::new(),
            created_at: Utc::now(),
        };
        self.ledger.inner.insert_listing(&listing).unwrap();
        listing
    }
}

// =============================================================================
// Store
// =============================================================================

pub(crate) struct TestStore {
    inner: FsAssetStore,
    fail_puts: AtomicBool,
    fail_deletes: AtomicBool,
}

impl TestStore {
    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn get_blob(&self, path: &str) -> Vec<u8> {
        self.inner.get(path).unwrap()
    }

    pub fn exists(&self, path: &str) -> bool {
        match self.inner.get(path) {
            Ok(_) => true,
            Err(StorageError::NotFound(_)) => false,
            Err(e) => panic!("unexpected store error: {e}"),
        }
    }

    pub fn all_paths(&self) -> Vec<String> {
        self.inner.list().unwrap().into_iter().map(|b| b.path).collect()
    }

    /// Write bytes directly, bypassing the ledger.
    pub fn plant(&self, path: &str, bytes: &[u8]) {
        self.inner.put(path, bytes).unwrap();
    }

    pub fn remove_blob(&self, path: &str) {
        self.inner.delete(path).unwrap();
    }

    /// Flip one bit of a stored blob in place.
    pub fn flip_bit(&self, path: &str, byte: usize) {
        let mut blob = self.get_blob(path);
        blob[byte] ^= 0x01;
        self.inner.delete(path).unwrap();
        self.inner.put(path, &blob).unwrap();
    }
}

impl AssetStore for TestStore {
    fn put(&self, path: &str, bytes: &[u8]) -> StorageResult<()> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StorageError::Io(io::Error::other("injected put failure")));
        }
        self.inner.put(path, bytes)
    }

    fn get(&self, path: &str) -> StorageResult<Vec<u8>> {
        self.inner.get(path)
    }

    fn delete(&self, path: &str) -> StorageResult<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::Io(io::Error::other("injected delete failure")));
        }
        self.inner.delete(path)
    }

    fn modified_at(&self, path: &str) -> StorageResult<DateTime<Utc>> {
        self.inner.modified_at(path)
    }

    fn list(&self) -> StorageResult<Vec<StoredBlob>> {
        self.inner.list()
    }

    fn health_check(&self) -> StorageResult<()> {
        self.inner.health_check()
    }
}

// =============================================================================
// Ledger
// =============================================================================

pub(crate) struct TestLedger {
    inner: RedbLedger,
    fail_inserts: AtomicBool,
    hide_latest: AtomicBool,
    latest_barrier: Mutex<Option<Arc<Barrier>>>,
}

impl TestLedger {
    /// Fail listing and version inserts; purchases still succeed.
    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Report "no versions yet" from `latest_version`.
    pub fn hide_latest(&self, hide: bool) {
        self.hide_latest.store(hide, Ordering::SeqCst);
    }

    /// Make every `latest_version` caller wait on `barrier` after reading.
    pub fn set_latest_barrier(&self, barrier: Arc<Barrier>) {
        *self.latest_barrier.lock().unwrap() = Some(barrier);
    }

    pub fn get_listing_row(&self, listing_id: Uuid) -> ListingRecord {
        self.inner.get_listing(listing_id).unwrap().unwrap()
    }

    fn injected(&self) -> LedgerResult<()> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(LedgerError::RedbStorage(redb::StorageError::Io(
                io::Error::other("injected insert failure"),
            )));
        }
        Ok(())
    }
}

impl OwnershipLedger for TestLedger {
    fn insert_listing(&self, listing: &ListingRecord) -> LedgerResult<()> {
        self.injected()?;
        self.inner.insert_listing(listing)
    }

    fn get_listing(&self, listing_id: Uuid) -> LedgerResult<Option<ListingRecord>> {
        self.inner.get_listing(listing_id)
    }

    fn find_listing_by_path(&self, storage_path: &str) -> LedgerResult<Option<ListingRecord>> {
        self.inner.find_listing_by_path(storage_path)
    }

    fn insert_purchase(&self, purchase: &PurchaseRecord) -> LedgerResult<()> {
        self.inner.insert_purchase(purchase)
    }

    fn get_purchase(&self, purchase_id: Uuid) -> LedgerResult<Option<PurchaseRecord>> {
        self.inner.get_purchase(purchase_id)
    }

    fn find_purchase(
        &self,
        buyer_id: &str,
        listing_id: Uuid,
    ) -> LedgerResult<Option<PurchaseRecord>> {
        self.inner.find_purchase(buyer_id, listing_id)
    }

    fn purchases_by_buyer(&self, buyer_id: &str) -> LedgerResult<Vec<PurchaseRecord>> {
        self.inner.purchases_by_buyer(buyer_id)
    }

    fn insert_version(&self, version: &VersionRecord) -> LedgerResult<()> {
        self.injected()?;
        self.inner.insert_version(version)
    }

    fn get_version(
        &self,
        purchase_id: Uuid,
        version_number: u32,
    ) -> LedgerResult<Option<VersionRecord>> {
        self.inner.get_version(purchase_id, version_number)
    }

    fn latest_version(&self, purchase_id: Uuid) -> LedgerResult<Option<VersionRecord>> {
        let latest = if self.hide_latest.load(Ordering::SeqCst) {
            None
        } else {
            self.inner.latest_version(purchase_id)?
        };
        let barrier = self.latest_barrier.lock().unwrap().clone();
        if let Some(barrier) = barrier {
            barrier.wait();
        }
        Ok(latest)
    }

    fn versions_for_purchase(&self, purchase_id: Uuid) -> LedgerResult<Vec<VersionRecord>> {
        self.inner.versions_for_purchase(purchase_id)
    }

    fn referenced_paths(&self) -> LedgerResult<HashSet<String>> {
        self.inner.referenced_paths()
    }

    fn health_check(&self) -> LedgerResult<()> {
        self.inner.health_check()
    }
}

// =============================================================================
// Transformer
// =============================================================================

#[derive(Debug, Clone, Default)]
pub(crate) enum Script {
    /// Prepend `# {instruction}` to the source.
    #[default]
    Comment,
    Fixed(String),
    Fail,
}

#[derive(Default)]
pub(crate) struct ScriptedTransformer {
    script: Mutex<Script>,
    calls: AtomicUsize,
}

impl ScriptedTransformer {
    pub fn set(&self, script: Script) {
        *self.script.lock().unwrap() = script;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CodeTransformer for ScriptedTransformer {
    async fn transform(&self, source: &str, instruction: &str) -> Result<String, TransformError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let script = self.script.lock().unwrap().clone();
        match script {
            Script::Comment => Ok(format!("# {instruction}\n{source}")),
            Script::Fixed(text) => Ok(text),
            Script::Fail => Err(TransformError::Api {
                status: 500,
                body: "scripted failure".to_string(),
            }),
        }
    }
}
