// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::audit_log;
use crate::storage::{AuditEventType, ListingRecord, PurchaseRecord, VersionRecord};

use super::{CustodyError, CustodyGateway, CustodyResult, OwnedResource};

/// One row of a buyer's library.
#[derive(Debug, Clone)]
pub struct LibraryEntry {
    pub purchase: PurchaseRecord,
    pub listing: ListingRecord,
    /// Ascending by version number.
    pub versions: Vec<VersionRecord>,
}

impl CustodyGateway {
    /// Record a buyer's license to a listing. No crypto is involved.
    pub fn record_purchase(
        &self,
        buyer_id: &str,
        listing_id: Uuid,
    ) -> CustodyResult<PurchaseRecord> {
        let listing = self
            .ledger
            .get_listing(listing_id)?
            .ok_or_else(|| CustodyError::InvalidRequest("listing does not exist".to_string()))?;

        if listing.owner_user_id() == buyer_id {
            return Err(CustodyError::InvalidRequest(
                "sellers cannot purchase their own listing".to_string(),
            ));
        }

        let purchase = PurchaseRecord {
            id: Uuid::new_v4(),
            buyer_id: buyer_id.to_string(),
            listing_id,
            created_at: Utc::now(),
        };
        self.ledger.insert_purchase(&purchase)?;

        info!(
            buyer_id = %buyer_id,
            listing_id = %listing_id,
            purchase_id = %purchase.id,
            "Purchase recorded"
        );
        audit_log!(
            self.audit,
            AuditEventType::PurchaseRecorded,
            buyer_id,
            "purchase",
            purchase.id.to_string()
        );

        Ok(purchase)
    }

    /// Every purchase of the caller with its listing and versions, newest first.
    pub fn library(&self, buyer_id: &str) -> CustodyResult<Vec<LibraryEntry>> {
        let mut entries = Vec::new();
        for purchase in self.ledger.purchases_by_buyer(buyer_id)? {
            let Some(listing) = self.ledger.get_listing(purchase.listing_id)? else {
                warn!(
                    purchase_id = %purchase.id,
                    listing_id = %purchase.listing_id,
                    "Purchase references a missing listing"
                );
                continue;
            };
            let versions = self.ledger.versions_for_purchase(purchase.id)?;
            entries.push(LibraryEntry {
                purchase,
                listing,
                versions,
            });
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custody::testing::{upload_request, Harness};

    #[test]
    fn purchase_is_recorded_once() {
        let h = Harness::new();
        let listing = h.gateway.upload("seller", upload_request("a.py", "x")).unwrap();

        let purchase = h.gateway.record_purchase("buyer", listing.id).unwrap();
        assert_eq!(purchase.buyer_id, "buyer");
        assert_eq!(purchase.listing_id, listing.id);

        assert!(matches!(
            h.gateway.record_purchase("buyer", listing.id),
            Err(CustodyError::AlreadyPurchased)
        ));
    }

    #[test]
    fn self_purchase_is_rejected() {
        let h = Harness::new();
        let listing = h.gateway.upload("seller", upload_request("a.py", "x")).unwrap();
        assert!(matches!(
            h.gateway.record_purchase("seller", listing.id),
            Err(CustodyError::InvalidRequest(_))
        ));
    }

    #[test]
    fn unknown_listing_is_rejected() {
        let h = Harness::new();
        assert!(matches!(
            h.gateway.record_purchase("buyer", Uuid::new_v4()),
            Err(CustodyError::InvalidRequest(_))
        ));
    }

    #[test]
    fn library_lists_only_own_purchases() {
        let h = Harness::new();
        let a = h.gateway.upload("seller", upload_request("a.py", "a")).unwrap();
        let b = h.gateway.upload("seller", upload_request("b.py", "b")).unwrap();
        h.gateway.record_purchase("buyer", a.id).unwrap();
        h.gateway.record_purchase("buyer", b.id).unwrap();
        h.gateway.record_purchase("other", a.id).unwrap();

        let library = h.gateway.library("buyer").unwrap();
        assert_eq!(library.len(), 2);
        assert!(library.iter().all(|e| e.purchase.buyer_id == "buyer"));
        assert!(library.iter().all(|e| e.versions.is_empty()));

        assert!(h.gateway.library("nobody").unwrap().is_empty());
    }
}
