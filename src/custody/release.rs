// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use tracing::info;
use uuid::Uuid;

use crate::crypto::ContentKey;
use crate::storage::{AuditEvent, AuditEventType};

use super::{CustodyError, CustodyGateway, CustodyResult, LineageNode, OwnershipCheck};

/// A portable key released to the purchaser it belongs to.
#[derive(Clone)]
pub struct ReleasedKey {
    pub purchase_id: Uuid,
    pub version_number: u32,
    pub encryption_key: String,
}

impl std::fmt::Debug for ReleasedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleasedKey")
            .field("purchase_id", &self.purchase_id)
            .field("version_number", &self.version_number)
            .field("encryption_key", &"[REDACTED]")
            .finish()
    }
}

impl CustodyGateway {
    /// Release the key for version `version_number` (0 = original) of a
    /// purchase, only to that purchase's buyer.
    pub fn release_key(
        &self,
        caller: &str,
        purchase_id: Uuid,
        version_number: u32,
    ) -> CustodyResult<ReleasedKey> {
        let purchase = self
            .ledger
            .get_purchase(purchase_id)?
            .verify_owner(caller)
            .inspect_err(|_| {
                self.note_denial(caller, "purchase", &purchase_id.to_string(), "not the buyer")
            })?;

        let listing = self.ledger.get_listing(purchase.listing_id)?.ok_or_else(|| {
            CustodyError::CorruptRecord(format!(
                "purchase {purchase_id} references missing listing {}",
                purchase.listing_id
            ))
        })?;

        let version = if version_number == 0 {
            None
        } else {
            match self.ledger.get_version(purchase.id, version_number)? {
                Some(v) if v.purchase_id == purchase.id => Some(v),
                _ => {
                    self.note_denial(
                        caller,
                        "purchase",
                        &purchase_id.to_string(),
                        "no such version",
                    );
                    return Err(CustodyError::AccessDenied);
                }
            }
        };

        let node = LineageNode {
            listing,
            purchase,
            version,
        };
        let encryption_key = node.encryption_key()?.to_string();
        // Never hand out a key the cipher would refuse.
        ContentKey::import_portable(&encryption_key)?;

        info!(
            user_id = %caller,
            purchase_id = %purchase_id,
            version_number,
            "Key released"
        );
        self.audit.record(
            &AuditEvent::new(AuditEventType::KeyReleased)
                .with_user(caller)
                .with_resource("purchase", purchase_id.to_string())
                .with_details(serde_json::json!({ "version_number": version_number })),
        );

        Ok(ReleasedKey {
            purchase_id,
            version_number,
            encryption_key,
        })
    }
}
