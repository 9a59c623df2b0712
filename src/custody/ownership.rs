// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ownership enforcement for ledger rows.
//!
//! Every key or ciphertext the gateway hands out is reached through one of
//! these checks. A missing row and a row owned by someone else produce the
//! same [`CustodyError::AccessDenied`].

use crate::storage::{ListingRecord, PurchaseRecord};

use super::{CustodyError, CustodyResult};

/// Trait for rows that have an owner.
pub trait OwnedResource {
    /// Get the owner's user ID.
    fn owner_user_id(&self) -> &str;
}

impl OwnedResource for PurchaseRecord {
    fn owner_user_id(&self) -> &str {
        &self.buyer_id
    }
}

impl OwnedResource for ListingRecord {
    fn owner_user_id(&self) -> &str {
        &self.seller_id
    }
}

/// Verify ownership and return the resource if authorized.
pub trait OwnershipCheck<T> {
    fn verify_owner(self, user_id: &str) -> CustodyResult<T>;
}

impl<T: OwnedResource> OwnershipCheck<T> for Option<T> {
    fn verify_owner(self, user_id: &str) -> CustodyResult<T> {
        match self {
            Some(resource) if resource.owner_user_id() == user_id => Ok(resource),
            _ => Err(CustodyError::AccessDenied),
        }
    }
}
