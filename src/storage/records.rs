// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Rows stored in the ownership ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A seller's original uploaded asset.
///
/// `encryption_key` is the portable key sealing `storage_path`. It is only
/// ever handed out by the key release path; API responses use
/// [`crate::models::ListingResponse`] instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListingRecord {
    pub id: Uuid,
    pub seller_id: String,
    pub title: String,
    pub description: String,
    pub price_cents: u64,
    pub file_name: String,
    pub storage_path: String,
    #[serde(default)]
    pub encryption_key: Option<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// A buyer's license to one listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PurchaseRecord {
    pub id: Uuid,
    pub buyer_id: String,
    pub listing_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A re-sealed derivative produced by a modification request.
///
/// Version numbers start at 1; 0 names the listing's original blob and is
/// never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VersionRecord {
    pub id: Uuid,
    pub purchase_id: Uuid,
    pub version_number: u32,
    pub storage_path: String,
    #[serde(default)]
    pub encryption_key: Option<String>,
    pub modification_request: String,
    pub created_at: DateTime<Utc>,
}
