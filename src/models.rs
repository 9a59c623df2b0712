// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies for the REST API. Requests are canonical
//! snake_case; the legacy camelCase names older clients send are accepted
//! as serde aliases and never reach the custody gateway.
//!
//! ## Model Categories
//!
//! - **Listings**: seller uploads (never expose the key)
//! - **Purchases**: licenses and the buyer library
//! - **Keys / Downloads / Modifications**: buyer custody operations
//! - **Admin**: audit log queries

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::custody::{LibraryEntry, ResolveRequest, ResolvedDownload, ReleasedKey, UploadRequest};
use crate::storage::{AuditEvent, ListingRecord, PurchaseRecord, VersionRecord};

// =============================================================================
// Flexible Version Number
// =============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum RawVersionNumber {
    Number(u64),
    Text(String),
}

/// Accept a version number sent as a number, a numeric string, or null.
fn flexible_version_number<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawVersionNumber>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawVersionNumber::Number(n)) => u32::try_from(n)
            .map(Some)
            .map_err(|_| de::Error::custom("version number out of range")),
        Some(RawVersionNumber::Text(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<u32>()
                .map(Some)
                .map_err(|_| de::Error::custom(format!("invalid version number: {s}")))
        }
    }
}

// =============================================================================
// Listing Models
// =============================================================================

/// Seller upload: plaintext code plus listing metadata.
#[derive(Clone, Deserialize, ToSchema)]
pub struct CreateListingRequest {
    pub title: String,
    pub description: String,
    #[serde(default, alias = "priceCents")]
    pub price_cents: u64,
    /// Original file name; only the final path segment is kept.
    #[serde(alias = "fileName")]
    pub file_name: String,
    /// Source code to seal (UTF-8 text).
    pub code: String,
    /// Runtime requirements (e.g. pip packages).
    #[serde(default, alias = "pyRequirements")]
    pub requirements: Vec<String>,
}

impl std::fmt::Debug for CreateListingRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateListingRequest")
            .field("title", &self.title)
            .field("file_name", &self.file_name)
            .field("code_len", &self.code.len())
            .finish_non_exhaustive()
    }
}

impl From<CreateListingRequest> for UploadRequest {
    fn from(req: CreateListingRequest) -> Self {
        UploadRequest {
            title: req.title,
            description: req.description,
            price_cents: req.price_cents,
            requirements: req.requirements,
            file_name: req.file_name,
            plaintext: req.code.into_bytes(),
        }
    }
}

/// Public view of a listing. The encryption key is never included.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct ListingResponse {
    pub listing_id: Uuid,
    pub seller_id: String,
    pub title: String,
    pub description: String,
    pub price_cents: u64,
    pub file_name: String,
    /// Path of the sealed original in the asset store.
    pub storage_path: String,
    pub requirements: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&ListingRecord> for ListingResponse {
    fn from(listing: &ListingRecord) -> Self {
        Self {
            listing_id: listing.id,
            seller_id: listing.seller_id.clone(),
            title: listing.title.clone(),
            description: listing.description.clone(),
            price_cents: listing.price_cents,
            file_name: listing.file_name.clone(),
            storage_path: listing.storage_path.clone(),
            requirements: listing.requirements.clone(),
            created_at: listing.created_at,
        }
    }
}

// =============================================================================
// Purchase Models
// =============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreatePurchaseRequest {
    #[serde(alias = "listingId")]
    pub listing_id: Uuid,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct PurchaseResponse {
    pub purchase_id: Uuid,
    pub listing_id: Uuid,
    pub buyer_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<&PurchaseRecord> for PurchaseResponse {
    fn from(purchase: &PurchaseRecord) -> Self {
        Self {
            purchase_id: purchase.id,
            listing_id: purchase.listing_id,
            buyer_id: purchase.buyer_id.clone(),
            created_at: purchase.created_at,
        }
    }
}

/// A version in a buyer's library (no key).
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct VersionSummary {
    pub version_number: u32,
    pub storage_path: String,
    pub modification_request: String,
    pub created_at: DateTime<Utc>,
}

impl From<&VersionRecord> for VersionSummary {
    fn from(version: &VersionRecord) -> Self {
        Self {
            version_number: version.version_number,
            storage_path: version.storage_path.clone(),
            modification_request: version.modification_request.clone(),
            created_at: version.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LibraryItem {
    pub purchase: PurchaseResponse,
    pub listing: ListingResponse,
    /// Ascending by version number.
    pub versions: Vec<VersionSummary>,
}

impl From<&LibraryEntry> for LibraryItem {
    fn from(entry: &LibraryEntry) -> Self {
        Self {
            purchase: PurchaseResponse::from(&entry.purchase),
            listing: ListingResponse::from(&entry.listing),
            versions: entry.versions.iter().map(VersionSummary::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LibraryResponse {
    /// Newest purchase first.
    pub purchases: Vec<LibraryItem>,
}

// =============================================================================
// Key Release Models
// =============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ReleaseKeyRequest {
    #[serde(alias = "purchaseId")]
    pub purchase_id: Uuid,
    /// 0 (or null/absent) names the original upload.
    #[serde(
        default,
        alias = "versionNumber",
        deserialize_with = "flexible_version_number"
    )]
    #[schema(value_type = Option<u32>)]
    pub version_number: Option<u32>,
}

#[derive(Clone, Serialize, ToSchema)]
pub struct ReleaseKeyResponse {
    pub purchase_id: Uuid,
    pub version_number: u32,
    /// Portable key string (base64 of the raw 256-bit key).
    pub encryption_key: String,
}

impl From<ReleasedKey> for ReleaseKeyResponse {
    fn from(released: ReleasedKey) -> Self {
        Self {
            purchase_id: released.purchase_id,
            version_number: released.version_number,
            encryption_key: released.encryption_key,
        }
    }
}

// =============================================================================
// Download Models
// =============================================================================

/// Resolve by listing (latest version unless pinned) or by exact path.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ResolveDownloadRequest {
    #[serde(default, alias = "listingId")]
    pub listing_id: Option<Uuid>,
    #[serde(default, alias = "specificStoragePath", alias = "storagePath")]
    pub storage_path: Option<String>,
    /// Absent resolves the latest version; 0 pins the original.
    #[serde(
        default,
        alias = "versionNumber",
        deserialize_with = "flexible_version_number"
    )]
    #[schema(value_type = Option<u32>)]
    pub version_number: Option<u32>,
}

impl From<ResolveDownloadRequest> for ResolveRequest {
    fn from(req: ResolveDownloadRequest) -> Self {
        ResolveRequest {
            listing_id: req.listing_id,
            storage_path: req.storage_path,
            version_number: req.version_number,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct ResolveDownloadResponse {
    pub encrypted_storage_path: String,
    pub purchase_id: Uuid,
    pub version_number: u32,
    pub file_name: String,
}

impl From<ResolvedDownload> for ResolveDownloadResponse {
    fn from(resolved: ResolvedDownload) -> Self {
        Self {
            encrypted_storage_path: resolved.storage_path,
            purchase_id: resolved.purchase_id,
            version_number: resolved.version_number,
            file_name: resolved.file_name,
        }
    }
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct BlobQuery {
    /// Storage path returned by the resolve endpoint.
    pub path: String,
}

// =============================================================================
// Modification Models
// =============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateModificationRequest {
    #[serde(alias = "listingId")]
    pub listing_id: Uuid,
    /// Path of the original or version to use as the base.
    #[serde(alias = "storagePath")]
    pub storage_path: String,
    /// Natural-language change request.
    #[serde(alias = "requestText")]
    pub request_text: String,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct NewVersion {
    pub version_number: u32,
    pub storage_path: String,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct ModificationResponse {
    pub message: String,
    pub new_version: NewVersion,
}

// =============================================================================
// Admin Models
// =============================================================================

#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct AuditQuery {
    /// Day to read, `YYYY-MM-DD`.
    pub date: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuditLogResponse {
    pub date: String,
    pub events: Vec<AuditEvent>,
    pub total: usize,
}
