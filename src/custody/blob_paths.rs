// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blob path conventions.
//!
//! ```text
//! {seller_id}/{millis}_{file_name}.enc
//! versions/{buyer_id}/{listing_id}/v{n}.{ext}.enc
//! ```
//!
//! These shapes are shared with previously stored data and must not change.

use uuid::Uuid;

use super::{CustodyError, CustodyResult};

const ENC_SUFFIX: &str = ".enc";
const VERSIONS_ROOT: &str = "versions";
const DEFAULT_EXTENSION: &str = "txt";

/// Reject identifiers that cannot be a single path segment.
pub fn validate_segment(value: &str, what: &str) -> CustodyResult<()> {
    if value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\', '\0'])
    {
        return Err(CustodyError::InvalidRequest(format!(
            "{what} is not usable in a storage path"
        )));
    }
    Ok(())
}

/// Reduce an uploaded file name to its final path segment.
pub fn sanitize_file_name(file_name: &str) -> CustodyResult<String> {
    let name = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    validate_segment(name, "file name")?;
    Ok(name.to_string())
}

/// Path for a seller's original upload.
pub fn original_blob_path(
    seller_id: &str,
    token_millis: i64,
    file_name: &str,
) -> CustodyResult<String> {
    validate_segment(seller_id, "seller id")?;
    let name = sanitize_file_name(file_name)?;
    Ok(format!("{seller_id}/{token_millis}_{name}{ENC_SUFFIX}"))
}

/// Path for version `n` of a buyer's lineage.
pub fn version_blob_path(
    buyer_id: &str,
    listing_id: Uuid,
    version_number: u32,
    ext: &str,
) -> String {
    format!("{VERSIONS_ROOT}/{buyer_id}/{listing_id}/v{version_number}.{ext}{ENC_SUFFIX}")
}

/// Extension of the plaintext a blob path seals, `txt` when there is none.
pub fn plaintext_extension(storage_path: &str) -> String {
    let base = storage_path.strip_suffix(ENC_SUFFIX).unwrap_or(storage_path);
    let last_segment = base.rsplit('/').next().unwrap_or(base);
    match last_segment.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext.to_string(),
        _ => DEFAULT_EXTENSION.to_string(),
    }
}

/// Final path segment, used as the download file name.
pub fn file_name_of(storage_path: &str) -> String {
    storage_path
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("unknownfile")
        .to_string()
}

/// A parsed `versions/{buyer}/{listing}/v{n}.{ext}.enc` path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionPath {
    pub buyer_id: String,
    pub listing_id: String,
    pub version_number: u32,
    pub ext: String,
}

impl VersionPath {
    /// Parse a version path. Anything not in the exact shape, or with
    /// `n < 1`, is `None`.
    pub fn parse(path: &str) -> Option<Self> {
        let mut parts = path.split('/');
        let (root, buyer, listing, file) =
            (parts.next()?, parts.next()?, parts.next()?, parts.next()?);
        if parts.next().is_some() || root != VERSIONS_ROOT {
            return None;
        }
        if buyer.is_empty() || listing.is_empty() {
            return None;
        }

        let inner = file.strip_prefix('v')?.strip_suffix(ENC_SUFFIX)?;
        let (digits, ext) = inner.split_once('.')?;
        if ext.is_empty() || ext.contains('.') {
            return None;
        }
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let version_number: u32 = digits.parse().ok()?;
        // Canonical form only: no leading zeros.
        if version_number == 0 || version_number.to_string() != digits {
            return None;
        }

        Some(Self {
            buyer_id: buyer.to_string(),
            listing_id: listing.to_string(),
            version_number,
            ext: ext.to_string(),
        })
    }
}
