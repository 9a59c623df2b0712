// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Content Crypto
//!
//! Authenticated encryption for code assets at rest.
//!
//! ## Blob Format
//!
//! ```text
//! [12-byte IV][AES-256-GCM ciphertext][16-byte tag]
//! ```
//!
//! Every asset and every derived version is sealed under its own
//! [`ContentKey`]. A released key opens exactly one blob lineage node.
//!
//! ## Layers
//!
//! - [`codec`]: framing of IV + ciphertext into one opaque blob
//! - [`cipher`]: seal/open over `ring::aead`
//! - [`keys`]: key generation and the portable (base64) key string

pub mod cipher;
pub mod codec;
pub mod keys;

pub use cipher::{open, seal};
pub use codec::{combine, separate, IV_LEN};
pub use keys::{ContentKey, KEY_LEN};

/// Errors raised by the crypto layer.
///
/// All variants are fatal to the operation that produced them and are
/// never retried.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Blob shorter than the IV prefix.
    #[error("malformed blob: {len} bytes is shorter than the {IV_LEN}-byte IV")]
    MalformedBlob { len: usize },

    /// AEAD tag did not verify (tampering, wrong key or corrupted IV).
    #[error("authentication failed: ciphertext did not verify under the given key")]
    AuthenticationFailed,

    /// Portable key string did not decode to a usable 32-byte key.
    #[error("invalid key encoding: {0}")]
    InvalidKeyEncoding(String),

    /// The system random source failed.
    #[error("secure random source unavailable")]
    RandomnessFailure,

    /// The AEAD primitive rejected the seal request.
    #[error("encryption failed")]
    EncryptionFailure,
}

pub type CryptoResult<T> = Result<T, CryptoError>;
