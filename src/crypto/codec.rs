// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blob framing: `[IV][ciphertext+tag]`, no length prefix.

use super::{CryptoError, CryptoResult};

/// AES-GCM nonce length in bytes.
pub const IV_LEN: usize = 12;

/// Concatenate the IV and ciphertext into a single blob.
pub fn combine(iv: &[u8; IV_LEN], ciphertext: &[u8]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(IV_LEN + ciphertext.len());
    blob.extend_from_slice(iv);
    blob.extend_from_slice(ciphertext);
    blob
}

/// Split a blob back into its IV and ciphertext.
///
/// The ciphertext is everything after byte 12 and may be empty.
pub fn separate(blob: &[u8]) -> CryptoResult<([u8; IV_LEN], &[u8])> {
    if blob.len() < IV_LEN {
        return Err(CryptoError::MalformedBlob { len: blob.len() });
    }
    let (head, ciphertext) = blob.split_at(IV_LEN);
    let mut iv = [0u8; IV_LEN];
    iv.copy_from_slice(head);
    Ok((iv, ciphertext))
}
