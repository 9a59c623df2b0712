// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Content keys and their portable string form.
//!
//! The portable form is standard padded base64 of the raw 32 bytes. It is
//! what the ownership ledger stores and what the key release endpoint
//! returns to a verified purchaser.

use std::fmt;

use base64ct::{Base64, Encoding};
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::{CryptoError, CryptoResult};

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;

/// A 256-bit symmetric key sealing exactly one asset or version blob.
///
/// Key bytes are wiped on drop and never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ContentKey {
    bytes: [u8; KEY_LEN],
}

impl ContentKey {
    /// Generate a fresh key from the system CSPRNG.
    pub fn generate() -> CryptoResult<Self> {
        let rng = SystemRandom::new();
        let mut bytes = [0u8; KEY_LEN];
        rng.fill(&mut bytes)
            .map_err(|_| CryptoError::RandomnessFailure)?;
        Ok(Self { bytes })
    }

    /// Encode the key as its portable base64 string.
    pub fn export_portable(&self) -> String {
        Base64::encode_string(&self.bytes)
    }

    /// Decode a portable key string.
    ///
    /// Rejects anything that is not exactly 32 bytes after decoding, and the
    /// all-zero key.
    pub fn import_portable(encoded: &str) -> CryptoResult<Self> {
        let decoded = Zeroizing::new(
            Base64::decode_vec(encoded.trim())
                .map_err(|_| CryptoError::InvalidKeyEncoding("not valid base64".to_string()))?,
        );

        if decoded.len() != KEY_LEN {
            return Err(CryptoError::InvalidKeyEncoding(format!(
                "expected {KEY_LEN} bytes, got {}",
                decoded.len()
            )));
        }

        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(&decoded);
        let key = Self { bytes };

        if key.bytes.iter().all(|b| *b == 0) {
            return Err(CryptoError::InvalidKeyEncoding(
                "zero key is not a valid content key".to_string(),
            ));
        }

        Ok(key)
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ContentKey([REDACTED])")
    }
}
