// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! AES-256-GCM seal/open.
//!
//! A fresh random 96-bit IV is drawn for every seal. No associated data.

use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
use ring::rand::{SecureRandom, SystemRandom};

use super::codec::{combine, separate, IV_LEN};
use super::{ContentKey, CryptoError, CryptoResult};

fn aead_key(key: &ContentKey) -> CryptoResult<LessSafeKey> {
    let unbound = UnboundKey::new(&AES_256_GCM, key.as_bytes())
        .map_err(|_| CryptoError::InvalidKeyEncoding("key rejected by AEAD".to_string()))?;
    Ok(LessSafeKey::new(unbound))
}

/// Encrypt `plaintext` under `key` and frame it as `[IV][ciphertext+tag]`.
pub fn seal(plaintext: &[u8], key: &ContentKey) -> CryptoResult<Vec<u8>> {
    let aead = aead_key(key)?;

    let mut iv = [0u8; IV_LEN];
    SystemRandom::new()
        .fill(&mut iv)
        .map_err(|_| CryptoError::RandomnessFailure)?;

    let mut buffer = plaintext.to_vec();
    aead.seal_in_place_append_tag(Nonce::assume_unique_for_key(iv), Aad::empty(), &mut buffer)
        .map_err(|_| CryptoError::EncryptionFailure)?;

    Ok(combine(&iv, &buffer))
}

/// Decrypt a blob produced by [`seal`].
///
/// Any tag mismatch is [`CryptoError::AuthenticationFailed`]; no partial
/// plaintext is ever returned.
pub fn open(blob: &[u8], key: &ContentKey) -> CryptoResult<Vec<u8>> {
    let (iv, ciphertext) = separate(blob)?;
    let aead = aead_key(key)?;

    let mut buffer = ciphertext.to_vec();
    let plaintext = aead
        .open_in_place(Nonce::assume_unique_for_key(iv), Aad::empty(), &mut buffer)
        .map_err(|_| CryptoError::AuthenticationFailed)?;

    Ok(plaintext.to_vec())
}
