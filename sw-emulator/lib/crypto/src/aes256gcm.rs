/*++

Licensed under the Apache-2.0 license.

File Name:

    aes256gcm.rs

Abstract:

    File contains implementation of AES-256 GCM algorithm.

--*/

use crate::AES_256_KEY_SIZE;
use aes_gcm::{
    aead::{AeadInPlace, KeyInit},
    Key,
};

pub const AES_256_GCM_IV_SIZE: usize = 12;
pub const AES_256_GCM_TAG_SIZE: usize = 16;

pub enum Aes256Gcm {}

impl Aes256Gcm {
    /// One-shot AES-256-GCM decryption in place.
    ///
    /// Returns false and leaves `buffer` unspecified if the tag does not match.
    pub fn decrypt_in_place(
        key: &[u8; AES_256_KEY_SIZE],
        iv: &[u8; AES_256_GCM_IV_SIZE],
        aad: &[u8],
        tag: &[u8; AES_256_GCM_TAG_SIZE],
        buffer: &mut [u8],
    ) -> bool {
        let key: &Key<aes_gcm::Aes256Gcm> = key.into();
        let cipher = aes_gcm::Aes256Gcm::new(key);
        cipher
            .decrypt_in_place_detached(iv.into(), aad, buffer, tag.into())
            .is_ok()
    }

    /// One-shot AES-256-GCM decryption.
    pub fn decrypt(
        key: &[u8; AES_256_KEY_SIZE],
        iv: &[u8; AES_256_GCM_IV_SIZE],
        aad: &[u8],
        tag: &[u8; AES_256_GCM_TAG_SIZE],
        ciphertext: &[u8],
    ) -> Option<Vec<u8>> {
        let mut buffer = ciphertext.to_vec();
        if Self::decrypt_in_place(key, iv, aad, tag, &mut buffer) {
            Some(buffer)
        } else {
            None
        }
    }

    /// One-shot AES-256-GCM encryption.
    pub fn encrypt(
        key: &[u8; AES_256_KEY_SIZE],
        iv: &[u8; AES_256_GCM_IV_SIZE],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Option<(Vec<u8>, [u8; AES_256_GCM_TAG_SIZE])> {
        let key: &Key<aes_gcm::Aes256Gcm> = key.into();
        let cipher = aes_gcm::Aes256Gcm::new(key);
        let mut buffer = plaintext.to_vec();
        match cipher.encrypt_in_place_detached(iv.into(), aad, &mut buffer) {
            Ok(tag) => Some((buffer, tag.into())),
            Err(_) => None,
        }
    }

    /// XOR `data` with the GCM counter-mode keystream, without a tag.
    ///
    /// This is how a key encryption key wraps and unwraps a 256-bit key.
    pub fn ctr_xor(
        key: &[u8; AES_256_KEY_SIZE],
        iv: &[u8; AES_256_GCM_IV_SIZE],
        data: &mut [u8],
    ) -> bool {
        let Some((stream, _)) = Self::encrypt(key, iv, &[], &vec![0u8; data.len()]) else {
            return false;
        };
        data.iter_mut().zip(stream.iter()).for_each(|(d, k)| *d ^= k);
        true
    }
}
