/*++

Licensed under the Apache-2.0 license.

File Name:

    aes.rs

Abstract:

    File contains the AES-256-GCM engine interface.

--*/

use crate::{KeyHandle, KeySlot};
use secboot_error::SecureBootResult;
use secboot_image_types::{AesGcmTag, AesIv, AES_KEY_BYTE_SIZE};

/// AES key selection
#[derive(Debug, Copy, Clone)]
pub enum AesKey<'a> {
    /// Key held in a hardware slot
    Handle(KeyHandle),

    /// Rolling key carried by a secure header
    Array(&'a [u8; AES_KEY_BYTE_SIZE]),
}

/// AES-256-GCM engine
pub trait AesGcm {
    /// Decrypt `ciphertext` into `plaintext` and check `tag`
    ///
    /// # Arguments
    ///
    /// * `key` - Key to decrypt with
    /// * `iv` - Initialization vector
    /// * `ciphertext` - Input
    /// * `tag` - Expected tag
    /// * `plaintext` - Output, same length as `ciphertext`
    ///
    /// # Returns
    ///
    /// * `()` - `LOADER_AEAD_TAG_MISMATCH` if the tag does not match. The
    ///   content of `plaintext` is unspecified on failure.
    fn aes256_gcm_decrypt(
        &mut self,
        key: AesKey,
        iv: &AesIv,
        ciphertext: &[u8],
        tag: &AesGcmTag,
        plaintext: &mut [u8],
    ) -> SecureBootResult<()>;

    /// Decrypt the black key in `black` with the PUF KEK into `red`
    fn kek_decrypt(&mut self, black: KeySlot, red: KeySlot, iv: &AesIv) -> SecureBootResult<()>;

    /// Load key material into a slot
    fn load_key(&mut self, slot: KeySlot, key: &[u8; AES_KEY_BYTE_SIZE]) -> SecureBootResult<()>;
}
