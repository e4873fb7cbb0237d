/*++

Licensed under the Apache-2.0 license.

File Name:

    aes.rs

Abstract:

    File contains the AES-256-GCM engine and key slots of the emulated SoC.

--*/

use secboot_drivers::KeySlot;
use secboot_emu_crypto::Aes256Gcm;
use secboot_error::{SecureBootError, SecureBootResult};
use secboot_image_types::{AesGcmTag, AesIv, AES_KEY_BYTE_SIZE};
use zeroize::Zeroize;

type AesKeyBytes = [u8; AES_KEY_BYTE_SIZE];

/// AES engine with hardware key slots
#[derive(Default)]
pub struct EmuAes {
    slots: Vec<(KeySlot, AesKeyBytes)>,

    /// Successful and failed decrypt operations since power on
    decrypt_ops: usize,
}

impl EmuAes {
    /// Key held in `slot`
    pub fn slot(&self, slot: KeySlot) -> Option<&AesKeyBytes> {
        self.slots.iter().find(|(s, _)| *s == slot).map(|(_, k)| k)
    }

    pub fn load_key(&mut self, slot: KeySlot, key: &AesKeyBytes) {
        match self.slots.iter_mut().find(|(s, _)| *s == slot) {
            Some((_, k)) => *k = *key,
            None => self.slots.push((slot, *key)),
        }
    }

    pub fn decrypt_ops(&self) -> usize {
        self.decrypt_ops
    }

    /// Decrypt with an explicit key, `plaintext` must be as long as `ciphertext`
    pub fn decrypt(
        &mut self,
        key: &AesKeyBytes,
        iv: &AesIv,
        ciphertext: &[u8],
        tag: &AesGcmTag,
        plaintext: &mut [u8],
    ) -> SecureBootResult<()> {
        if plaintext.len() != ciphertext.len() {
            return Err(SecureBootError::DRIVER_AES_INVALID_LENGTH);
        }
        self.decrypt_ops += 1;
        plaintext.copy_from_slice(ciphertext);
        if !Aes256Gcm::decrypt_in_place(key, iv, &[], tag, plaintext) {
            return Err(SecureBootError::LOADER_AEAD_TAG_MISMATCH);
        }
        Ok(())
    }

    /// Unwrap the black key in `black` with `kek` into `red`
    pub fn kek_decrypt(
        &mut self,
        kek: &AesKeyBytes,
        black: KeySlot,
        red: KeySlot,
        iv: &AesIv,
    ) -> SecureBootResult<()> {
        let mut key = *self
            .slot(black)
            .ok_or(SecureBootError::KEY_SOURCE_KEK_DECRYPT_FAILED)?;
        if !Aes256Gcm::ctr_xor(kek, iv, &mut key) {
            key.zeroize();
            return Err(SecureBootError::KEY_SOURCE_KEK_DECRYPT_FAILED);
        }
        self.load_key(red, &key);
        key.zeroize();
        Ok(())
    }
}

impl Drop for EmuAes {
    fn drop(&mut self) {
        for (_, key) in self.slots.iter_mut() {
            key.zeroize();
        }
    }
}
