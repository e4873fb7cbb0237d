/*++

Licensed under the Apache-2.0 license.

File Name:

    context.rs

Abstract:

    File contains the per-partition secure processing context.

--*/

use secboot_drivers::KeyHandle;
use secboot_error::{SecureBootError, SecureBootResult};
use secboot_image_types::SECURE_HEADER_SIZE;
use zeroize::Zeroize;

use crate::LOADER_MAX_CHUNK_SIZE;

/// Staging buffer: one encrypted block plus the secure header decrypted with it
pub(crate) const CHUNK_BUF_SIZE: usize = LOADER_MAX_CHUNK_SIZE + SECURE_HEADER_SIZE;

/// Mutable state of one partition load
///
/// Created when the partition header has been decoded and cleared when the
/// partition finishes, successfully or not.
pub struct SecureProcessingContext {
    /// Offset of the next stored byte within the image
    pub src_offset: usize,

    /// Offset of the next plaintext byte within the destination
    pub dest_offset: usize,

    /// Plaintext bytes delivered so far
    pub processed_len: usize,

    /// Stored bytes not yet consumed
    pub remaining_len: usize,

    /// Plaintext bytes announced by the current secure header
    pub remaining_decrypt_len: usize,

    pub block_count: u32,

    /// Partition digest is being accumulated
    pub hash_active: bool,

    pub key_handle: Option<KeyHandle>,

    pub is_authenticated: bool,

    pub is_encrypted: bool,

    pub(crate) chunk: [u8; CHUNK_BUF_SIZE],
}

impl Default for SecureProcessingContext {
    fn default() -> Self {
        Self {
            src_offset: 0,
            dest_offset: 0,
            processed_len: 0,
            remaining_len: 0,
            remaining_decrypt_len: 0,
            block_count: 0,
            hash_active: false,
            key_handle: None,
            is_authenticated: false,
            is_encrypted: false,
            chunk: [0; CHUNK_BUF_SIZE],
        }
    }
}

impl Zeroize for SecureProcessingContext {
    fn zeroize(&mut self) {
        self.src_offset.zeroize();
        self.dest_offset.zeroize();
        self.processed_len.zeroize();
        self.remaining_len.zeroize();
        self.remaining_decrypt_len.zeroize();
        self.block_count.zeroize();
        self.hash_active = false;
        self.key_handle = None;
        self.is_authenticated = false;
        self.is_encrypted = false;
        self.chunk.zeroize();
    }
}

impl SecureProcessingContext {
    /// Account for one processed chunk or block
    pub(crate) fn advance(&mut self, stored_len: usize, plain_len: usize) {
        self.src_offset += stored_len;
        self.remaining_len -= stored_len;
        self.dest_offset += plain_len;
        self.processed_len += plain_len;
        self.block_count += 1;
    }

    /// Zero the context and check that no key material is left behind
    pub fn clear(&mut self) -> SecureBootResult<()> {
        self.zeroize();
        if self.key_handle.is_some() || !is_zeroed(&self.chunk) {
            return Err(SecureBootError::LOADER_SEC_BUF_CLEAR_ERR);
        }
        Ok(())
    }
}

/// Zero `buf` and read it back
pub(crate) fn clear_buffer(buf: &mut [u8]) -> SecureBootResult<()> {
    buf.zeroize();
    if !is_zeroed(buf) {
        return Err(SecureBootError::LOADER_SEC_BUF_CLEAR_ERR);
    }
    Ok(())
}

fn is_zeroed(buf: &[u8]) -> bool {
    buf.iter().fold(0u8, |acc, b| acc | core::hint::black_box(*b)) == 0
}
