/*++

Licensed under the Apache-2.0 license.

File Name:

    config.rs

Abstract:

    File contains the run-time configuration of the partition loader.

--*/

use secboot_drivers::PufConfig;
use secboot_error::{SecureBootError, SecureBootResult};
use secboot_image_types::AES_BLOCK_BYTE_SIZE;

/// Default plaintext bytes processed per chunk
pub const LOADER_CHUNK_SIZE: usize = 32 * 1024;

/// Largest chunk the processing context can stage
pub const LOADER_MAX_CHUNK_SIZE: usize = LOADER_CHUNK_SIZE;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct LoaderConfig {
    /// Plaintext bytes copied per step, and the largest encrypted block accepted
    pub chunk_size: usize,

    /// PUF options used to regenerate the KEK
    pub puf: PufConfig,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            chunk_size: LOADER_CHUNK_SIZE,
            puf: PufConfig::default(),
        }
    }
}

impl LoaderConfig {
    pub fn validate(&self) -> SecureBootResult<()> {
        if self.chunk_size == 0
            || self.chunk_size % AES_BLOCK_BYTE_SIZE != 0
            || self.chunk_size > LOADER_MAX_CHUNK_SIZE
        {
            return Err(SecureBootError::LOADER_INVALID_CHUNK_SIZE);
        }
        self.puf.validate()
    }
}
