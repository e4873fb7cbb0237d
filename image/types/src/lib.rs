/*++

Licensed under the Apache-2.0 license.

File Name:

   lib.rs

Abstract:

    File contains wire formats consumed by the secure boot pipeline.

--*/

#![cfg_attr(not(feature = "std"), no_std)]

mod auth_cert;
mod boot_header;
mod key_source;
mod partition;

pub use auth_cert::*;
pub use boot_header::*;
pub use key_source::KeySource;
pub use partition::*;

pub const SHA3_384_DIGEST_BYTE_SIZE: usize = 48;
pub const SHA3_384_DIGEST_WORD_SIZE: usize = 12;
pub const AES_KEY_BYTE_SIZE: usize = 32;
pub const AES_IV_BYTE_SIZE: usize = 12;
pub const AES_GCM_TAG_BYTE_SIZE: usize = 16;
pub const AES_BLOCK_BYTE_SIZE: usize = 16;

pub type AesIv = [u8; AES_IV_BYTE_SIZE];
pub type AesGcmTag = [u8; AES_GCM_TAG_BYTE_SIZE];

/// Bitwise NOT of the wrapping sum of `words`
pub fn ones_complement_checksum(words: impl IntoIterator<Item = u32>) -> u32 {
    !words.into_iter().fold(0u32, |acc, w| acc.wrapping_add(w))
}
