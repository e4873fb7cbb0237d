/*++

Licensed under the Apache-2.0 license.

File Name:

   partition.rs

Abstract:

    File contains the partition header and secure header wire formats.

--*/

use bitfield::bitfield;
use secboot_error::{SecureBootError, SecureBootResult};
use zerocopy::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{
    ones_complement_checksum, AesIv, KeySource, AES_GCM_TAG_BYTE_SIZE, AES_IV_BYTE_SIZE,
    AES_KEY_BYTE_SIZE,
};

pub const PARTITION_HEADER_SIZE: usize = core::mem::size_of::<PartitionHeaderRaw>();
pub const SECURE_HEADER_SIZE: usize = 48;

/// Secure header followed by its AES-GCM tag
pub const SECURE_HEADER_UNIT_SIZE: usize = SECURE_HEADER_SIZE + AES_GCM_TAG_BYTE_SIZE;

/// Key source value of a partition that is not encrypted
pub const KEY_SOURCE_NONE: u32 = 0;

bitfield! {
    /// Partition attributes
    #[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
    pub struct PartitionAttributes(u32);

    /// PUF helper data is taken from the boot header instead of eFuse
    pub puf_hd_in_boot_header, set_puf_hd_in_boot_header: 0;
}

#[repr(C)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned, Debug, Clone, Copy)]
pub struct PartitionHeaderRaw {
    pub data_offset: U32,
    pub stored_len: U32,
    pub plain_len: U32,
    pub attributes: U32,
    pub key_source: U32,
    pub iv: [u8; AES_IV_BYTE_SIZE],
    pub kek_iv: [u8; AES_IV_BYTE_SIZE],
    pub enc_revoke_id: U32,
    pub auth_cert_offset: U32,
    pub reserved: [U32; 2],
    pub checksum: U32,
}

/// Decoded partition header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionHeader {
    /// Offset of the stored partition data within the image
    pub data_offset: u32,

    /// Stored length, secure headers and tags included
    pub stored_len: u32,

    /// Plaintext length delivered to the destination
    pub plain_len: u32,

    pub attributes: PartitionAttributes,

    /// Key source, `None` when the partition is not encrypted
    pub key_source: Option<KeySource>,

    /// IV of the first secure header
    pub iv: AesIv,

    /// IV used to unwrap a black key
    pub kek_iv: AesIv,

    /// Revocation id of the encryption key
    pub enc_revoke_id: u32,

    /// Offset of the authentication certificate, zero when not authenticated
    pub auth_cert_offset: u32,
}

fn le_words(bytes: &[u8]) -> impl Iterator<Item = u32> + '_ {
    bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
}

impl PartitionHeader {
    /// Decode a partition header, validating its checksum and key source tag
    pub fn decode(bytes: &[u8]) -> SecureBootResult<Self> {
        let (raw, _) = PartitionHeaderRaw::ref_from_prefix(bytes)
            .map_err(|_| SecureBootError::LOADER_PARTITION_HEADER_TOO_SMALL)?;

        let body = &raw.as_bytes()[..PARTITION_HEADER_SIZE - 4];
        if ones_complement_checksum(le_words(body)) != raw.checksum.get() {
            Err(SecureBootError::LOADER_PARTITION_HEADER_CHECKSUM_MISMATCH)?;
        }

        let key_source = match raw.key_source.get() {
            KEY_SOURCE_NONE => None,
            tag => Some(KeySource::try_from(tag)?),
        };

        Ok(Self {
            data_offset: raw.data_offset.get(),
            stored_len: raw.stored_len.get(),
            plain_len: raw.plain_len.get(),
            attributes: PartitionAttributes(raw.attributes.get()),
            key_source,
            iv: raw.iv,
            kek_iv: raw.kek_iv,
            enc_revoke_id: raw.enc_revoke_id.get(),
            auth_cert_offset: raw.auth_cert_offset.get(),
        })
    }

    /// Encode the header, computing its checksum
    pub fn encode(&self) -> [u8; PARTITION_HEADER_SIZE] {
        let mut raw = PartitionHeaderRaw {
            data_offset: U32::new(self.data_offset),
            stored_len: U32::new(self.stored_len),
            plain_len: U32::new(self.plain_len),
            attributes: U32::new(self.attributes.0),
            key_source: U32::new(self.key_source.map_or(KEY_SOURCE_NONE, u32::from)),
            iv: self.iv,
            kek_iv: self.kek_iv,
            enc_revoke_id: U32::new(self.enc_revoke_id),
            auth_cert_offset: U32::new(self.auth_cert_offset),
            reserved: [U32::ZERO; 2],
            checksum: U32::ZERO,
        };
        let checksum = ones_complement_checksum(le_words(
            &raw.as_bytes()[..PARTITION_HEADER_SIZE - 4],
        ));
        raw.checksum = U32::new(checksum);

        let mut out = [0u8; PARTITION_HEADER_SIZE];
        out.copy_from_slice(raw.as_bytes());
        out
    }

    pub fn is_encrypted(&self) -> bool {
        self.key_source.is_some()
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth_cert_offset != 0
    }
}

/// Decrypted secure header: key, IV and length of the next block
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecureHeader {
    pub next_key: [u8; AES_KEY_BYTE_SIZE],
    pub next_iv: AesIv,
    pub next_blk_len: u32,
}

impl SecureHeader {
    pub fn decode(bytes: &[u8; SECURE_HEADER_SIZE]) -> Self {
        let mut next_key = [0u8; AES_KEY_BYTE_SIZE];
        let mut next_iv = [0u8; AES_IV_BYTE_SIZE];
        next_key.copy_from_slice(&bytes[..32]);
        next_iv.copy_from_slice(&bytes[32..44]);
        Self {
            next_key,
            next_iv,
            next_blk_len: u32::from_le_bytes([bytes[44], bytes[45], bytes[46], bytes[47]]),
        }
    }

    pub fn encode(&self) -> [u8; SECURE_HEADER_SIZE] {
        let mut out = [0u8; SECURE_HEADER_SIZE];
        out[..32].copy_from_slice(&self.next_key);
        out[32..44].copy_from_slice(&self.next_iv);
        out[44..].copy_from_slice(&self.next_blk_len.to_le_bytes());
        out
    }

    /// A zero next block length closes the chain
    pub fn is_last(&self) -> bool {
        self.next_blk_len == 0
    }
}
