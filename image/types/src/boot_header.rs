/*++

Licensed under the Apache-2.0 license.

File Name:

   boot_header.rs

Abstract:

    File contains the secure fields of the boot header.

--*/

use secboot_error::{SecureBootError, SecureBootResult};
use zerocopy::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};
use zeroize::Zeroize;

use crate::{AesIv, AES_IV_BYTE_SIZE, AES_KEY_BYTE_SIZE};

/// Word count of trimmed 4K syndrome data
pub const PUF_TRIMMED_SYN_WORD_SIZE: usize = 127;

pub const BOOT_HEADER_SECURE_SIZE: usize = core::mem::size_of::<BootHeaderSecureRaw>();

#[repr(C)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned, Debug, Clone, Copy)]
pub struct BootHeaderSecureRaw {
    pub black_key: [u8; AES_KEY_BYTE_SIZE],
    pub black_key_iv: [u8; AES_IV_BYTE_SIZE],
    pub puf_chash: U32,
    pub puf_aux: U32,
    pub puf_syndrome: [U32; PUF_TRIMMED_SYN_WORD_SIZE],
}

/// Boot header black key and PUF helper data
#[derive(Clone, Zeroize)]
pub struct BootHeaderSecureInfo {
    pub black_key: [u8; AES_KEY_BYTE_SIZE],
    pub black_key_iv: AesIv,
    pub puf_chash: u32,
    pub puf_aux: u32,
    pub puf_syndrome: [u32; PUF_TRIMMED_SYN_WORD_SIZE],
}

impl BootHeaderSecureInfo {
    pub fn decode(bytes: &[u8]) -> SecureBootResult<Self> {
        let (raw, _) = BootHeaderSecureRaw::ref_from_prefix(bytes)
            .map_err(|_| SecureBootError::LOADER_BOOT_HEADER_HELPER_DATA_MISSING)?;
        let mut puf_syndrome = [0u32; PUF_TRIMMED_SYN_WORD_SIZE];
        for (dst, src) in puf_syndrome.iter_mut().zip(raw.puf_syndrome.iter()) {
            *dst = src.get();
        }
        Ok(Self {
            black_key: raw.black_key,
            black_key_iv: raw.black_key_iv,
            puf_chash: raw.puf_chash.get(),
            puf_aux: raw.puf_aux.get(),
            puf_syndrome,
        })
    }

    pub fn encode(&self) -> [u8; BOOT_HEADER_SECURE_SIZE] {
        let mut out = [0u8; BOOT_HEADER_SECURE_SIZE];
        out[..32].copy_from_slice(&self.black_key);
        out[32..44].copy_from_slice(&self.black_key_iv);
        out[44..48].copy_from_slice(&self.puf_chash.to_le_bytes());
        out[48..52].copy_from_slice(&self.puf_aux.to_le_bytes());
        for (chunk, word) in out[52..].chunks_exact_mut(4).zip(self.puf_syndrome.iter()) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        assert_eq!(BOOT_HEADER_SECURE_SIZE, 32 + 12 + 4 + 4 + 127 * 4);
    }

    #[test]
    fn test_decode_literal() {
        let mut bytes = [0u8; BOOT_HEADER_SECURE_SIZE];
        bytes[0] = 0x5A;
        bytes[44..48].copy_from_slice(&[0x78, 0x56, 0x34, 0x12]);
        bytes[48..52].copy_from_slice(&[0x21, 0x43, 0x65, 0x00]);
        bytes[52..56].copy_from_slice(&[0xEF, 0xBE, 0xAD, 0xDE]);
        let info = BootHeaderSecureInfo::decode(&bytes).unwrap();
        assert_eq!(info.black_key[0], 0x5A);
        assert_eq!(info.puf_chash, 0x1234_5678);
        assert_eq!(info.puf_aux, 0x0065_4321);
        assert_eq!(info.puf_syndrome[0], 0xDEAD_BEEF);
        assert_eq!(info.encode(), bytes);
    }

    #[test]
    fn test_decode_short() {
        assert!(BootHeaderSecureInfo::decode(&[0u8; 40]).is_err());
    }
}
