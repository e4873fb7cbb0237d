/*++

Licensed under the Apache-2.0 license.

File Name:

    trim.rs

Abstract:

    File contains the syndrome data trim codec used for eFuse storage.

--*/

use secboot_image_types::PUF_TRIMMED_SYN_WORD_SIZE;
use zeroize::Zeroize;

use super::PUF_4K_SYN_WORD_SIZE;

/// Low bits dropped from every fourth syndrome word
pub const PUF_EFUSE_TRIM_MASK: u32 = 0xFFFF_F000;

/// Valid bits of the final trimmed word
pub const PUF_LAST_WORD_MASK: u32 = 0xFFFF_FFF0;

/// Bits kept from a trimmed word
const TRIMMED_WORD_BITS: u32 = 20;

/// Packed 4K syndrome data as stored in eFuse or the boot header
#[derive(Debug, Clone, PartialEq, Eq, Zeroize)]
pub struct TrimmedSynData(pub [u32; PUF_TRIMMED_SYN_WORD_SIZE]);

impl Default for TrimmedSynData {
    fn default() -> Self {
        Self([0; PUF_TRIMMED_SYN_WORD_SIZE])
    }
}

fn word_bits(index: usize) -> u32 {
    if index % 4 == 3 {
        TRIMMED_WORD_BITS
    } else {
        32
    }
}

fn low_mask(bits: u32) -> u64 {
    (1u64 << bits) - 1
}

/// Pack raw 4K syndrome data
///
/// Words are streamed MSB first. Every fourth word (index 3, 7, 11, ...)
/// contributes only its upper 20 bits, so 140 words pack into 4060 bits;
/// the last of the 127 output words keeps its upper 28 bits.
pub fn trim(syndrome: &[u32; PUF_4K_SYN_WORD_SIZE]) -> TrimmedSynData {
    let mut out = TrimmedSynData::default();
    let mut acc: u64 = 0;
    let mut acc_bits: u32 = 0;
    let mut dst = out.0.iter_mut();

    for (i, word) in syndrome.iter().enumerate() {
        let bits = word_bits(i);
        acc = (acc << bits) | u64::from(*word >> (32 - bits));
        acc_bits += bits;

        while acc_bits >= 32 {
            acc_bits -= 32;
            if let Some(d) = dst.next() {
                *d = (acc >> acc_bits) as u32;
            }
            acc &= low_mask(acc_bits);
        }
    }

    if acc_bits > 0 {
        if let Some(d) = dst.next() {
            *d = ((acc << (32 - acc_bits)) as u32) & PUF_LAST_WORD_MASK;
        }
    }
    acc.zeroize();

    out
}

/// Unpack trimmed syndrome data into the 140-word form fed to the PUF
///
/// The bits dropped by [`trim`] come back as zero and the masked tail of the
/// last word is ignored.
pub fn untrim(trimmed: &TrimmedSynData) -> [u32; PUF_4K_SYN_WORD_SIZE] {
    let mut out = [0u32; PUF_4K_SYN_WORD_SIZE];
    let mut acc: u64 = 0;
    let mut acc_bits: u32 = 0;
    let mut src = trimmed.0.iter();

    for (i, word) in out.iter_mut().enumerate() {
        let bits = word_bits(i);
        while acc_bits < bits {
            let next = src.next().copied().unwrap_or(0);
            acc = (acc << 32) | u64::from(next);
            acc_bits += 32;
        }
        acc_bits -= bits;
        let value = ((acc >> acc_bits) & low_mask(bits)) as u32;
        acc &= low_mask(acc_bits);
        *word = value << (32 - bits);
    }
    acc.zeroize();

    out
}
