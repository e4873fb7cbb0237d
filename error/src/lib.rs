/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains API and macros used by the secure boot crates for error handling

--*/
#![cfg_attr(not(feature = "std"), no_std)]
use core::convert::From;
use core::num::{NonZeroU32, TryFromIntError};

/// Secure Boot Error Type
/// Derives debug, copy, clone, eq, and partial eq
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SecureBootError(pub NonZeroU32);

/// Macro to define error constants ensuring uniqueness
///
/// This macro takes a list of (name, value, doc) tuples and generates
/// constant definitions for each error code.
#[macro_export]
macro_rules! define_error_constants {
    ($(($name:ident, $value:expr, $doc:expr)),* $(,)?) => {
        $(
            #[doc = $doc]
            pub const $name: SecureBootError = SecureBootError::new_const($value);
        )*

        #[cfg(test)]
        /// Returns a vector of all defined error constants for testing uniqueness
        pub fn all_constants() -> Vec<(& 'static str, u32)> {
            vec![
                $(
                    (stringify!($name), $value),
                )*
            ]
        }
    };
}

impl SecureBootError {
    /// Create a secure boot error; intended to only be used from const contexts, as we don't
    /// want runtime panics if val is zero. The preferred way to get a SecureBootError from a u32
    /// is to use `SecureBootError::try_from()` from the `TryFrom` trait impl.
    const fn new_const(val: u32) -> Self {
        match NonZeroU32::new(val) {
            Some(val) => Self(val),
            None => panic!("SecureBootError cannot be 0"),
        }
    }

    /// Component this error belongs to (upper 16 bits of the code)
    pub fn component(&self) -> u16 {
        (self.0.get() >> 16) as u16
    }

    define_error_constants![
        (SECBOOT_INTERNAL, 0x0001_0001, "Internal error"),
        (
            DRIVER_POLL_TIMEOUT,
            0x0001_0002,
            "Hardware status poll timed out"
        ),
        (
            DRIVER_SHA3_INVALID_STATE,
            0x0001_0003,
            "SHA3 engine used outside of an active digest operation"
        ),
        (
            DRIVER_AES_KEY_SLOT_EMPTY,
            0x0001_0004,
            "AES key slot does not hold a key"
        ),
        (
            DRIVER_AES_INVALID_LENGTH,
            0x0001_0005,
            "AES-GCM input and output lengths differ"
        ),
        (
            KEY_SOURCE_INVALID,
            0x0002_0001,
            "Key source tag is unknown or its red key was not derived"
        ),
        (
            KEY_SOURCE_GLITCH_DETECTED,
            0x0002_0002,
            "Resolved key slot does not match the requested key source"
        ),
        (
            KEY_SOURCE_KEK_DECRYPT_FAILED,
            0x0002_0003,
            "Black key could not be decrypted with the PUF KEK"
        ),
        (
            KEY_SOURCE_NOT_BLACK_KEY,
            0x0002_0004,
            "Key source has no black key to unwrap"
        ),
        (
            DRIVER_PUF_SYNDROME_WORD_TIMEOUT,
            0x0003_0001,
            "PUF syndrome word ready timeout"
        ),
        (
            DRIVER_PUF_KEY_READY_TIMEOUT,
            0x0003_0002,
            "PUF key ready timeout"
        ),
        (
            DRIVER_PUF_NOT_CONVERGED,
            0x0003_0003,
            "PUF regeneration did not converge"
        ),
        (
            DRIVER_PUF_ID_CLEAR_TIMEOUT,
            0x0003_0004,
            "PUF ID did not read back as zero after clear"
        ),
        (
            DRIVER_PUF_SHUTTER_GVF_MISMATCH,
            0x0003_0005,
            "Global variation filter option does not match the shutter value"
        ),
        (
            DRIVER_PUF_CHASH_NOT_PROGRAMMED,
            0x0003_0006,
            "PUF helper data Chash or Aux is zero"
        ),
        (
            DRIVER_PUF_INVALID_SYNDROME_MODE,
            0x0003_0007,
            "Syndrome data cannot be trimmed in this registration mode"
        ),
        (
            DRIVER_PUF_SYNDROME_LEN_MISMATCH,
            0x0003_0008,
            "Syndrome length does not match the registration mode"
        ),
        (
            DRIVER_PUF_DISABLED,
            0x0003_0009,
            "PUF is disabled in eFuse"
        ),
        (
            DRIVER_PUF_REGENERATION_DISABLED,
            0x0003_000A,
            "PUF regeneration is disabled in eFuse"
        ),
        (
            DRIVER_PUF_HELPER_DATA_INVALIDATED,
            0x0003_000B,
            "PUF helper data in eFuse is invalidated"
        ),
        (
            DRIVER_PUF_DATA_OVERFLOW,
            0x0003_000C,
            "PUF produced more syndrome words than the registration mode holds"
        ),
        (
            DRIVER_PUF_DATA_UNDERFLOW,
            0x0003_000D,
            "PUF produced fewer syndrome words than the registration mode holds"
        ),
        (
            DRIVER_PUF_REGISTRATION_TIMEOUT,
            0x0003_000E,
            "PUF registration did not complete"
        ),
        (
            DRIVER_PUF_ID_NOT_READY,
            0x0003_000F,
            "PUF did not report a valid ID after regeneration"
        ),
        (
            AUTH_CERT_TOO_SMALL,
            0x0004_0001,
            "Authentication certificate is smaller than its fixed layout"
        ),
        (
            IMAGE_VERIFIER_ERR_CERT_MARKER_MISMATCH,
            0x0004_0002,
            "Authentication certificate marker mismatch"
        ),
        (
            IMAGE_VERIFIER_ERR_CERT_SIZE_MISMATCH,
            0x0004_0003,
            "Authentication certificate size field mismatch"
        ),
        (
            IMAGE_VERIFIER_ERR_CERT_USER_DATA_LEN_INVALID,
            0x0004_0004,
            "Authentication certificate user data length out of bounds"
        ),
        (
            IMAGE_VERIFIER_ERR_CERT_HASH_ALGO_INVALID,
            0x0004_0005,
            "Authentication certificate hash algorithm not supported"
        ),
        (
            IMAGE_VERIFIER_ERR_CERT_PUB_STRENGTH_INVALID,
            0x0004_0006,
            "Authentication certificate public strength not supported"
        ),
        (
            IMAGE_VERIFIER_ERR_ALL_PPK_REVOKED,
            0x0004_0007,
            "Every PPK slot is invalidated in eFuse"
        ),
        (
            IMAGE_VERIFIER_ERR_PPK_HASH_FAIL,
            0x0004_0008,
            "PPK hash does not match any fused PPK hash"
        ),
        (
            IMAGE_VERIFIER_ERR_ALL_PPK_INVALID,
            0x0004_0009,
            "Every PPK slot is invalid or not programmed"
        ),
        (
            IMAGE_VERIFIER_ERR_SPK_HASH_FAIL,
            0x0004_000A,
            "SPK hash calculation failed"
        ),
        (
            IMAGE_VERIFIER_ERR_SPK_RSA_AUTH_FAIL,
            0x0004_000B,
            "SPK RSA signature verification failed"
        ),
        (
            IMAGE_VERIFIER_ERR_SPK_ECDSA_AUTH_FAIL,
            0x0004_000C,
            "SPK ECDSA signature verification failed"
        ),
        (
            IMAGE_VERIFIER_ERR_ID_REVOKED,
            0x0004_000D,
            "Revocation id is revoked"
        ),
        (
            IMAGE_VERIFIER_ERR_REVOCATION_ID_OUT_OF_RANGE,
            0x0004_000E,
            "Revocation id is out of range"
        ),
        (
            IMAGE_VERIFIER_ERR_ALL_IDS_REVOKED,
            0x0004_000F,
            "Every revocation id is revoked"
        ),
        (
            IMAGE_VERIFIER_ERR_PARTITION_RSA_AUTH_FAIL,
            0x0004_0010,
            "Partition RSA signature verification failed"
        ),
        (
            IMAGE_VERIFIER_ERR_PARTITION_ECDSA_AUTH_FAIL,
            0x0004_0011,
            "Partition ECDSA signature verification failed"
        ),
        (
            IMAGE_VERIFIER_ERR_HEADER_RSA_AUTH_FAIL,
            0x0004_0012,
            "Header RSA signature verification failed"
        ),
        (
            IMAGE_VERIFIER_ERR_HEADER_ECDSA_AUTH_FAIL,
            0x0004_0013,
            "Header ECDSA signature verification failed"
        ),
        (
            IMAGE_VERIFIER_ERR_PARTITION_HASH_FAIL,
            0x0004_0014,
            "Partition hash calculation failed"
        ),
        (
            IMAGE_VERIFIER_ERR_PPK_KEY_INVALID,
            0x0004_0015,
            "PPK block does not hold a valid public key"
        ),
        (
            IMAGE_VERIFIER_ERR_SPK_KEY_INVALID,
            0x0004_0016,
            "SPK block does not hold a valid public key"
        ),
        (
            LOADER_AEAD_TAG_MISMATCH,
            0x0005_0001,
            "AES-GCM tag mismatch"
        ),
        (
            LOADER_ENC_DATA_NOT_ALIGNED,
            0x0005_0002,
            "Encrypted data length is not a multiple of the AES block size"
        ),
        (
            LOADER_DECRYPT_REMAINDER_SIZE_MISMATCH,
            0x0005_0003,
            "Next block length exceeds the data remaining to decrypt"
        ),
        (
            LOADER_ENC_DATA_LEFT_FOR_DECRYPT,
            0x0005_0004,
            "Last block reached with encrypted data left over"
        ),
        (
            LOADER_PARTITION_HEADER_TOO_SMALL,
            0x0005_0005,
            "Partition header is smaller than its fixed layout"
        ),
        (
            LOADER_PARTITION_HEADER_CHECKSUM_MISMATCH,
            0x0005_0006,
            "Partition header checksum mismatch"
        ),
        (
            LOADER_PARTITION_OUT_OF_BOUNDS,
            0x0005_0007,
            "Partition data lies outside of the image"
        ),
        (
            LOADER_AUTH_CERT_OUT_OF_BOUNDS,
            0x0005_0008,
            "Authentication certificate lies outside of the image"
        ),
        (
            LOADER_DEST_BUFFER_TOO_SMALL,
            0x0005_0009,
            "Destination buffer cannot hold the partition"
        ),
        (
            LOADER_AUTH_COMPULSORY,
            0x0005_000A,
            "Authentication is compulsory when a PPK hash is programmed"
        ),
        (
            LOADER_ENC_COMPULSORY,
            0x0005_000B,
            "Encryption is compulsory in decrypt only mode"
        ),
        (
            LOADER_DEC_ONLY_KEY_SOURCE,
            0x0005_000C,
            "Decrypt only mode requires the eFuse black key"
        ),
        (
            LOADER_SEC_BUF_CLEAR_ERR,
            0x0005_000D,
            "Sensitive buffer did not read back as zero after clearing"
        ),
        (
            LOADER_INVALID_CHUNK_SIZE,
            0x0005_000E,
            "Chunk size must be a non-zero multiple of 16 that fits the chunk buffer"
        ),
        (
            LOADER_PLAIN_LEN_MISMATCH,
            0x0005_000F,
            "Processed length does not match the partition plaintext length"
        ),
        (
            LOADER_BOOT_HEADER_HELPER_DATA_MISSING,
            0x0005_0010,
            "Partition requests boot header PUF helper data but none was supplied"
        ),
        (
            LOADER_BOOT_HEADER_KEY_MISSING,
            0x0005_0011,
            "Boot header black key requested but no boot header was supplied"
        ),
        (
            LOADER_ENC_BLOCK_TOO_LARGE,
            0x0005_0012,
            "Encrypted block is larger than the configured chunk size"
        ),
        (
            CFI_PANIC_ASSERT_EQ_FAILURE,
            0x0006_0001,
            "CFI Panic: Assert Eq failure"
        ),
    ];
}

impl From<core::num::NonZeroU32> for crate::SecureBootError {
    fn from(val: core::num::NonZeroU32) -> Self {
        crate::SecureBootError(val)
    }
}

impl From<SecureBootError> for core::num::NonZeroU32 {
    fn from(val: SecureBootError) -> Self {
        val.0
    }
}

impl From<SecureBootError> for u32 {
    fn from(val: SecureBootError) -> Self {
        core::num::NonZeroU32::from(val).get()
    }
}

impl TryFrom<u32> for SecureBootError {
    type Error = TryFromIntError;
    fn try_from(val: u32) -> Result<Self, TryFromIntError> {
        match NonZeroU32::try_from(val) {
            Ok(val) => Ok(SecureBootError(val)),
            Err(err) => Err(err),
        }
    }
}

pub type SecureBootResult<T> = Result<T, SecureBootError>;
