/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the secure boot emulator crypto library.

--*/

mod aes256gcm;
mod ecc384;
mod sha3;

pub const AES_256_KEY_SIZE: usize = 32;

pub use aes256gcm::{Aes256Gcm, AES_256_GCM_IV_SIZE, AES_256_GCM_TAG_SIZE};
pub use ecc384::{
    Ecc384, Ecc384PrivKey, Ecc384PubKey, Ecc384Scalar, Ecc384Signature, ECC_384_COORD_SIZE,
};
pub use sha3::{Sha3_384, SHA3_384_DIGEST_SIZE};
