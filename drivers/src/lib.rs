/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the secure boot driver library.

--*/

#![cfg_attr(not(feature = "std"), no_std)]

mod aes;
mod array;
mod fuse_bank;
mod key_source;
pub mod printer;
pub mod puf;
mod sha3;
pub mod wait;

pub use aes::{AesGcm, AesKey};
pub use array::{Array4x12, Array4x8};
pub use fuse_bank::{
    FuseBank, MiscCtrl, PpkSlot, PufEccCtrl, RevocationState, SecurityControl,
    REVOCATION_ID_MAX, REVOCATION_ID_WORD_SIZE,
};
pub use key_source::{BlackKeyInfo, DecKeyAvailability, KeyHandle, KeySlot, KeySourceResolver};
pub use puf::{
    check_regeneration_allowed, HelperDataSource, Puf, PufConfig, PufHelperData, PufId, PufMode,
    PufReg, PufRegs, PufState, PufStatus, RegenKind, TrimmedSynData,
};
pub use secboot_error::{SecureBootError, SecureBootResult};
pub use sha3::Sha3;
