/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the secure boot emulator peripheral library.

--*/

mod aes;
mod hash_sha3;
mod puf;
mod soc;

pub use aes::EmuAes;
pub use hash_sha3::HashSha3;
pub use puf::{EmuPuf, EmuPufFaults};
pub use soc::EmuSoc;
