/*++

Licensed under the Apache-2.0 license.

File Name:

   key_source.rs

Abstract:

    File contains the AES key source tag space.

--*/

use secboot_error::SecureBootError;

/// AES key source named by a partition header
///
/// Each variant is one storage location combined with one obfuscation
/// state. The discriminant is the sentinel value found on the wire.
#[repr(u32)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum KeySource {
    EfuseKey = 0xA5C3_C5A3,
    EfuseBlkKey = 0xA5C3_C5A5,
    BbramKey = 0x3A5C_3C5A,
    BbramBlkKey = 0x3A5C_3C59,
    BhBlkKey = 0xA35C_7C53,
    EfuseUsrKey0 = 0x5C3C_A5A3,
    EfuseUsrBlkKey0 = 0x5C3C_A5A5,
    EfuseUsrKey1 = 0xC3A5_C5A3,
    EfuseUsrBlkKey1 = 0xC3A5_C5A5,
    UsrKey0 = 0xC5C3_A5A3,
    UsrKey1 = 0xC3A5_C5B3,
    UsrKey2 = 0xC5C3_A5C3,
    UsrKey3 = 0xC3A5_C5D3,
    UsrKey4 = 0xC5C3_A5E3,
    UsrKey5 = 0xC3A5_C5F3,
    UsrKey6 = 0xC5C3_A563,
    UsrKey7 = 0xC3A5_C573,
}

impl KeySource {
    pub const ALL: [KeySource; 17] = [
        KeySource::EfuseKey,
        KeySource::EfuseBlkKey,
        KeySource::BbramKey,
        KeySource::BbramBlkKey,
        KeySource::BhBlkKey,
        KeySource::EfuseUsrKey0,
        KeySource::EfuseUsrBlkKey0,
        KeySource::EfuseUsrKey1,
        KeySource::EfuseUsrBlkKey1,
        KeySource::UsrKey0,
        KeySource::UsrKey1,
        KeySource::UsrKey2,
        KeySource::UsrKey3,
        KeySource::UsrKey4,
        KeySource::UsrKey5,
        KeySource::UsrKey6,
        KeySource::UsrKey7,
    ];

    /// True for obfuscated sources that need a red key derived first
    pub fn is_black(&self) -> bool {
        matches!(
            self,
            KeySource::EfuseBlkKey
                | KeySource::BbramBlkKey
                | KeySource::BhBlkKey
                | KeySource::EfuseUsrBlkKey0
                | KeySource::EfuseUsrBlkKey1
        )
    }
}

impl From<KeySource> for u32 {
    fn from(src: KeySource) -> Self {
        src as u32
    }
}

impl TryFrom<u32> for KeySource {
    type Error = SecureBootError;

    fn try_from(val: u32) -> Result<Self, Self::Error> {
        KeySource::ALL
            .iter()
            .copied()
            .find(|src| u32::from(*src) == val)
            .ok_or(SecureBootError::KEY_SOURCE_INVALID)
    }
}
