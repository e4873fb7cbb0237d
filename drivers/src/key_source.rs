/*++

Licensed under the Apache-2.0 license.

File Name:

    key_source.rs

Abstract:

    File contains the AES key source resolver.

--*/

use secboot_cfi_lib::cfi_launder;
use secboot_error::{SecureBootError, SecureBootResult};
use secboot_image_types::KeySource;

/// Hardware AES key slot
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum KeySlot {
    EfuseKey,
    EfuseRedKey,
    BbramKey,
    BbramRedKey,
    BhKey,
    BhRedKey,
    EfuseUserKey0,
    EfuseUserRedKey0,
    EfuseUserKey1,
    EfuseUserRedKey1,
    UserKey0,
    UserKey1,
    UserKey2,
    UserKey3,
    UserKey4,
    UserKey5,
    UserKey6,
    UserKey7,
}

bitflags::bitflags! {
    /// Red keys derived during this boot
    pub struct DecKeyAvailability : u32 {
        const EFUSE_RED = 1 << 0;
        const BBRAM_RED = 1 << 1;
        const BH_RED = 1 << 2;
        const EFUSE_USR0_RED = 1 << 3;
        const EFUSE_USR1_RED = 1 << 4;
    }
}

/// Slots involved in unwrapping a black key
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BlackKeyInfo {
    /// Slot holding the obfuscated key
    pub black: KeySlot,

    /// Slot receiving the red key
    pub red: KeySlot,

    /// Availability flag set once the red key exists
    pub flag: DecKeyAvailability,
}

/// Opaque reference to a hardware key slot. Never carries key bytes.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct KeyHandle {
    slot: KeySlot,
}

impl KeyHandle {
    pub fn slot(&self) -> KeySlot {
        self.slot
    }
}

pub enum KeySourceResolver {}

impl KeySourceResolver {
    /// Black key unwrap parameters, `None` for red sources
    pub fn black_key_info(src: KeySource) -> Option<BlackKeyInfo> {
        let (black, red, flag) = match src {
            KeySource::EfuseBlkKey => (
                KeySlot::EfuseKey,
                KeySlot::EfuseRedKey,
                DecKeyAvailability::EFUSE_RED,
            ),
            KeySource::BbramBlkKey => (
                KeySlot::BbramKey,
                KeySlot::BbramRedKey,
                DecKeyAvailability::BBRAM_RED,
            ),
            KeySource::BhBlkKey => (KeySlot::BhKey, KeySlot::BhRedKey, DecKeyAvailability::BH_RED),
            KeySource::EfuseUsrBlkKey0 => (
                KeySlot::EfuseUserKey0,
                KeySlot::EfuseUserRedKey0,
                DecKeyAvailability::EFUSE_USR0_RED,
            ),
            KeySource::EfuseUsrBlkKey1 => (
                KeySlot::EfuseUserKey1,
                KeySlot::EfuseUserRedKey1,
                DecKeyAvailability::EFUSE_USR1_RED,
            ),
            _ => return None,
        };
        Some(BlackKeyInfo { black, red, flag })
    }

    fn slot_for(src: KeySource) -> KeySlot {
        match src {
            KeySource::EfuseKey => KeySlot::EfuseKey,
            KeySource::BbramKey => KeySlot::BbramKey,
            KeySource::EfuseUsrKey0 => KeySlot::EfuseUserKey0,
            KeySource::EfuseUsrKey1 => KeySlot::EfuseUserKey1,
            KeySource::UsrKey0 => KeySlot::UserKey0,
            KeySource::UsrKey1 => KeySlot::UserKey1,
            KeySource::UsrKey2 => KeySlot::UserKey2,
            KeySource::UsrKey3 => KeySlot::UserKey3,
            KeySource::UsrKey4 => KeySlot::UserKey4,
            KeySource::UsrKey5 => KeySlot::UserKey5,
            KeySource::UsrKey6 => KeySlot::UserKey6,
            KeySource::UsrKey7 => KeySlot::UserKey7,
            KeySource::EfuseBlkKey => KeySlot::EfuseRedKey,
            KeySource::BbramBlkKey => KeySlot::BbramRedKey,
            KeySource::BhBlkKey => KeySlot::BhRedKey,
            KeySource::EfuseUsrBlkKey0 => KeySlot::EfuseUserRedKey0,
            KeySource::EfuseUsrBlkKey1 => KeySlot::EfuseUserRedKey1,
        }
    }

    /// Resolve a key source to the slot the AES engine must use
    ///
    /// # Arguments
    ///
    /// * `src` - Requested key source
    /// * `availability` - Red keys derived during this boot
    ///
    /// # Returns
    ///
    /// * `KeyHandle` - Handle over the key slot
    pub fn resolve(
        src: KeySource,
        availability: DecKeyAvailability,
    ) -> SecureBootResult<KeyHandle> {
        if let Some(info) = Self::black_key_info(src) {
            if !availability.contains(info.flag) {
                return Err(SecureBootError::KEY_SOURCE_INVALID);
            }
        }

        let slot = Self::slot_for(src);

        // Second dispatch on the laundered tag to catch a glitched match.
        if cfi_launder(slot) != Self::slot_for(cfi_launder(src)) {
            return Err(SecureBootError::KEY_SOURCE_GLITCH_DETECTED);
        }

        Ok(KeyHandle { slot })
    }
}
