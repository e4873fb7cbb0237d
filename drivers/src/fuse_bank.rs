/*++

Licensed under the Apache-2.0 license.

File Name:

    fuse_bank.rs

Abstract:

    File contains API for the eFuse values read by the secure boot flow.

--*/

use crate::Array4x8;
use secboot_cfi_lib::cfi_launder;
use secboot_error::{SecureBootError, SecureBootResult};
use secboot_image_types::PUF_TRIMMED_SYN_WORD_SIZE;

pub const REVOCATION_ID_WORD_SIZE: usize = 8;
pub const REVOCATION_ID_MAX: u32 = (REVOCATION_ID_WORD_SIZE as u32 * 32) - 1;

bitflags::bitflags! {
    /// Miscellaneous control row. Every PPK invalid flag is burned as two
    /// redundant bits.
    pub struct MiscCtrl : u32 {
        const PPK0_INVLD_0 = 1 << 2;
        const PPK0_INVLD_1 = 1 << 3;
        const PPK1_INVLD_0 = 1 << 4;
        const PPK1_INVLD_1 = 1 << 5;
        const PPK2_INVLD_0 = 1 << 6;
        const PPK2_INVLD_1 = 1 << 7;
    }
}

bitflags::bitflags! {
    /// Security control row
    pub struct SecurityControl : u32 {
        const DEC_ONLY_0 = 1 << 0;
        const DEC_ONLY_1 = 1 << 1;
        const PUF_DIS = 1 << 18;
    }
}

bitflags::bitflags! {
    /// PUF ECC control row
    pub struct PufEccCtrl : u32 {
        const HD_INVLD = 1 << 30;
        const REGEN_DIS = 1 << 31;
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PpkSlot {
    Ppk0,
    Ppk1,
    Ppk2,
}

impl PpkSlot {
    /// Slots in the order they are searched
    pub const ALL: [PpkSlot; 3] = [PpkSlot::Ppk0, PpkSlot::Ppk1, PpkSlot::Ppk2];

    fn index(&self) -> usize {
        match self {
            PpkSlot::Ppk0 => 0,
            PpkSlot::Ppk1 => 1,
            PpkSlot::Ppk2 => 2,
        }
    }

    fn invalid_bits(&self) -> (MiscCtrl, MiscCtrl) {
        match self {
            PpkSlot::Ppk0 => (MiscCtrl::PPK0_INVLD_0, MiscCtrl::PPK0_INVLD_1),
            PpkSlot::Ppk1 => (MiscCtrl::PPK1_INVLD_0, MiscCtrl::PPK1_INVLD_1),
            PpkSlot::Ppk2 => (MiscCtrl::PPK2_INVLD_0, MiscCtrl::PPK2_INVLD_1),
        }
    }
}

/// Burned revocation ids
///
/// Bits are only ever set: there is no operation that un-burns an id.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RevocationState {
    words: [u32; REVOCATION_ID_WORD_SIZE],
}

impl RevocationState {
    pub fn new(words: [u32; REVOCATION_ID_WORD_SIZE]) -> Self {
        Self { words }
    }

    pub fn words(&self) -> &[u32; REVOCATION_ID_WORD_SIZE] {
        &self.words
    }

    fn locate(id: u32) -> SecureBootResult<(usize, u32)> {
        if id > REVOCATION_ID_MAX {
            return Err(SecureBootError::IMAGE_VERIFIER_ERR_REVOCATION_ID_OUT_OF_RANGE);
        }
        Ok(((id >> 5) as usize, 1 << (id & 0x1F)))
    }

    /// Burn `id`
    pub fn revoke(&mut self, id: u32) -> SecureBootResult<()> {
        let (word, mask) = Self::locate(id)?;
        self.words[word] |= mask;
        Ok(())
    }

    /// True once every id has been burned
    pub fn all_revoked(&self) -> bool {
        self.words.iter().all(|w| *w == u32::MAX)
    }

    /// Check that `id` may still be used
    ///
    /// # Arguments
    ///
    /// * `id` - Revocation id to check
    ///
    /// # Returns
    ///
    /// * `()` - If the id is in range and not burned
    pub fn check(&self, id: u32) -> SecureBootResult<()> {
        let (word, mask) = Self::locate(id)?;

        if self.all_revoked() {
            return Err(SecureBootError::IMAGE_VERIFIER_ERR_ALL_IDS_REVOKED);
        }

        // The bit is read twice; either read reporting it burned revokes the id.
        let first = self.words[word] & mask;
        let second = cfi_launder(self.words)[cfi_launder(word)] & mask;
        if first != 0 || second != 0 {
            return Err(SecureBootError::IMAGE_VERIFIER_ERR_ID_REVOKED);
        }

        Ok(())
    }
}

/// eFuse values consumed by the secure boot flow
#[derive(Debug, Clone)]
pub struct FuseBank {
    ppk_hash: [Array4x8; 3],
    misc_ctrl: MiscCtrl,
    sec_ctrl: SecurityControl,
    puf_ecc_ctrl: PufEccCtrl,
    puf_chash: u32,
    puf_aux: u32,
    puf_syndrome: [u32; PUF_TRIMMED_SYN_WORD_SIZE],
    revocation: RevocationState,
}

impl Default for FuseBank {
    fn default() -> Self {
        Self {
            ppk_hash: [Array4x8::default(); 3],
            misc_ctrl: MiscCtrl::empty(),
            sec_ctrl: SecurityControl::empty(),
            puf_ecc_ctrl: PufEccCtrl::empty(),
            puf_chash: 0,
            puf_aux: 0,
            puf_syndrome: [0; PUF_TRIMMED_SYN_WORD_SIZE],
            revocation: RevocationState::default(),
        }
    }
}

impl FuseBank {
    pub fn set_ppk_hash(&mut self, slot: PpkSlot, hash: Array4x8) {
        self.ppk_hash[slot.index()] = hash;
    }

    pub fn set_misc_ctrl(&mut self, val: MiscCtrl) {
        self.misc_ctrl = val;
    }

    pub fn set_sec_ctrl(&mut self, val: SecurityControl) {
        self.sec_ctrl = val;
    }

    pub fn set_puf_ecc_ctrl(&mut self, val: PufEccCtrl) {
        self.puf_ecc_ctrl = val;
    }

    pub fn set_puf_helper_data(
        &mut self,
        chash: u32,
        aux: u32,
        syndrome: &[u32; PUF_TRIMMED_SYN_WORD_SIZE],
    ) {
        self.puf_chash = chash;
        self.puf_aux = aux;
        self.puf_syndrome = *syndrome;
    }

    pub fn revocation_mut(&mut self) -> &mut RevocationState {
        &mut self.revocation
    }

    /// Get the fused PPK hash.
    ///
    /// # Arguments
    /// * `slot` - PPK slot
    ///
    /// # Returns
    ///     Upper 256 bits of the SHA3-384 digest of the PPK block
    ///
    pub fn ppk_hash(&self, slot: PpkSlot) -> Array4x8 {
        self.ppk_hash[slot.index()]
    }

    /// Get the PPK invalid flag.
    ///
    /// # Arguments
    /// * `slot` - PPK slot
    ///
    /// # Returns
    ///     True if either redundant invalid bit is burned
    ///
    pub fn ppk_invalid(&self, slot: PpkSlot) -> bool {
        let (bit0, bit1) = slot.invalid_bits();
        let misc = cfi_launder(self.misc_ctrl);
        misc.contains(bit0) || misc.contains(bit1)
    }

    /// True if every PPK slot is invalidated
    pub fn all_ppk_invalid(&self) -> bool {
        PpkSlot::ALL.iter().all(|slot| self.ppk_invalid(*slot))
    }

    /// True if any PPK hash is programmed
    pub fn any_ppk_programmed(&self) -> bool {
        self.ppk_hash.iter().any(|hash| !hash.is_zero())
    }

    /// Get the decrypt only flag.
    ///
    /// # Returns
    ///     True if either redundant decrypt only bit is burned
    ///
    pub fn dec_only(&self) -> bool {
        let ctrl = cfi_launder(self.sec_ctrl);
        ctrl.contains(SecurityControl::DEC_ONLY_0) || ctrl.contains(SecurityControl::DEC_ONLY_1)
    }

    pub fn puf_disabled(&self) -> bool {
        self.sec_ctrl.contains(SecurityControl::PUF_DIS)
    }

    pub fn puf_regen_disabled(&self) -> bool {
        self.puf_ecc_ctrl.contains(PufEccCtrl::REGEN_DIS)
    }

    pub fn puf_hd_invalid(&self) -> bool {
        self.puf_ecc_ctrl.contains(PufEccCtrl::HD_INVLD)
    }

    pub fn puf_chash(&self) -> u32 {
        self.puf_chash
    }

    pub fn puf_aux(&self) -> u32 {
        self.puf_aux
    }

    pub fn puf_syndrome(&self) -> &[u32; PUF_TRIMMED_SYN_WORD_SIZE] {
        &self.puf_syndrome
    }

    pub fn revocation(&self) -> &RevocationState {
        &self.revocation
    }
}
