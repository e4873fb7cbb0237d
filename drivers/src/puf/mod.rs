/*++

Licensed under the Apache-2.0 license.

File Name:

    mod.rs

Abstract:

    File contains API for the PUF registration and regeneration engine.

--*/

mod trim;

pub use trim::{trim, untrim, TrimmedSynData, PUF_EFUSE_TRIM_MASK, PUF_LAST_WORD_MASK};

use crate::wait::poll_until;
use crate::{cprintln, FuseBank};
use secboot_error::{SecureBootError, SecureBootResult};
use zeroize::Zeroize;

pub const PUF_ID_WORD_SIZE: usize = 8;
pub const PUF_4K_SYN_WORD_SIZE: usize = 140;
pub const PUF_12K_SYN_WORD_SIZE: usize = 350;
pub const PUF_MAX_SYN_WORD_SIZE: usize = PUF_12K_SYN_WORD_SIZE;

pub const PUF_REGEN_MAX_ATTEMPTS: u32 = 6;
pub const PUF_POLL_TIMEOUT: u32 = 1_000_000;
pub const PUF_SHUTTER_VALUE: u32 = 0x8100_0100;
pub const PUF_AUX_MASK: u32 = 0x0FFF_FFF0;
pub const PUF_AUX_SHIFT: u32 = 4;
pub const PUF_CFG1_INIT_4K: u32 = 0x0C23_0090;
pub const PUF_CFG1_INIT_12K: u32 = 0x0023_0150;
pub const PUF_CLEAR_ID: u32 = 1;
pub const PUF_RESET_ASSERT: u32 = 1;
pub const PUF_RESET_RELEASE: u32 = 0;

pub type PufId = [u32; PUF_ID_WORD_SIZE];

/// PUF register block
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PufReg {
    Cfg0,
    Cfg1,
    Shutter,
    Cmd,
    Status,
    Word,
    Chash,
    Aux,
    Id(usize),
    Capture,
    Clear,
    Reset,
}

/// Register access to the PUF block
///
/// Reads take `&mut self` because reading `Word` pops the syndrome FIFO.
pub trait PufRegs {
    fn read(&mut self, reg: PufReg) -> u32;

    fn write(&mut self, reg: PufReg, val: u32);
}

bitflags::bitflags! {
    pub struct PufStatus : u32 {
        const SYN_WORD_RDY = 1 << 0;
        const ID_ZERO = 1 << 1;
        const ID_RDY = 1 << 2;
        const KEY_RDY = 1 << 3;
        const SEGMENT_RDY = 1 << 4;
        const CONVERGED = 1 << 5;
        const OVERFLOW = 1 << 6;
    }
}

bitflags::bitflags! {
    pub struct PufCfg0 : u32 {
        const HASH_SEL = 1 << 0;
        const GLOBAL_FILTER = 1 << 1;
    }
}

bitflags::bitflags! {
    pub struct PufCapture : u32 {
        const KEY = 1 << 0;
        const ID = 1 << 1;
    }
}

#[repr(u32)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PufCmd {
    Registration = 1,
    Regeneration = 2,
    RegenIdOnly = 3,
}

/// Registration mode, fixes the syndrome length
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PufMode {
    Mode4K,
    Mode12K,
}

impl PufMode {
    pub fn syndrome_word_size(&self) -> usize {
        match self {
            PufMode::Mode4K => PUF_4K_SYN_WORD_SIZE,
            PufMode::Mode12K => PUF_12K_SYN_WORD_SIZE,
        }
    }

    fn cfg1(&self) -> u32 {
        match self {
            PufMode::Mode4K => PUF_CFG1_INIT_4K,
            PufMode::Mode12K => PUF_CFG1_INIT_12K,
        }
    }
}

/// Regeneration flavor
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RegenKind {
    /// Regenerate the key and the id
    OnDemand,

    /// Regenerate the id only
    IdOnly,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PufConfig {
    pub mode: PufMode,
    pub shutter: u32,
    pub global_variation_filter: bool,
    pub max_regen_attempts: u32,
    pub poll_timeout: u32,
}

impl Default for PufConfig {
    fn default() -> Self {
        Self {
            mode: PufMode::Mode4K,
            shutter: PUF_SHUTTER_VALUE,
            global_variation_filter: true,
            max_regen_attempts: PUF_REGEN_MAX_ATTEMPTS,
            poll_timeout: PUF_POLL_TIMEOUT,
        }
    }
}

impl PufConfig {
    /// The global variation filter option must agree with the shutter MSB
    pub fn validate(&self) -> SecureBootResult<()> {
        if ((self.shutter >> 31) != 0) != self.global_variation_filter {
            return Err(SecureBootError::DRIVER_PUF_SHUTTER_GVF_MISMATCH);
        }
        Ok(())
    }
}

/// Helper data produced at registration and consumed by every regeneration
#[derive(Clone, Zeroize)]
pub struct PufHelperData {
    pub chash: u32,
    pub aux: u32,
    pub id: PufId,
    syndrome: [u32; PUF_MAX_SYN_WORD_SIZE],
    syndrome_len: usize,
}

impl PufHelperData {
    /// Build helper data from raw syndrome words
    pub fn new(mode: PufMode, chash: u32, aux: u32, syndrome: &[u32]) -> SecureBootResult<Self> {
        if syndrome.len() != mode.syndrome_word_size() {
            return Err(SecureBootError::DRIVER_PUF_SYNDROME_LEN_MISMATCH);
        }
        let mut data = Self {
            chash,
            aux,
            id: [0; PUF_ID_WORD_SIZE],
            syndrome: [0; PUF_MAX_SYN_WORD_SIZE],
            syndrome_len: syndrome.len(),
        };
        data.syndrome[..syndrome.len()].copy_from_slice(syndrome);
        Ok(data)
    }

    /// Build 4K helper data from its trimmed storage form
    pub fn from_trimmed(chash: u32, aux: u32, trimmed: &TrimmedSynData) -> Self {
        let mut raw = untrim(trimmed);
        let mut data = Self {
            chash,
            aux,
            id: [0; PUF_ID_WORD_SIZE],
            syndrome: [0; PUF_MAX_SYN_WORD_SIZE],
            syndrome_len: PUF_4K_SYN_WORD_SIZE,
        };
        data.syndrome[..PUF_4K_SYN_WORD_SIZE].copy_from_slice(&raw);
        raw.zeroize();
        data
    }

    /// Trimmed storage form; only 4K syndrome data can be trimmed
    pub fn to_trimmed(&self) -> SecureBootResult<TrimmedSynData> {
        let raw: &[u32; PUF_4K_SYN_WORD_SIZE] = self
            .syndrome()
            .try_into()
            .map_err(|_| SecureBootError::DRIVER_PUF_INVALID_SYNDROME_MODE)?;
        Ok(trim(raw))
    }

    pub fn syndrome(&self) -> &[u32] {
        &self.syndrome[..self.syndrome_len]
    }

    fn validate(&self, mode: PufMode) -> SecureBootResult<()> {
        if self.chash == 0 || self.aux == 0 {
            return Err(SecureBootError::DRIVER_PUF_CHASH_NOT_PROGRAMMED);
        }
        if self.syndrome_len != mode.syndrome_word_size() {
            return Err(SecureBootError::DRIVER_PUF_SYNDROME_LEN_MISMATCH);
        }
        Ok(())
    }
}

/// Where regeneration helper data comes from
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum HelperDataSource {
    Efuse,
    BootHeader,
}

/// Check the eFuse access rules before touching the PUF
pub fn check_regeneration_allowed(
    fuses: &FuseBank,
    source: HelperDataSource,
) -> SecureBootResult<()> {
    if fuses.puf_disabled() {
        return Err(SecureBootError::DRIVER_PUF_DISABLED);
    }
    if fuses.puf_regen_disabled() {
        return Err(SecureBootError::DRIVER_PUF_REGENERATION_DISABLED);
    }
    if source == HelperDataSource::Efuse && fuses.puf_hd_invalid() {
        return Err(SecureBootError::DRIVER_PUF_HELPER_DATA_INVALIDATED);
    }
    Ok(())
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PufState {
    Idle,
    Configuring,
    Regenerating { attempt: u32 },
    Converged,
    Failed,
}

/// PUF engine
pub struct Puf<'a, R: PufRegs + ?Sized> {
    regs: &'a mut R,
    config: PufConfig,
    state: PufState,
}

impl<'a, R: PufRegs + ?Sized> Puf<'a, R> {
    pub fn new(regs: &'a mut R, config: PufConfig) -> Self {
        Self {
            regs,
            config,
            state: PufState::Idle,
        }
    }

    pub fn state(&self) -> PufState {
        self.state
    }

    fn status(&mut self) -> PufStatus {
        PufStatus::from_bits_truncate(self.regs.read(PufReg::Status))
    }

    fn wait_status(&mut self, bits: PufStatus, err: SecureBootError) -> SecureBootResult<()> {
        let timeout = self.config.poll_timeout;
        let regs = &mut *self.regs;
        poll_until(
            || PufStatus::from_bits_truncate(regs.read(PufReg::Status)).intersects(bits),
            timeout,
            err,
        )
    }

    /// Program options, then reset and release the PUF block
    fn configure(&mut self) -> SecureBootResult<()> {
        self.state = PufState::Configuring;
        self.config.validate()?;

        let mut cfg0 = PufCfg0::HASH_SEL;
        if self.config.global_variation_filter {
            cfg0 |= PufCfg0::GLOBAL_FILTER;
        }
        self.regs.write(PufReg::Cfg0, cfg0.bits());
        self.regs.write(PufReg::Cfg1, self.config.mode.cfg1());
        self.regs.write(PufReg::Shutter, self.config.shutter);
        self.regs.write(PufReg::Reset, PUF_RESET_ASSERT);
        self.regs.write(PufReg::Reset, PUF_RESET_RELEASE);
        Ok(())
    }

    fn read_id(&mut self) -> SecureBootResult<PufId> {
        if !self.status().contains(PufStatus::ID_RDY) {
            return Err(SecureBootError::DRIVER_PUF_ID_NOT_READY);
        }
        let mut id = [0u32; PUF_ID_WORD_SIZE];
        for (i, word) in id.iter_mut().enumerate() {
            *word = self.regs.read(PufReg::Id(i));
        }
        Ok(id)
    }

    /// Regenerate the PUF key and id from helper data
    ///
    /// Each call starts from a full reset. On success the key and id are
    /// latched by a single capture request and the id is returned.
    ///
    /// # Arguments
    ///
    /// * `helper` - Registration helper data
    /// * `kind` - Key and id, or id only
    ///
    /// # Returns
    ///
    /// * `PufId` - Regenerated device identifier
    pub fn regenerate(&mut self, helper: &PufHelperData, kind: RegenKind) -> SecureBootResult<PufId> {
        self.state = PufState::Idle;
        let result = self.regenerate_inner(helper, kind);
        self.state = match result {
            Ok(_) => PufState::Converged,
            Err(err) => {
                cprintln!("[puf] Regeneration failed 0x{:08X}", u32::from(err));
                PufState::Failed
            }
        };
        result
    }

    /// Regenerate the id only; no key is latched
    pub fn regenerate_id(&mut self, helper: &PufHelperData) -> SecureBootResult<PufId> {
        self.regenerate(helper, RegenKind::IdOnly)
    }

    fn regenerate_inner(&mut self, helper: &PufHelperData, kind: RegenKind) -> SecureBootResult<PufId> {
        helper.validate(self.config.mode)?;
        self.configure()?;

        let (cmd, capture) = match kind {
            RegenKind::OnDemand => (PufCmd::Regeneration, PufCapture::KEY | PufCapture::ID),
            RegenKind::IdOnly => (PufCmd::RegenIdOnly, PufCapture::ID),
        };

        for attempt in 1..=self.config.max_regen_attempts {
            self.state = PufState::Regenerating { attempt };

            self.regs.write(PufReg::Chash, helper.chash);
            self.regs.write(PufReg::Aux, helper.aux);
            self.regs.write(PufReg::Cmd, cmd as u32);

            for word in helper.syndrome() {
                self.wait_status(
                    PufStatus::SYN_WORD_RDY,
                    SecureBootError::DRIVER_PUF_SYNDROME_WORD_TIMEOUT,
                )?;
                self.regs.write(PufReg::Word, *word);

                // The diagnostic word must be drained or the block stalls.
                if self.status().contains(PufStatus::SEGMENT_RDY) {
                    let _ = self.regs.read(PufReg::Word);
                }
            }

            self.wait_status(
                PufStatus::KEY_RDY,
                SecureBootError::DRIVER_PUF_KEY_READY_TIMEOUT,
            )?;

            if self.status().contains(PufStatus::CONVERGED) {
                let id = self.read_id()?;
                self.regs.write(PufReg::Capture, capture.bits());
                cprintln!("[puf] Converged on attempt {}", attempt);
                return Ok(id);
            }
            cprintln!("[puf] Attempt {} did not converge", attempt);
        }

        Err(SecureBootError::DRIVER_PUF_NOT_CONVERGED)
    }

    /// Run registration and return fresh helper data
    pub fn register(&mut self) -> SecureBootResult<PufHelperData> {
        self.state = PufState::Idle;
        let result = self.register_inner();
        self.state = match result {
            Ok(_) => PufState::Converged,
            Err(_) => PufState::Failed,
        };
        result
    }

    fn register_inner(&mut self) -> SecureBootResult<PufHelperData> {
        self.configure()?;
        self.regs.write(PufReg::Cmd, PufCmd::Registration as u32);

        let len = self.config.mode.syndrome_word_size();
        let mut syndrome = [0u32; PUF_MAX_SYN_WORD_SIZE];
        let mut count = 0;

        loop {
            self.wait_status(
                PufStatus::SYN_WORD_RDY | PufStatus::KEY_RDY,
                SecureBootError::DRIVER_PUF_REGISTRATION_TIMEOUT,
            )?;
            let status = self.status();
            if status.contains(PufStatus::OVERFLOW) {
                syndrome.zeroize();
                return Err(SecureBootError::DRIVER_PUF_DATA_OVERFLOW);
            }
            if status.contains(PufStatus::SYN_WORD_RDY) {
                if count >= len {
                    syndrome.zeroize();
                    return Err(SecureBootError::DRIVER_PUF_DATA_OVERFLOW);
                }
                syndrome[count] = self.regs.read(PufReg::Word);
                count += 1;
            } else if status.contains(PufStatus::KEY_RDY) {
                break;
            }
        }

        if count != len {
            syndrome.zeroize();
            return Err(SecureBootError::DRIVER_PUF_DATA_UNDERFLOW);
        }

        let chash = self.regs.read(PufReg::Chash);
        let aux = (self.regs.read(PufReg::Aux) & PUF_AUX_MASK) >> PUF_AUX_SHIFT;
        let id = self.read_id()?;
        self.regs.write(PufReg::Capture, (PufCapture::KEY | PufCapture::ID).bits());

        let mut helper = PufHelperData::new(self.config.mode, chash, aux, &syndrome[..len])?;
        helper.id = id;
        syndrome.zeroize();
        cprintln!("[puf] Registered {} syndrome words", len);
        Ok(helper)
    }

    /// Scrub the PUF id from the block
    pub fn clear_id(&mut self) -> SecureBootResult<()> {
        self.regs.write(PufReg::Clear, PUF_CLEAR_ID);
        self.wait_status(PufStatus::ID_ZERO, SecureBootError::DRIVER_PUF_ID_CLEAR_TIMEOUT)
    }
}
