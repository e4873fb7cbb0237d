/*++

Licensed under the Apache-2.0 license.

File Name:

    puf.rs

Abstract:

    File contains the emulated PUF block.

--*/

use secboot_drivers::puf::{
    PufCapture, PufCmd, PufId, PUF_12K_SYN_WORD_SIZE, PUF_4K_SYN_WORD_SIZE, PUF_AUX_SHIFT,
    PUF_CFG1_INIT_12K, PUF_CLEAR_ID, PUF_EFUSE_TRIM_MASK, PUF_ID_WORD_SIZE, PUF_RESET_ASSERT,
};
use secboot_drivers::{PufReg, PufRegs, PufStatus};
use secboot_emu_crypto::Sha3_384;
use zeroize::Zeroize;

/// Syndrome words written between two diagnostic words
const SEGMENT_WORD_COUNT: usize = 35;

/// Bits of the raw Aux register outside the helper data value
const AUX_NOISE: u32 = 0xF000_000A;

/// Fault injection knobs
#[derive(Debug, Default, Copy, Clone)]
pub struct EmuPufFaults {
    /// `SYN_WORD_RDY` never asserts during regeneration
    pub stall_syndrome: bool,

    /// `KEY_RDY` never asserts
    pub never_key_ready: bool,

    /// The id registers ignore clear requests
    pub never_clear_id: bool,

    /// Registration reports a syndrome overflow
    pub overflow: bool,

    /// Registration produces this many words fewer than the mode requires
    pub short_registration: usize,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Op {
    Idle,
    Registration { emitted: usize },
    Regeneration { fed: usize, matched: bool },
}

/// Emulated PUF with a device secret derived from a seed
pub struct EmuPuf {
    key: [u8; 32],
    id: PufId,
    chash: u32,
    aux: u32,
    syndrome: Vec<u32>,

    faults: EmuPufFaults,

    cfg0: u32,
    cfg1: u32,
    shutter: u32,
    chash_reg: u32,
    aux_reg: u32,
    op: Op,
    pending_segment: bool,
    id_regs: PufId,
    id_rdy: bool,

    captured_key: Option<[u8; 32]>,
    captured_id: Option<PufId>,
    capture_writes: Vec<u32>,
    regen_commands: u32,
}

fn derive_words(seed: &[u8], label: &[u8], count: usize) -> Vec<u32> {
    let mut words = Vec::with_capacity(count);
    let mut counter = 0u32;
    while words.len() < count {
        let mut input = seed.to_vec();
        input.extend_from_slice(label);
        input.extend_from_slice(&counter.to_le_bytes());
        let digest = Sha3_384::hash(&input);
        for chunk in digest.chunks_exact(4) {
            if words.len() < count {
                words.push(u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
            }
        }
        counter += 1;
    }
    words
}

impl EmuPuf {
    /// Create a PUF whose device secret is a function of `seed`
    pub fn new(seed: &[u8]) -> Self {
        let mut key = [0u8; 32];
        key.copy_from_slice(&Sha3_384::hash(&[seed, &b"key"[..]].concat())[..32]);

        let mut id = [0u32; PUF_ID_WORD_SIZE];
        id.copy_from_slice(&derive_words(seed, b"id", PUF_ID_WORD_SIZE));

        let helper = derive_words(seed, b"helper", 2);

        Self {
            key,
            id,
            chash: helper[0] | 1,
            aux: (helper[1] & 0x00FF_FFFF) | 1,
            syndrome: derive_words(seed, b"syndrome", PUF_12K_SYN_WORD_SIZE),
            faults: EmuPufFaults::default(),
            cfg0: 0,
            cfg1: 0,
            shutter: 0,
            chash_reg: 0,
            aux_reg: 0,
            op: Op::Idle,
            pending_segment: false,
            id_regs: [0; PUF_ID_WORD_SIZE],
            id_rdy: false,
            captured_key: None,
            captured_id: None,
            capture_writes: Vec::new(),
            regen_commands: 0,
        }
    }

    pub fn set_faults(&mut self, faults: EmuPufFaults) {
        self.faults = faults;
    }

    /// Device key, as a manufacturing tool would see it when wrapping keys
    pub fn device_key(&self) -> [u8; 32] {
        self.key
    }

    pub fn device_id(&self) -> PufId {
        self.id
    }

    /// Key latched by the last capture request
    pub fn captured_key(&self) -> Option<&[u8; 32]> {
        self.captured_key.as_ref()
    }

    pub fn captured_id(&self) -> Option<&PufId> {
        self.captured_id.as_ref()
    }

    /// Every value written to the capture register
    pub fn capture_writes(&self) -> &[u32] {
        &self.capture_writes
    }

    pub fn regen_commands(&self) -> u32 {
        self.regen_commands
    }

    pub fn shutter(&self) -> u32 {
        self.shutter
    }

    pub fn cfg0(&self) -> u32 {
        self.cfg0
    }

    /// True while the id registers hold a non-zero value
    pub fn id_present(&self) -> bool {
        self.id_regs.iter().any(|w| *w != 0)
    }

    fn syndrome_len(&self) -> usize {
        if self.cfg1 == PUF_CFG1_INIT_12K {
            PUF_12K_SYN_WORD_SIZE
        } else {
            PUF_4K_SYN_WORD_SIZE
        }
    }

    /// Bits of syndrome word `index` the hardware actually consumes
    fn word_mask(index: usize) -> u32 {
        if index % 4 == 3 {
            PUF_EFUSE_TRIM_MASK
        } else {
            u32::MAX
        }
    }

    fn status(&self) -> PufStatus {
        let len = self.syndrome_len();
        let mut status = PufStatus::empty();

        match self.op {
            Op::Idle => {}
            Op::Registration { emitted } => {
                let len = len.saturating_sub(self.faults.short_registration);
                if self.faults.overflow {
                    status |= PufStatus::OVERFLOW | PufStatus::SYN_WORD_RDY;
                } else if emitted < len {
                    status |= PufStatus::SYN_WORD_RDY;
                } else if !self.faults.never_key_ready {
                    status |= PufStatus::KEY_RDY;
                }
            }
            Op::Regeneration { fed, matched } => {
                if self.pending_segment {
                    status |= PufStatus::SEGMENT_RDY;
                } else if fed < len && !self.faults.stall_syndrome {
                    status |= PufStatus::SYN_WORD_RDY;
                }
                if fed == len && !self.faults.never_key_ready {
                    status |= PufStatus::KEY_RDY;
                    if matched {
                        status |= PufStatus::CONVERGED;
                    }
                }
            }
        }

        if self.id_rdy {
            status |= PufStatus::ID_RDY;
        }
        if !self.id_present() {
            status |= PufStatus::ID_ZERO;
        }
        status
    }

    fn latch_id(&mut self) {
        self.id_regs = self.id;
        self.id_rdy = true;
    }

    fn read_word(&mut self) -> u32 {
        match self.op {
            Op::Registration { emitted } => {
                let len = self.syndrome_len();
                let word = self.syndrome.get(emitted).copied().unwrap_or(0);
                let emitted = emitted + 1;
                self.op = Op::Registration { emitted };
                if emitted == len.saturating_sub(self.faults.short_registration) {
                    self.latch_id();
                }
                word
            }
            Op::Regeneration { fed, .. } => {
                self.pending_segment = false;
                0xD1A6_0000 | fed as u32
            }
            Op::Idle => 0,
        }
    }

    fn write_word(&mut self, val: u32) {
        let Op::Regeneration { fed, matched } = self.op else {
            return;
        };
        let len = self.syndrome_len();
        if fed >= len || self.pending_segment {
            return;
        }

        let mask = Self::word_mask(fed);
        let matched = matched && (val & mask) == (self.syndrome[fed] & mask);
        let fed = fed + 1;
        self.op = Op::Regeneration { fed, matched };

        if fed % SEGMENT_WORD_COUNT == 0 {
            self.pending_segment = true;
        }
        if fed == len && matched {
            self.latch_id();
        }
    }

    fn command(&mut self, val: u32) {
        if val == PufCmd::Registration as u32 {
            self.op = Op::Registration { emitted: 0 };
        } else if val == PufCmd::Regeneration as u32 || val == PufCmd::RegenIdOnly as u32 {
            self.regen_commands += 1;
            let matched = self.chash_reg == self.chash && self.aux_reg == self.aux;
            self.op = Op::Regeneration { fed: 0, matched };
        }
        self.pending_segment = false;
        self.id_rdy = false;
    }

    fn capture(&mut self, val: u32) {
        self.capture_writes.push(val);
        let converged = self.status().contains(PufStatus::KEY_RDY | PufStatus::CONVERGED)
            || matches!(self.op, Op::Registration { .. } if self.id_rdy);
        if !converged {
            return;
        }
        let capture = PufCapture::from_bits_truncate(val);
        if capture.contains(PufCapture::KEY) {
            self.captured_key = Some(self.key);
        }
        if capture.contains(PufCapture::ID) {
            self.captured_id = Some(self.id);
        }
    }
}

impl Drop for EmuPuf {
    fn drop(&mut self) {
        self.key.zeroize();
        if let Some(key) = self.captured_key.as_mut() {
            key.zeroize();
        }
    }
}

impl PufRegs for EmuPuf {
    fn read(&mut self, reg: PufReg) -> u32 {
        match reg {
            PufReg::Cfg0 => self.cfg0,
            PufReg::Cfg1 => self.cfg1,
            PufReg::Shutter => self.shutter,
            PufReg::Status => self.status().bits(),
            PufReg::Word => self.read_word(),
            PufReg::Chash => match self.op {
                Op::Registration { .. } => self.chash,
                _ => self.chash_reg,
            },
            PufReg::Aux => match self.op {
                Op::Registration { .. } => (self.aux << PUF_AUX_SHIFT) | AUX_NOISE,
                _ => self.aux_reg,
            },
            PufReg::Id(i) if self.id_rdy => self.id_regs.get(i).copied().unwrap_or(0),
            _ => 0,
        }
    }

    fn write(&mut self, reg: PufReg, val: u32) {
        match reg {
            PufReg::Cfg0 => self.cfg0 = val,
            PufReg::Cfg1 => self.cfg1 = val,
            PufReg::Shutter => self.shutter = val,
            PufReg::Chash => self.chash_reg = val,
            PufReg::Aux => self.aux_reg = val,
            PufReg::Cmd => self.command(val),
            PufReg::Word => self.write_word(val),
            PufReg::Capture => self.capture(val),
            PufReg::Clear if val == PUF_CLEAR_ID => {
                if !self.faults.never_clear_id {
                    self.id_regs = [0; PUF_ID_WORD_SIZE];
                    self.id_rdy = false;
                }
            }
            PufReg::Reset if val == PUF_RESET_ASSERT => {
                self.op = Op::Idle;
                self.pending_segment = false;
            }
            _ => {}
        }
    }
}
