// Licensed under the Apache-2.0 license

#![allow(dead_code)]

use secboot_drivers::{Array4x8, FuseBank, PpkSlot, Puf, PufConfig, PufHelperData};
use secboot_emu_periph::EmuSoc;
use secboot_image_gen::{
    CertKeyConfig, EmuCrypto, EncryptionConfig, GeneratedPartition, ImageGenerator,
    PartitionConfig,
};
use secboot_image_types::{BootHeaderSecureInfo, KeySource};

pub const DEVICE_SEED: &[u8] = b"secboot-device-0";
pub const PPK_PRIV: [u8; 48] = [0x11; 48];
pub const SPK_PRIV: [u8; 48] = [0x22; 48];
pub const RED_KEY: [u8; 32] = [0x5A; 32];
pub const IV: [u8; 12] = [0xA5; 12];
pub const KEK_IV: [u8; 12] = [0x3C; 12];

/// Register the PUF of a device the way manufacturing does
pub fn provision_puf() -> (PufHelperData, [u8; 32]) {
    let mut soc = EmuSoc::new(DEVICE_SEED);
    let helper = Puf::new(&mut soc, PufConfig::default())
        .register()
        .unwrap();
    (helper, soc.puf().device_key())
}

/// Fuses of a provisioned device: PUF helper data in eFuse, no PPK yet
pub fn fuses(helper: &PufHelperData) -> FuseBank {
    let mut fuses = FuseBank::default();
    let trimmed = helper.to_trimmed().unwrap();
    fuses.set_puf_helper_data(helper.chash, helper.aux, &trimmed.0);
    fuses
}

pub fn boot_header(
    helper: &PufHelperData,
    black_key: [u8; 32],
    iv: [u8; 12],
) -> BootHeaderSecureInfo {
    BootHeaderSecureInfo {
        black_key,
        black_key_iv: iv,
        puf_chash: helper.chash,
        puf_aux: helper.aux,
        puf_syndrome: helper.to_trimmed().unwrap().0,
    }
}

/// A freshly powered-on device
pub fn soc() -> EmuSoc {
    EmuSoc::new(DEVICE_SEED)
}

pub fn cert_keys(spk_id: u32) -> CertKeyConfig {
    CertKeyConfig {
        ppk_priv: PPK_PRIV,
        spk_priv: SPK_PRIV,
        spk_id,
        user_data: vec![],
        boot_header: None,
    }
}

pub fn encryption(key_source: KeySource, kek: Option<[u8; 32]>) -> EncryptionConfig {
    EncryptionConfig {
        key_source,
        key: RED_KEY,
        iv: IV,
        kek_iv: KEK_IV,
        enc_revoke_id: 1,
        kek,
    }
}

pub fn content(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 + 3) as u8).collect()
}

pub fn generate(config: &PartitionConfig) -> GeneratedPartition {
    ImageGenerator::new(EmuCrypto::default())
        .generate(config)
        .unwrap()
}

pub fn program_ppk(fuses: &mut FuseBank, part: &GeneratedPartition) {
    fuses.set_ppk_hash(PpkSlot::Ppk0, Array4x8(part.ppk_hash.unwrap()));
}
