/*++

Licensed under the Apache-2.0 license.

File Name:

    soc.rs

Abstract:

    File contains the emulated SoC: the crypto engines and the PUF behind
    the driver traits used by the secure boot flow.

--*/

use secboot_drivers::{
    AesGcm, AesKey, Array4x12, KeySlot, PufReg, PufRegs, SecureBootError, SecureBootResult, Sha3,
};
use secboot_emu_crypto::{Ecc384, Ecc384PubKey, Ecc384Signature, ECC_384_COORD_SIZE};
use secboot_image_types::{
    AesGcmTag, AesIv, EccPubKey, EccSignature, RsaPubKey, AES_KEY_BYTE_SIZE, RSA4096_BYTE_SIZE,
};
use secboot_image_verify::{AuthCertVerificationEnv, EccCurve};

use crate::{EmuAes, EmuPuf, HashSha3};

/// Emulated SoC
pub struct EmuSoc {
    sha3: HashSha3,
    aes: EmuAes,
    puf: EmuPuf,
}

impl EmuSoc {
    /// Create a SoC whose PUF secret is derived from `puf_seed`
    pub fn new(puf_seed: &[u8]) -> Self {
        Self {
            sha3: HashSha3::default(),
            aes: EmuAes::default(),
            puf: EmuPuf::new(puf_seed),
        }
    }

    pub fn sha3(&self) -> &HashSha3 {
        &self.sha3
    }

    pub fn sha3_mut(&mut self) -> &mut HashSha3 {
        &mut self.sha3
    }

    pub fn aes(&self) -> &EmuAes {
        &self.aes
    }

    pub fn aes_mut(&mut self) -> &mut EmuAes {
        &mut self.aes
    }

    pub fn puf(&self) -> &EmuPuf {
        &self.puf
    }

    pub fn puf_mut(&mut self) -> &mut EmuPuf {
        &mut self.puf
    }
}

impl Sha3 for EmuSoc {
    fn sha3_384_init(&mut self) -> SecureBootResult<()> {
        self.sha3.sha3_384_init()
    }

    fn sha3_384_update(&mut self, data: &[u8]) -> SecureBootResult<()> {
        self.sha3.sha3_384_update(data)
    }

    fn sha3_384_finalize(&mut self) -> SecureBootResult<Array4x12> {
        self.sha3.sha3_384_finalize()
    }

    fn sha3_384_zeroize(&mut self) -> SecureBootResult<()> {
        self.sha3.sha3_384_zeroize()
    }
}

impl AesGcm for EmuSoc {
    fn aes256_gcm_decrypt(
        &mut self,
        key: AesKey,
        iv: &AesIv,
        ciphertext: &[u8],
        tag: &AesGcmTag,
        plaintext: &mut [u8],
    ) -> SecureBootResult<()> {
        let key = match key {
            AesKey::Handle(handle) => *self
                .aes
                .slot(handle.slot())
                .ok_or(SecureBootError::DRIVER_AES_KEY_SLOT_EMPTY)?,
            AesKey::Array(key) => *key,
        };
        self.aes.decrypt(&key, iv, ciphertext, tag, plaintext)
    }

    fn kek_decrypt(&mut self, black: KeySlot, red: KeySlot, iv: &AesIv) -> SecureBootResult<()> {
        let kek = *self
            .puf
            .captured_key()
            .ok_or(SecureBootError::KEY_SOURCE_KEK_DECRYPT_FAILED)?;
        self.aes.kek_decrypt(&kek, black, red, iv)
    }

    fn load_key(&mut self, slot: KeySlot, key: &[u8; AES_KEY_BYTE_SIZE]) -> SecureBootResult<()> {
        self.aes.load_key(slot, key);
        Ok(())
    }
}

impl PufRegs for EmuSoc {
    fn read(&mut self, reg: PufReg) -> u32 {
        self.puf.read(reg)
    }

    fn write(&mut self, reg: PufReg, val: u32) {
        self.puf.write(reg, val)
    }
}

impl AuthCertVerificationEnv for EmuSoc {
    /// RSA is not modelled by the emulator; every signature is rejected
    fn rsa4096_verify(
        &mut self,
        _digest: &Array4x12,
        _pub_key: &RsaPubKey,
        _sig: &[u8; RSA4096_BYTE_SIZE],
    ) -> SecureBootResult<bool> {
        Ok(false)
    }

    fn ecdsa_verify(
        &mut self,
        curve: EccCurve,
        digest: &Array4x12,
        pub_key: &EccPubKey,
        sig: &EccSignature,
    ) -> SecureBootResult<bool> {
        if curve != EccCurve::P384 {
            return Ok(false);
        }
        let (Ok(x), Ok(y), Ok(r), Ok(s)) = (
            <[u8; ECC_384_COORD_SIZE]>::try_from(pub_key.x),
            <[u8; ECC_384_COORD_SIZE]>::try_from(pub_key.y),
            <[u8; ECC_384_COORD_SIZE]>::try_from(sig.r),
            <[u8; ECC_384_COORD_SIZE]>::try_from(sig.s),
        ) else {
            return Ok(false);
        };
        let hash: [u8; ECC_384_COORD_SIZE] = (*digest).into();
        Ok(Ecc384::verify(
            &Ecc384PubKey { x, y },
            &hash,
            &Ecc384Signature { r, s },
        ))
    }
}
