/*++

Licensed under the Apache-2.0 license.

File Name:

   crypto.rs

Abstract:

    File contains the software crypto backend of the image generator.

--*/

use anyhow::anyhow;
use secboot_emu_crypto::{Aes256Gcm, Ecc384, Sha3_384};
use secboot_image_types::*;

use crate::{
    ImageDigest, ImageEccPrivKey, ImageEccPubKey, ImageEccSignature, ImageGeneratorCrypto,
};

#[derive(Default)]
pub struct EmuCrypto {}

impl ImageGeneratorCrypto for EmuCrypto {
    fn sha3_384_digest(&self, data: &[u8]) -> anyhow::Result<ImageDigest> {
        Ok(Sha3_384::hash(data))
    }

    fn ecdsa384_pub_key(&self, priv_key: &ImageEccPrivKey) -> anyhow::Result<ImageEccPubKey> {
        let key = Ecc384::pub_key(priv_key).ok_or(anyhow!("Invalid ECC-384 private key"))?;
        Ok(ImageEccPubKey { x: key.x, y: key.y })
    }

    fn ecdsa384_sign(
        &self,
        digest: &ImageDigest,
        priv_key: &ImageEccPrivKey,
    ) -> anyhow::Result<ImageEccSignature> {
        let sig = Ecc384::sign(priv_key, digest).ok_or(anyhow!("ECDSA signing failed"))?;
        Ok(ImageEccSignature { r: sig.r, s: sig.s })
    }

    fn aes256_gcm_encrypt(
        &self,
        key: &[u8; AES_KEY_BYTE_SIZE],
        iv: &AesIv,
        plaintext: &[u8],
    ) -> anyhow::Result<(Vec<u8>, AesGcmTag)> {
        Aes256Gcm::encrypt(key, iv, &[], plaintext).ok_or(anyhow!("AES-GCM encryption failed"))
    }

    fn kek_wrap(
        &self,
        kek: &[u8; AES_KEY_BYTE_SIZE],
        iv: &AesIv,
        red_key: &[u8; AES_KEY_BYTE_SIZE],
    ) -> anyhow::Result<[u8; AES_KEY_BYTE_SIZE]> {
        let mut black = *red_key;
        if !Aes256Gcm::ctr_xor(kek, iv, &mut black) {
            return Err(anyhow!("Black key wrap failed"));
        }
        Ok(black)
    }
}
