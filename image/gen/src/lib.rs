/*++

Licensed under the Apache-2.0 license.

File Name:

   lib.rs

Abstract:

    File contains data structures for the secure boot image generator.

--*/

mod crypto;
mod generator;

pub use crypto::EmuCrypto;
pub use generator::{GeneratedPartition, ImageGenerator};

use secboot_image_types::*;

pub const ECC384_SCALAR_BYTE_SIZE: usize = ECC_P384_SCALAR_BYTE_SIZE;

pub type ImageEccPrivKey = [u8; ECC384_SCALAR_BYTE_SIZE];
pub type ImageDigest = [u8; SHA3_384_DIGEST_BYTE_SIZE];

/// ECC-384 public key, big-endian coordinates
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ImageEccPubKey {
    pub x: [u8; ECC384_SCALAR_BYTE_SIZE],
    pub y: [u8; ECC384_SCALAR_BYTE_SIZE],
}

impl Default for ImageEccPubKey {
    fn default() -> Self {
        Self {
            x: [0u8; ECC384_SCALAR_BYTE_SIZE],
            y: [0u8; ECC384_SCALAR_BYTE_SIZE],
        }
    }
}

/// ECC-384 signature, big-endian scalars
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ImageEccSignature {
    pub r: [u8; ECC384_SCALAR_BYTE_SIZE],
    pub s: [u8; ECC384_SCALAR_BYTE_SIZE],
}

impl Default for ImageEccSignature {
    fn default() -> Self {
        Self {
            r: [0u8; ECC384_SCALAR_BYTE_SIZE],
            s: [0u8; ECC384_SCALAR_BYTE_SIZE],
        }
    }
}

/// Image Generator Crypto Trait
pub trait ImageGeneratorCrypto {
    /// Calculate SHA3-384 digest
    fn sha3_384_digest(&self, data: &[u8]) -> anyhow::Result<ImageDigest>;

    /// Derive the public key of `priv_key`
    fn ecdsa384_pub_key(&self, priv_key: &ImageEccPrivKey) -> anyhow::Result<ImageEccPubKey>;

    /// Calculate ECDSA Signature over a prehashed digest
    fn ecdsa384_sign(
        &self,
        digest: &ImageDigest,
        priv_key: &ImageEccPrivKey,
    ) -> anyhow::Result<ImageEccSignature>;

    /// Encrypt `plaintext`, returning the ciphertext and its tag
    fn aes256_gcm_encrypt(
        &self,
        key: &[u8; AES_KEY_BYTE_SIZE],
        iv: &AesIv,
        plaintext: &[u8],
    ) -> anyhow::Result<(Vec<u8>, AesGcmTag)>;

    /// Obfuscate a red key with the device KEK
    fn kek_wrap(
        &self,
        kek: &[u8; AES_KEY_BYTE_SIZE],
        iv: &AesIv,
        red_key: &[u8; AES_KEY_BYTE_SIZE],
    ) -> anyhow::Result<[u8; AES_KEY_BYTE_SIZE]>;
}

/// Key pair signing the certificate chain
#[derive(Clone)]
pub struct CertKeyConfig {
    /// Primary private key, its public half is anchored in eFuse
    pub ppk_priv: ImageEccPrivKey,

    /// Secondary private key, signs partitions
    pub spk_priv: ImageEccPrivKey,

    /// Revocation id bound into the SPK block
    pub spk_id: u32,

    pub user_data: Vec<u8>,

    /// Boot header bytes to sign into the boot header signature slot
    pub boot_header: Option<Vec<u8>>,
}

/// Partition encryption parameters
#[derive(Clone)]
pub struct EncryptionConfig {
    pub key_source: KeySource,

    /// Red key the first secure header is encrypted with
    pub key: [u8; AES_KEY_BYTE_SIZE],

    /// IV of the first secure header
    pub iv: AesIv,

    /// IV used to obfuscate a black key
    pub kek_iv: AesIv,

    pub enc_revoke_id: u32,

    /// Device KEK; when present the red key is also emitted in black form
    pub kek: Option<[u8; AES_KEY_BYTE_SIZE]>,
}

/// Image Generator Partition Configuration
#[derive(Clone, Default)]
pub struct PartitionConfig {
    /// Partition payload. It is not padded.
    pub content: Vec<u8>,

    /// Plaintext bytes per encrypted block
    pub block_size: usize,

    pub encryption: Option<EncryptionConfig>,

    pub cert: Option<CertKeyConfig>,

    /// PUF helper data is taken from the boot header
    pub puf_hd_in_boot_header: bool,
}
