/*++

Licensed under the Apache-2.0 license.

File Name:

   generator.rs

Abstract:

    Secure boot partition image generator

--*/
use anyhow::bail;
use secboot_image_types::*;
use zerocopy::little_endian::U32;
use zerocopy::{FromZeros, IntoBytes};

use crate::*;

/// Generated partition image
pub struct GeneratedPartition {
    /// Partition header, certificate and stored data, in that order
    pub image: Vec<u8>,

    pub header: PartitionHeader,

    /// Red key obfuscated with the configured KEK
    pub black_key: Option<[u8; AES_KEY_BYTE_SIZE]>,

    /// PPK reference hash to program in eFuse, big-endian words
    pub ppk_hash: Option<[u32; 8]>,

    /// Digest covered by the partition signature
    pub digest: Option<ImageDigest>,
}

/// Image generator
pub struct ImageGenerator<Crypto: ImageGeneratorCrypto> {
    crypto: Crypto,
}

impl<Crypto: ImageGeneratorCrypto> ImageGenerator<Crypto> {
    /// Create an instance `ImageGenerator`
    pub fn new(crypto: Crypto) -> Self {
        Self { crypto }
    }

    /// Generate a partition image
    ///
    /// # Arguments
    ///
    /// * `config` - Partition configuration
    ///
    /// # Returns
    ///
    /// * `GeneratedPartition` - Image and the values to provision alongside it
    pub fn generate(&self, config: &PartitionConfig) -> anyhow::Result<GeneratedPartition> {
        let content_len = u32::try_from(config.content.len())?;

        let (stored, black_key) = match &config.encryption {
            Some(enc) => {
                let stored = self.encrypt(&config.content, config.block_size, enc)?;
                let black_key = match &enc.kek {
                    Some(kek) => Some(self.crypto.kek_wrap(kek, &enc.kek_iv, &enc.key)?),
                    None => None,
                };
                (stored, black_key)
            }
            None => (config.content.clone(), None),
        };

        let cert_len = if config.cert.is_some() {
            AUTH_CERT_SIZE
        } else {
            0
        };

        let mut attributes = PartitionAttributes::default();
        attributes.set_puf_hd_in_boot_header(config.puf_hd_in_boot_header);

        let header = PartitionHeader {
            data_offset: u32::try_from(PARTITION_HEADER_SIZE + cert_len)?,
            stored_len: u32::try_from(stored.len())?,
            plain_len: content_len,
            attributes,
            key_source: config.encryption.as_ref().map(|e| e.key_source),
            iv: config.encryption.as_ref().map_or([0; AES_IV_BYTE_SIZE], |e| e.iv),
            kek_iv: config
                .encryption
                .as_ref()
                .map_or([0; AES_IV_BYTE_SIZE], |e| e.kek_iv),
            enc_revoke_id: config.encryption.as_ref().map_or(0, |e| e.enc_revoke_id),
            auth_cert_offset: if cert_len != 0 {
                PARTITION_HEADER_SIZE as u32
            } else {
                0
            },
        };

        let mut image = header.encode().to_vec();
        let mut ppk_hash = None;
        let mut digest = None;
        if let Some(keys) = &config.cert {
            let cert = self.gen_cert(keys, &stored)?;
            ppk_hash = Some(self.ppk_hash(&cert)?);
            digest = Some(self.partition_digest(&cert, &stored)?);
            image.extend_from_slice(cert.as_bytes());
        }
        image.extend_from_slice(&stored);

        Ok(GeneratedPartition {
            image,
            header,
            black_key,
            ppk_hash,
            digest,
        })
    }

    /// Generate a P-384 authentication certificate over `stored`
    pub fn gen_cert(
        &self,
        keys: &CertKeyConfig,
        stored: &[u8],
    ) -> anyhow::Result<AuthCertificateRaw> {
        if keys.user_data.len() > AUTH_CERT_USER_DATA_MAX_SIZE {
            bail!("User data larger than {AUTH_CERT_USER_DATA_MAX_SIZE} bytes");
        }

        let ppk = self.crypto.ecdsa384_pub_key(&keys.ppk_priv)?;
        let spk = self.crypto.ecdsa384_pub_key(&keys.spk_priv)?;

        let mut auth_header = AuthHeader::default();
        auth_header.set_hash_algo(AUTH_HDR_HASH_ALGO_SHA3);
        auth_header.set_pub_strength(SignatureScheme::EcdsaP384.into());

        let mut cert = AuthCertificateRaw::new_zeroed();
        cert.header.marker = U32::new(AUTH_CERT_MARKER);
        cert.header.auth_header = U32::new(auth_header.0);
        cert.header.cert_size = U32::new(AUTH_CERT_SIZE as u32);
        cert.header.user_data_len = U32::new(keys.user_data.len() as u32);
        cert.user_data[..keys.user_data.len()].copy_from_slice(&keys.user_data);
        write_pub_key(&mut cert.ppk, &ppk);
        write_pub_key(&mut cert.spk.key, &spk);
        cert.spk.spk_id = U32::new(keys.spk_id);

        let mut spk_data = cert.header.as_bytes().to_vec();
        spk_data.extend_from_slice(cert.spk.as_bytes());
        let digest = self.crypto.sha3_384_digest(&spk_data)?;
        let sig = self.crypto.ecdsa384_sign(&digest, &keys.ppk_priv)?;
        write_signature(&mut cert.spk_signature, &sig);

        if let Some(boot_header) = &keys.boot_header {
            let digest = self.crypto.sha3_384_digest(boot_header)?;
            let sig = self.crypto.ecdsa384_sign(&digest, &keys.spk_priv)?;
            write_signature(&mut cert.bh_signature, &sig);
        }

        let digest = self.partition_digest(&cert, stored)?;
        let sig = self.crypto.ecdsa384_sign(&digest, &keys.spk_priv)?;
        write_signature(&mut cert.partition_signature, &sig);

        Ok(cert)
    }

    /// Calculate the digest signed by the partition signature
    pub fn partition_digest(
        &self,
        cert: &AuthCertificateRaw,
        stored: &[u8],
    ) -> anyhow::Result<ImageDigest> {
        let mut data = cert.as_bytes()[AuthCertificateRaw::partition_digest_prefix_range()].to_vec();
        data.extend_from_slice(stored);
        self.crypto.sha3_384_digest(&data)
    }

    /// Calculate the eFuse reference hash of the certificate's PPK
    pub fn ppk_hash(&self, cert: &AuthCertificateRaw) -> anyhow::Result<[u32; 8]> {
        let digest = self.crypto.sha3_384_digest(&cert.ppk)?;
        let mut words = [0u32; 8];
        for (word, bytes) in words.iter_mut().zip(digest.chunks_exact(4)) {
            *word = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        }
        Ok(words)
    }

    /// Encrypt `content` into a secure header chain
    ///
    /// Layout: `SH0 || tag0 || { block_i || SH_i+1 || tag_i+1 }`. Every
    /// secure header names the key, IV and length of the block after it; the
    /// header closing the chain carries a zero length.
    pub fn encrypt(
        &self,
        content: &[u8],
        block_size: usize,
        enc: &EncryptionConfig,
    ) -> anyhow::Result<Vec<u8>> {
        if block_size == 0 {
            bail!("Block size must not be zero");
        }

        let blocks: Vec<&[u8]> = content.chunks(block_size).collect();
        let mut keys = vec![(enc.key, enc.iv)];
        for index in 0..blocks.len() {
            keys.push(self.block_key(enc, index)?);
        }

        let secure_header = |index: usize| -> anyhow::Result<[u8; SECURE_HEADER_SIZE]> {
            let sh = match blocks.get(index) {
                Some(block) => SecureHeader {
                    next_key: keys[index + 1].0,
                    next_iv: keys[index + 1].1,
                    next_blk_len: u32::try_from(block.len())?,
                },
                None => SecureHeader {
                    next_key: [0; AES_KEY_BYTE_SIZE],
                    next_iv: [0; AES_IV_BYTE_SIZE],
                    next_blk_len: 0,
                },
            };
            Ok(sh.encode())
        };

        let (ciphertext, tag) =
            self.crypto
                .aes256_gcm_encrypt(&keys[0].0, &keys[0].1, &secure_header(0)?)?;
        let mut stored = ciphertext;
        stored.extend_from_slice(&tag);

        for (index, block) in blocks.iter().enumerate() {
            let mut plaintext = block.to_vec();
            plaintext.extend_from_slice(&secure_header(index + 1)?);
            let (key, iv) = &keys[index + 1];
            let (ciphertext, tag) = self.crypto.aes256_gcm_encrypt(key, iv, &plaintext)?;
            stored.extend_from_slice(&ciphertext);
            stored.extend_from_slice(&tag);
        }

        Ok(stored)
    }

    /// Rolling key and IV of block `index`
    fn block_key(
        &self,
        enc: &EncryptionConfig,
        index: usize,
    ) -> anyhow::Result<([u8; AES_KEY_BYTE_SIZE], AesIv)> {
        let mut seed = enc.key.to_vec();
        seed.extend_from_slice(&enc.iv);
        seed.extend_from_slice(&(index as u32).to_le_bytes());
        let digest = self.crypto.sha3_384_digest(&seed)?;

        let mut key = [0u8; AES_KEY_BYTE_SIZE];
        let mut iv = [0u8; AES_IV_BYTE_SIZE];
        key.copy_from_slice(&digest[..AES_KEY_BYTE_SIZE]);
        iv.copy_from_slice(&digest[AES_KEY_BYTE_SIZE..AES_KEY_BYTE_SIZE + AES_IV_BYTE_SIZE]);
        Ok((key, iv))
    }
}

fn write_pub_key(block: &mut [u8; PUB_KEY_BLOCK_SIZE], key: &ImageEccPubKey) {
    block[..ECC384_SCALAR_BYTE_SIZE].copy_from_slice(&key.x);
    block[ECC384_SCALAR_BYTE_SIZE..2 * ECC384_SCALAR_BYTE_SIZE].copy_from_slice(&key.y);
}

fn write_signature(block: &mut [u8; SIGNATURE_BLOCK_SIZE], sig: &ImageEccSignature) {
    block[..ECC384_SCALAR_BYTE_SIZE].copy_from_slice(&sig.r);
    block[ECC384_SCALAR_BYTE_SIZE..2 * ECC384_SCALAR_BYTE_SIZE].copy_from_slice(&sig.s);
}

#[cfg(test)]
mod tests {
    use super::*;
    use secboot_emu_crypto::{Aes256Gcm, Ecc384, Ecc384PubKey, Ecc384Signature};

    const PPK_PRIV: ImageEccPrivKey = [0x11; 48];
    const SPK_PRIV: ImageEccPrivKey = [0x22; 48];

    fn keys() -> CertKeyConfig {
        CertKeyConfig {
            ppk_priv: PPK_PRIV,
            spk_priv: SPK_PRIV,
            spk_id: 9,
            user_data: b"fw".to_vec(),
            boot_header: Some(vec![0xB0; 64]),
        }
    }

    fn enc(key_source: KeySource) -> EncryptionConfig {
        EncryptionConfig {
            key_source,
            key: [0x5A; 32],
            iv: [0xA5; 12],
            kek_iv: [0x3C; 12],
            enc_revoke_id: 4,
            kek: Some([0x77; 32]),
        }
    }

    fn verify(pub_block: &[u8], digest: &ImageDigest, sig_block: &[u8]) -> bool {
        let mut key = Ecc384PubKey::default();
        key.x.copy_from_slice(&pub_block[..48]);
        key.y.copy_from_slice(&pub_block[48..96]);
        let mut sig = Ecc384Signature::default();
        sig.r.copy_from_slice(&sig_block[..48]);
        sig.s.copy_from_slice(&sig_block[48..96]);
        Ecc384::verify(&key, digest, &sig)
    }

    #[test]
    fn test_plain_authenticated_partition() {
        let gen = ImageGenerator::new(EmuCrypto::default());
        let config = PartitionConfig {
            content: vec![0xC3; 100],
            block_size: 32,
            cert: Some(keys()),
            ..Default::default()
        };
        let part = gen.generate(&config).unwrap();

        let header = PartitionHeader::decode(&part.image).unwrap();
        assert_eq!(header, part.header);
        assert_eq!(header.auth_cert_offset, 64);
        assert_eq!(header.data_offset as usize, 64 + AUTH_CERT_SIZE);
        assert_eq!(header.stored_len, 100);
        assert!(!header.is_encrypted());
        assert_eq!(&part.image[header.data_offset as usize..], &[0xC3; 100][..]);

        let cert = AuthCertificate::parse(&part.image[64..]).unwrap();
        assert_eq!(cert.spk_id(), 9);
        assert_eq!(cert.user_data(), b"fw");

        let crypto = EmuCrypto::default();
        let mut spk_data = cert.header_bytes().to_vec();
        spk_data.extend_from_slice(cert.spk_block());
        let spk_digest = crypto.sha3_384_digest(&spk_data).unwrap();
        assert!(verify(
            &cert.raw().ppk,
            &spk_digest,
            &cert.raw().spk_signature
        ));

        let digest = part.digest.unwrap();
        assert!(verify(
            &cert.raw().spk.key,
            &digest,
            &cert.raw().partition_signature
        ));

        let bh_digest = crypto.sha3_384_digest(&[0xB0; 64]).unwrap();
        assert!(verify(&cert.raw().spk.key, &bh_digest, &cert.raw().bh_signature));

        let ppk_digest = crypto.sha3_384_digest(&cert.raw().ppk).unwrap();
        let ppk_hash = part.ppk_hash.unwrap();
        assert_eq!(ppk_hash[0].to_be_bytes(), ppk_digest[..4]);
        assert_eq!(ppk_hash[7].to_be_bytes(), ppk_digest[28..32]);
    }

    #[test]
    fn test_secure_header_chain() {
        let gen = ImageGenerator::new(EmuCrypto::default());
        let content: Vec<u8> = (0..80u8).collect();
        let config = PartitionConfig {
            content: content.clone(),
            block_size: 32,
            encryption: Some(enc(KeySource::EfuseBlkKey)),
            ..Default::default()
        };
        let part = gen.generate(&config).unwrap();
        let header = part.header;
        assert_eq!(header.key_source, Some(KeySource::EfuseBlkKey));
        assert_eq!(header.plain_len, 80);
        // SH0 unit plus three blocks of 32, 32 and 16 bytes, each followed by a unit
        assert_eq!(header.stored_len, 64 + (32 + 64) * 2 + 16 + 64);

        let stored = &part.image[header.data_offset as usize..];
        let mut tag = [0u8; 16];
        tag.copy_from_slice(&stored[48..64]);
        let sh = Aes256Gcm::decrypt(&[0x5A; 32], &[0xA5; 12], &[], &tag, &stored[..48]).unwrap();

        let mut sh = SecureHeader::decode(sh.as_slice().try_into().unwrap());
        let mut offset = 64;
        let mut plaintext = vec![];
        while !sh.is_last() {
            let len = sh.next_blk_len as usize + SECURE_HEADER_SIZE;
            tag.copy_from_slice(&stored[offset + len..offset + len + 16]);
            let block = Aes256Gcm::decrypt(
                &sh.next_key,
                &sh.next_iv,
                &[],
                &tag,
                &stored[offset..offset + len],
            )
            .unwrap();
            let (data, next) = block.split_at(len - SECURE_HEADER_SIZE);
            plaintext.extend_from_slice(data);
            sh = SecureHeader::decode(next.try_into().unwrap());
            offset += len + 16;
        }
        assert_eq!(offset, stored.len());
        assert_eq!(plaintext, content);

        let mut red = part.black_key.unwrap();
        assert_ne!(red, [0x5A; 32]);
        assert!(Aes256Gcm::ctr_xor(&[0x77; 32], &[0x3C; 12], &mut red));
        assert_eq!(red, [0x5A; 32]);
    }

    #[test]
    fn test_empty_encrypted_partition() {
        let gen = ImageGenerator::new(EmuCrypto::default());
        let mut enc = enc(KeySource::UsrKey0);
        enc.kek = None;
        let config = PartitionConfig {
            block_size: 16,
            encryption: Some(enc),
            ..Default::default()
        };
        let part = gen.generate(&config).unwrap();
        assert_eq!(part.header.stored_len, 64);
        assert!(part.black_key.is_none());
    }

    #[test]
    fn test_rejects_bad_config() {
        let gen = ImageGenerator::new(EmuCrypto::default());
        let config = PartitionConfig {
            content: vec![0; 16],
            block_size: 0,
            encryption: Some(enc(KeySource::UsrKey0)),
            ..Default::default()
        };
        assert!(gen.generate(&config).is_err());

        let mut keys = keys();
        keys.user_data = vec![0; 49];
        assert!(gen.gen_cert(&keys, &[]).is_err());
    }

    #[test]
    fn test_key_and_signature_defaults() {
        let key = crate::ImageEccPubKey::default();
        assert!(key.x.iter().chain(key.y.iter()).all(|b| *b == 0));
        let sig = crate::ImageEccSignature::default();
        assert!(sig.r.iter().chain(sig.s.iter()).all(|b| *b == 0));
    }
}
