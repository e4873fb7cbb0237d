/*++

Licensed under the Apache-2.0 license.

File Name:

    loader.rs

Abstract:

    File contains the partition secure processing pipeline: authentication,
    black key unwrap and secure header chain decryption.

--*/

use secboot_cfi_lib::{cfi_assert, cfi_launder};
use secboot_drivers::{
    check_regeneration_allowed, cprintln, AesGcm, AesKey, Array4x12, FuseBank, HelperDataSource,
    KeySourceResolver, Puf, PufHelperData, RegenKind, SecureBootError, SecureBootResult, Sha3,
    TrimmedSynData,
};
use secboot_image_types::*;
use secboot_image_verify::{AuthCertVerifier, TrustedChain};
use zeroize::Zeroize;

use crate::context::clear_buffer;
use crate::{BootSession, LoaderConfig, LoaderEnv, SecureProcessingContext, SecureStatePolicy};

/// Outcome of a successful partition load
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PartitionInfo {
    /// Plaintext bytes written to the destination
    pub plain_len: u32,

    pub stored_len: u32,

    /// Chunks copied, or blocks decrypted for an encrypted partition
    pub block_count: u32,

    pub authenticated: bool,

    pub encrypted: bool,

    pub key_source: Option<KeySource>,

    /// Revocation id of the SPK that signed the partition
    pub spk_id: Option<u32>,

    /// Digest covered by the partition signature
    pub digest: Option<Array4x12>,
}

/// Partition loader
pub struct PartitionLoader<'a, Env: LoaderEnv + ?Sized> {
    env: &'a mut Env,
    fuses: &'a FuseBank,
    session: &'a mut BootSession,
    config: LoaderConfig,
    policy: SecureStatePolicy,
}

impl<'a, Env: LoaderEnv + ?Sized> PartitionLoader<'a, Env> {
    /// Create an instance `PartitionLoader`
    ///
    /// # Arguments
    ///
    /// * `env` - Crypto engines and the PUF
    /// * `fuses` - eFuse values
    /// * `session` - Boot session shared by every partition
    /// * `config` - Loader configuration
    pub fn new(
        env: &'a mut Env,
        fuses: &'a FuseBank,
        session: &'a mut BootSession,
        config: LoaderConfig,
    ) -> SecureBootResult<Self> {
        config.validate()?;
        Ok(Self {
            env,
            fuses,
            session,
            config,
            policy: SecureStatePolicy::from_fuses(fuses),
        })
    }

    pub fn session(&self) -> &BootSession {
        &*self.session
    }

    pub fn policy(&self) -> SecureStatePolicy {
        self.policy
    }

    /// Authenticate and decrypt one partition into `dest`
    ///
    /// On failure nothing is handed over: `dest` is zeroed and read back.
    ///
    /// # Arguments
    ///
    /// * `image` - Boot image holding the partition
    /// * `header_offset` - Offset of the partition header in `image`
    /// * `dest` - Destination of the plaintext
    ///
    /// # Returns
    ///
    /// * `PartitionInfo` - Lengths and the checks that were applied
    pub fn load_partition(
        &mut self,
        image: &[u8],
        header_offset: usize,
        dest: &mut [u8],
    ) -> SecureBootResult<PartitionInfo> {
        let mut ctx = SecureProcessingContext::default();
        let result = self.process(image, header_offset, dest, &mut ctx);
        let hash_cleared = self.clear_hash(&ctx);
        let ctx_cleared = ctx.clear();

        // A partition whose scratch state could not be cleared is not handed over.
        let result = result.and_then(|info| {
            hash_cleared?;
            ctx_cleared?;
            Ok(info)
        });

        match result {
            Ok(info) => {
                cprintln!(
                    "[ldr] Loaded {} bytes in {} blocks",
                    info.plain_len,
                    info.block_count
                );
                Ok(info)
            }
            Err(err) => {
                cprintln!("[ldr] Partition load failed 0x{:08X}", u32::from(err));
                clear_buffer(dest)?;
                hash_cleared?;
                ctx_cleared?;
                Err(err)
            }
        }
    }

    fn process(
        &mut self,
        image: &[u8],
        header_offset: usize,
        dest: &mut [u8],
        ctx: &mut SecureProcessingContext,
    ) -> SecureBootResult<PartitionInfo> {
        let header_bytes = image
            .get(header_offset..)
            .ok_or(SecureBootError::LOADER_PARTITION_OUT_OF_BOUNDS)?;
        let header = PartitionHeader::decode(header_bytes)?;

        ctx.is_authenticated = header.is_authenticated();
        ctx.is_encrypted = header.is_encrypted();
        self.policy.check(&header)?;

        let plain_len = header.plain_len as usize;
        let stored_len = header.stored_len as usize;
        let data_offset = header.data_offset as usize;
        data_offset
            .checked_add(stored_len)
            .and_then(|end| image.get(data_offset..end))
            .ok_or(SecureBootError::LOADER_PARTITION_OUT_OF_BOUNDS)?;

        if dest.len() < plain_len {
            return Err(SecureBootError::LOADER_DEST_BUFFER_TOO_SMALL);
        }

        if ctx.is_encrypted {
            if plain_len % AES_BLOCK_BYTE_SIZE != 0 || stored_len % AES_BLOCK_BYTE_SIZE != 0 {
                return Err(SecureBootError::LOADER_ENC_DATA_NOT_ALIGNED);
            }
            if stored_len < SECURE_HEADER_UNIT_SIZE {
                return Err(SecureBootError::LOADER_DECRYPT_REMAINDER_SIZE_MISMATCH);
            }
        } else if stored_len != plain_len {
            return Err(SecureBootError::LOADER_PLAIN_LEN_MISMATCH);
        }

        cprintln!(
            "[ldr] Partition len {} auth {} enc {}",
            header.plain_len,
            ctx.is_authenticated as u8,
            ctx.is_encrypted as u8
        );

        // The certificate chain is trusted before any partition byte is read.
        let chain = if ctx.is_authenticated {
            Some(self.authenticate_chain(image, &header, ctx)?)
        } else {
            None
        };

        if let Some(src) = header.key_source {
            self.fuses.revocation().check(header.enc_revoke_id)?;
            if src.is_black() {
                let hd_source = if header.attributes.puf_hd_in_boot_header() {
                    HelperDataSource::BootHeader
                } else {
                    HelperDataSource::Efuse
                };
                self.unwrap_black_key(src, &header.kek_iv, hd_source)?;
            }
            ctx.key_handle = Some(KeySourceResolver::resolve(
                src,
                self.session.availability(),
            )?);
        }

        ctx.src_offset = data_offset;
        ctx.remaining_len = stored_len;
        if ctx.is_encrypted {
            self.decrypt_blocks(image, &header, dest, ctx)?;
        } else {
            self.copy_chunks(image, dest, ctx)?;
        }

        if ctx.processed_len != plain_len {
            return Err(SecureBootError::LOADER_PLAIN_LEN_MISMATCH);
        }

        let mut digest = None;
        if let Some(chain) = chain {
            let computed = self
                .env
                .sha3_384_finalize()
                .map_err(|_| SecureBootError::IMAGE_VERIFIER_ERR_PARTITION_HASH_FAIL)?;
            ctx.hash_active = false;
            let verified = AuthCertVerifier::new(&mut *self.env, self.fuses)
                .verify_partition_signature(&chain, &computed)?;
            digest = Some(verified.digest);
        }

        if cfi_launder(ctx.is_authenticated) {
            cfi_assert!(digest.is_some());
        }

        Ok(PartitionInfo {
            plain_len: header.plain_len,
            stored_len: header.stored_len,
            block_count: ctx.block_count,
            authenticated: ctx.is_authenticated,
            encrypted: ctx.is_encrypted,
            key_source: header.key_source,
            spk_id: chain.map(|c| c.spk_id),
            digest,
        })
    }

    /// Verify the certificate chain and open the partition digest
    fn authenticate_chain<'i>(
        &mut self,
        image: &'i [u8],
        header: &PartitionHeader,
        ctx: &mut SecureProcessingContext,
    ) -> SecureBootResult<TrustedChain<'i>> {
        let cert_bytes = image
            .get(header.auth_cert_offset as usize..)
            .ok_or(SecureBootError::LOADER_AUTH_CERT_OUT_OF_BOUNDS)?;
        let cert = AuthCertificate::parse(cert_bytes)?;

        let chain = AuthCertVerifier::new(&mut *self.env, self.fuses)
            .verify_chain(&cert, self.fuses.revocation())?;

        self.env
            .sha3_384_init()
            .map_err(|_| SecureBootError::IMAGE_VERIFIER_ERR_PARTITION_HASH_FAIL)?;
        ctx.hash_active = true;
        self.fold(cert.partition_digest_prefix())?;
        Ok(chain)
    }

    /// Scrub the SHA3 engine once an authenticated partition touched it,
    /// whether or not its digest was finalized
    fn clear_hash(&mut self, ctx: &SecureProcessingContext) -> SecureBootResult<()> {
        if !ctx.is_authenticated && !ctx.hash_active {
            return Ok(());
        }
        self.env
            .sha3_384_zeroize()
            .map_err(|_| SecureBootError::LOADER_SEC_BUF_CLEAR_ERR)
    }

    /// Fold stored bytes into the partition digest
    fn fold(&mut self, data: &[u8]) -> SecureBootResult<()> {
        self.env
            .sha3_384_update(data)
            .map_err(|_| SecureBootError::IMAGE_VERIFIER_ERR_PARTITION_HASH_FAIL)
    }

    fn copy_chunks(
        &mut self,
        image: &[u8],
        dest: &mut [u8],
        ctx: &mut SecureProcessingContext,
    ) -> SecureBootResult<()> {
        while ctx.remaining_len > 0 {
            let len = ctx.remaining_len.min(self.config.chunk_size);
            let chunk = image
                .get(ctx.src_offset..ctx.src_offset + len)
                .ok_or(SecureBootError::LOADER_PARTITION_OUT_OF_BOUNDS)?;
            if ctx.hash_active {
                self.fold(chunk)?;
            }
            dest.get_mut(ctx.dest_offset..ctx.dest_offset + len)
                .ok_or(SecureBootError::LOADER_DEST_BUFFER_TOO_SMALL)?
                .copy_from_slice(chunk);
            ctx.advance(len, len);
        }
        Ok(())
    }

    /// Walk the secure header chain
    ///
    /// Stored layout: `SH0 || tag0 || { block_i || SH_i+1 || tag_i+1 }`. SH0
    /// is decrypted with the resolved key, every later unit with the key and
    /// IV carried by the secure header before it.
    fn decrypt_blocks(
        &mut self,
        image: &[u8],
        header: &PartitionHeader,
        dest: &mut [u8],
        ctx: &mut SecureProcessingContext,
    ) -> SecureBootResult<()> {
        let handle = ctx.key_handle.ok_or(SecureBootError::KEY_SOURCE_INVALID)?;
        let plain_len = header.plain_len as usize;

        let unit = image
            .get(ctx.src_offset..ctx.src_offset + SECURE_HEADER_UNIT_SIZE)
            .ok_or(SecureBootError::LOADER_PARTITION_OUT_OF_BOUNDS)?;
        if ctx.hash_active {
            self.fold(unit)?;
        }
        let (ciphertext, tag) = unit
            .split_last_chunk::<AES_GCM_TAG_BYTE_SIZE>()
            .ok_or(SecureBootError::LOADER_DECRYPT_REMAINDER_SIZE_MISMATCH)?;
        self.env.aes256_gcm_decrypt(
            AesKey::Handle(handle),
            &header.iv,
            ciphertext,
            tag,
            &mut ctx.chunk[..SECURE_HEADER_SIZE],
        )?;
        let mut sh = secure_header_at(&ctx.chunk, 0)?;
        ctx.chunk[..SECURE_HEADER_SIZE].zeroize();
        ctx.src_offset += SECURE_HEADER_UNIT_SIZE;
        ctx.remaining_len -= SECURE_HEADER_UNIT_SIZE;

        while !sh.is_last() {
            let blk_len = sh.next_blk_len as usize;
            if blk_len % AES_BLOCK_BYTE_SIZE != 0 {
                return Err(SecureBootError::LOADER_ENC_DATA_NOT_ALIGNED);
            }
            if blk_len > self.config.chunk_size {
                return Err(SecureBootError::LOADER_ENC_BLOCK_TOO_LARGE);
            }
            let unit_len = blk_len + SECURE_HEADER_UNIT_SIZE;
            if unit_len > ctx.remaining_len {
                return Err(SecureBootError::LOADER_DECRYPT_REMAINDER_SIZE_MISMATCH);
            }
            if ctx.processed_len + blk_len > plain_len {
                return Err(SecureBootError::LOADER_PLAIN_LEN_MISMATCH);
            }
            ctx.remaining_decrypt_len = blk_len;

            let unit = image
                .get(ctx.src_offset..ctx.src_offset + unit_len)
                .ok_or(SecureBootError::LOADER_PARTITION_OUT_OF_BOUNDS)?;
            if ctx.hash_active {
                self.fold(unit)?;
            }
            let (ciphertext, tag) = unit
                .split_last_chunk::<AES_GCM_TAG_BYTE_SIZE>()
                .ok_or(SecureBootError::LOADER_DECRYPT_REMAINDER_SIZE_MISMATCH)?;
            self.env.aes256_gcm_decrypt(
                AesKey::Array(&sh.next_key),
                &sh.next_iv,
                ciphertext,
                tag,
                &mut ctx.chunk[..blk_len + SECURE_HEADER_SIZE],
            )?;

            // Only authenticated plaintext reaches the destination.
            dest.get_mut(ctx.dest_offset..ctx.dest_offset + blk_len)
                .ok_or(SecureBootError::LOADER_DEST_BUFFER_TOO_SMALL)?
                .copy_from_slice(&ctx.chunk[..blk_len]);
            sh = secure_header_at(&ctx.chunk, blk_len)?;
            ctx.chunk[..blk_len + SECURE_HEADER_SIZE].zeroize();
            ctx.remaining_decrypt_len = 0;
            ctx.advance(unit_len, blk_len);
        }

        if ctx.remaining_len != 0 {
            return Err(SecureBootError::LOADER_ENC_DATA_LEFT_FOR_DECRYPT);
        }
        Ok(())
    }

    /// Derive the red key of a black key source
    ///
    /// Regenerates the PUF KEK from helper data, decrypts the black key slot
    /// into the red key slot and clears the PUF id. The boot header black key
    /// is loaded from the boot header first and unwrapped with the boot header
    /// IV; every other source uses `kek_iv`. Nothing happens when the red key
    /// was already derived during this session.
    ///
    /// # Arguments
    ///
    /// * `src` - Black key source
    /// * `kek_iv` - IV the black key was obfuscated with
    /// * `hd_source` - Where the PUF helper data is taken from
    pub fn unwrap_black_key(
        &mut self,
        src: KeySource,
        kek_iv: &AesIv,
        hd_source: HelperDataSource,
    ) -> SecureBootResult<()> {
        let info = KeySourceResolver::black_key_info(src)
            .ok_or(SecureBootError::KEY_SOURCE_NOT_BLACK_KEY)?;
        if self.session.availability().contains(info.flag) {
            return Ok(());
        }

        check_regeneration_allowed(self.fuses, hd_source)?;

        let mut helper = match hd_source {
            HelperDataSource::Efuse => {
                let mut trimmed = TrimmedSynData(*self.fuses.puf_syndrome());
                let helper = PufHelperData::from_trimmed(
                    self.fuses.puf_chash(),
                    self.fuses.puf_aux(),
                    &trimmed,
                );
                trimmed.zeroize();
                helper
            }
            HelperDataSource::BootHeader => {
                let bh = self
                    .session
                    .boot_header()
                    .ok_or(SecureBootError::LOADER_BOOT_HEADER_HELPER_DATA_MISSING)?;
                let mut trimmed = TrimmedSynData(bh.puf_syndrome);
                let helper = PufHelperData::from_trimmed(bh.puf_chash, bh.puf_aux, &trimmed);
                trimmed.zeroize();
                helper
            }
        };

        let mut iv = *kek_iv;
        if src == KeySource::BhBlkKey {
            let bh = self
                .session
                .boot_header()
                .ok_or(SecureBootError::LOADER_BOOT_HEADER_KEY_MISSING)?;
            self.env.load_key(info.black, &bh.black_key)?;
            iv = bh.black_key_iv;
        }

        let regen =
            Puf::new(&mut *self.env, self.config.puf).regenerate(&helper, RegenKind::OnDemand);
        helper.zeroize();
        let mut id = regen?;
        id.zeroize();

        let unwrapped = self.env.kek_decrypt(info.black, info.red, &iv);
        let cleared = Puf::new(&mut *self.env, self.config.puf).clear_id();
        unwrapped?;
        cleared?;

        self.session.mark_red_key_derived(info.flag);
        cprintln!("[ldr] Red key derived for source 0x{:08X}", u32::from(src));
        Ok(())
    }
}

fn secure_header_at(buf: &[u8], offset: usize) -> SecureBootResult<SecureHeader> {
    let bytes = buf
        .get(offset..)
        .and_then(|b| b.first_chunk::<SECURE_HEADER_SIZE>())
        .ok_or(SecureBootError::SECBOOT_INTERNAL)?;
    Ok(SecureHeader::decode(bytes))
}
