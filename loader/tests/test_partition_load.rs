// Licensed under the Apache-2.0 license

mod helpers;

use helpers::*;
use secboot_drivers::{
    AesGcm, DecKeyAvailability, KeySlot, KeySourceResolver, PufEccCtrl, SecureBootError,
    SecurityControl, Sha3,
};
use secboot_emu_periph::{EmuPufFaults, EmuSoc};
use secboot_image_gen::PartitionConfig;
use secboot_image_types::{AuthCertificateRaw, KeySource, PartitionHeader, PARTITION_HEADER_SIZE};
use secboot_loader::{BootSession, LoaderConfig, PartitionInfo, PartitionLoader};

fn load(
    soc: &mut EmuSoc,
    fuses: &secboot_drivers::FuseBank,
    session: &mut BootSession,
    image: &[u8],
    dest: &mut [u8],
) -> Result<PartitionInfo, SecureBootError> {
    let mut loader = PartitionLoader::new(soc, fuses, session, LoaderConfig::default())?;
    loader.load_partition(image, 0, dest)
}

/// Rewrite the partition header in place
fn patch_header(image: &mut [u8], f: impl FnOnce(&mut PartitionHeader)) {
    let mut header = PartitionHeader::decode(image).unwrap();
    f(&mut header);
    image[..PARTITION_HEADER_SIZE].copy_from_slice(&header.encode());
}

#[test]
fn test_authenticated_plain_partition() {
    let (helper, _) = provision_puf();
    let data = content(1000);
    let part = generate(&PartitionConfig {
        content: data.clone(),
        cert: Some(cert_keys(3)),
        ..Default::default()
    });
    let mut fuses = fuses(&helper);
    program_ppk(&mut fuses, &part);

    let mut soc = soc();
    let mut session = BootSession::new(None);
    let mut dest = vec![0u8; 1000];
    let info = load(&mut soc, &fuses, &mut session, &part.image, &mut dest).unwrap();

    assert_eq!(dest, data);
    assert!(info.authenticated);
    assert!(!info.encrypted);
    assert_eq!(info.plain_len, 1000);
    assert_eq!(info.spk_id, Some(3));
    let digest: [u8; 48] = info.digest.unwrap().into();
    assert_eq!(digest, part.digest.unwrap());
    assert_eq!(soc.aes().decrypt_ops(), 0);
}

#[test]
fn test_corrupted_spk_signature_stops_before_partition_data() {
    let (helper, _) = provision_puf();
    let mut part = generate(&PartitionConfig {
        content: content(256),
        block_size: 64,
        cert: Some(cert_keys(0)),
        encryption: Some(encryption(KeySource::UsrKey0, None)),
        ..Default::default()
    });
    let mut fuses = fuses(&helper);
    program_ppk(&mut fuses, &part);

    let spk_sig = PARTITION_HEADER_SIZE + AuthCertificateRaw::spk_range().end;
    part.image[spk_sig + 5] ^= 0x01;

    let mut soc = soc();
    soc.load_key(KeySlot::UserKey0, &RED_KEY).unwrap();
    let mut session = BootSession::new(None);
    let mut dest = vec![0xEEu8; 256];
    assert_eq!(
        load(&mut soc, &fuses, &mut session, &part.image, &mut dest),
        Err(SecureBootError::IMAGE_VERIFIER_ERR_SPK_ECDSA_AUTH_FAIL)
    );

    // Only the PPK block, certificate header and SPK block were hashed.
    assert_eq!(soc.sha3().bytes_hashed(), 1040 + 16 + 1056);
    assert_eq!(soc.aes().decrypt_ops(), 0);
    assert!(dest.iter().all(|b| *b == 0));
}

#[test]
fn test_wrong_chash_never_converges() {
    let (helper, kek) = provision_puf();
    let part = generate(&PartitionConfig {
        content: content(64),
        block_size: 64,
        encryption: Some(encryption(KeySource::EfuseBlkKey, Some(kek))),
        ..Default::default()
    });
    let mut fuses = fuses(&helper);
    let trimmed = helper.to_trimmed().unwrap();
    fuses.set_puf_helper_data(helper.chash ^ 0x10, helper.aux, &trimmed.0);

    let mut soc = soc();
    soc.load_key(KeySlot::EfuseKey, &part.black_key.unwrap())
        .unwrap();
    let mut session = BootSession::new(None);
    let mut dest = vec![0u8; 64];
    assert_eq!(
        load(&mut soc, &fuses, &mut session, &part.image, &mut dest),
        Err(SecureBootError::DRIVER_PUF_NOT_CONVERGED)
    );
    assert_eq!(soc.puf().regen_commands(), 6);
    assert!(soc.puf().captured_key().is_none());
    assert!(session.availability().is_empty());
    assert!(soc.aes().slot(KeySlot::EfuseRedKey).is_none());
}

#[test]
fn test_efuse_black_key_is_derived_once() {
    let (helper, kek) = provision_puf();
    let data = content(512);
    let part = generate(&PartitionConfig {
        content: data.clone(),
        block_size: 128,
        cert: Some(cert_keys(1)),
        encryption: Some(encryption(KeySource::EfuseBlkKey, Some(kek))),
        ..Default::default()
    });
    let mut fuses = fuses(&helper);
    program_ppk(&mut fuses, &part);

    let mut soc = soc();
    soc.load_key(KeySlot::EfuseKey, &part.black_key.unwrap())
        .unwrap();
    let mut session = BootSession::new(None);
    assert_eq!(
        KeySourceResolver::resolve(KeySource::EfuseBlkKey, session.availability()),
        Err(SecureBootError::KEY_SOURCE_INVALID)
    );

    let mut dest = vec![0u8; 512];
    let info = load(&mut soc, &fuses, &mut session, &part.image, &mut dest).unwrap();
    assert_eq!(dest, data);
    assert!(info.authenticated && info.encrypted);
    assert_eq!(info.block_count, 4);
    assert_eq!(info.key_source, Some(KeySource::EfuseBlkKey));
    assert_eq!(soc.aes().slot(KeySlot::EfuseRedKey), Some(&RED_KEY));
    assert!(!soc.puf().id_present());
    assert_eq!(session.availability(), DecKeyAvailability::EFUSE_RED);
    assert!(KeySourceResolver::resolve(KeySource::EfuseBlkKey, session.availability()).is_ok());

    // A second partition reuses the red key without touching the PUF.
    let regen_commands = soc.puf().regen_commands();
    let mut dest = vec![0u8; 512];
    load(&mut soc, &fuses, &mut session, &part.image, &mut dest).unwrap();
    assert_eq!(dest, data);
    assert_eq!(soc.puf().regen_commands(), regen_commands);
}

#[test]
fn test_boot_header_black_key() {
    let (helper, kek) = provision_puf();
    let data = content(96);
    let part = generate(&PartitionConfig {
        content: data.clone(),
        block_size: 32,
        encryption: Some(encryption(KeySource::BhBlkKey, Some(kek))),
        puf_hd_in_boot_header: true,
        ..Default::default()
    });
    // eFuse helper data is invalidated; the boot header copy is used.
    let mut fuses = fuses(&helper);
    fuses.set_puf_ecc_ctrl(PufEccCtrl::HD_INVLD);

    let mut soc = soc();
    let mut session = BootSession::new(None);
    let mut dest = vec![0u8; 96];
    assert_eq!(
        load(&mut soc, &fuses, &mut session, &part.image, &mut dest),
        Err(SecureBootError::LOADER_BOOT_HEADER_HELPER_DATA_MISSING)
    );

    let mut session = BootSession::new(Some(boot_header(
        &helper,
        part.black_key.unwrap(),
        KEK_IV,
    )));
    let info = load(&mut soc, &fuses, &mut session, &part.image, &mut dest).unwrap();
    assert_eq!(dest, data);
    assert_eq!(info.block_count, 3);
    assert_eq!(session.availability(), DecKeyAvailability::BH_RED);
}

#[test]
fn test_efuse_helper_data_rules() {
    let (helper, kek) = provision_puf();
    let part = generate(&PartitionConfig {
        content: content(32),
        block_size: 32,
        encryption: Some(encryption(KeySource::EfuseBlkKey, Some(kek))),
        ..Default::default()
    });

    let cases = [
        (
            SecurityControl::PUF_DIS,
            PufEccCtrl::empty(),
            SecureBootError::DRIVER_PUF_DISABLED,
        ),
        (
            SecurityControl::empty(),
            PufEccCtrl::REGEN_DIS,
            SecureBootError::DRIVER_PUF_REGENERATION_DISABLED,
        ),
        (
            SecurityControl::empty(),
            PufEccCtrl::HD_INVLD,
            SecureBootError::DRIVER_PUF_HELPER_DATA_INVALIDATED,
        ),
    ];
    for (sec_ctrl, puf_ctrl, err) in cases {
        let mut fuses = fuses(&helper);
        fuses.set_sec_ctrl(sec_ctrl);
        fuses.set_puf_ecc_ctrl(puf_ctrl);
        let mut soc = soc();
        let mut session = BootSession::new(None);
        let mut dest = vec![0u8; 32];
        assert_eq!(
            load(&mut soc, &fuses, &mut session, &part.image, &mut dest),
            Err(err)
        );
        assert_eq!(soc.puf().regen_commands(), 0);
    }
}

#[test]
fn test_one_aes_block_boundary() {
    let (helper, _) = provision_puf();
    let fuses = fuses(&helper);

    for (len, expected) in [
        (16, Ok(())),
        (15, Err(SecureBootError::LOADER_ENC_DATA_NOT_ALIGNED)),
        (17, Err(SecureBootError::LOADER_ENC_DATA_NOT_ALIGNED)),
    ] {
        let data = content(len);
        let part = generate(&PartitionConfig {
            content: data.clone(),
            block_size: 16,
            encryption: Some(encryption(KeySource::UsrKey0, None)),
            ..Default::default()
        });
        let mut soc = soc();
        soc.load_key(KeySlot::UserKey0, &RED_KEY).unwrap();
        let mut session = BootSession::new(None);
        let mut dest = vec![0u8; 32];
        let result = load(&mut soc, &fuses, &mut session, &part.image, &mut dest);
        assert_eq!(result.map(|_| ()), expected, "length {len}");
        if expected.is_ok() {
            assert_eq!(&dest[..len], &data[..]);
        } else {
            assert!(dest.iter().all(|b| *b == 0));
        }
    }
}

#[test]
fn test_unaligned_block_in_chain() {
    let (helper, _) = provision_puf();
    let fuses = fuses(&helper);
    // Blocks of 40 and 24 bytes: aligned in total, not per block.
    let part = generate(&PartitionConfig {
        content: content(64),
        block_size: 40,
        encryption: Some(encryption(KeySource::UsrKey0, None)),
        ..Default::default()
    });
    let mut soc = soc();
    soc.load_key(KeySlot::UserKey0, &RED_KEY).unwrap();
    let mut session = BootSession::new(None);
    let mut dest = vec![0u8; 64];
    assert_eq!(
        load(&mut soc, &fuses, &mut session, &part.image, &mut dest),
        Err(SecureBootError::LOADER_ENC_DATA_NOT_ALIGNED)
    );
}

#[test]
fn test_direct_key_resolution_is_idempotent() {
    let (helper, _) = provision_puf();
    let fuses = fuses(&helper);
    let data = content(128);
    let part = generate(&PartitionConfig {
        content: data.clone(),
        block_size: 64,
        encryption: Some(encryption(KeySource::UsrKey5, None)),
        ..Default::default()
    });

    let mut soc = soc();
    soc.load_key(KeySlot::UserKey5, &RED_KEY).unwrap();
    let mut session = BootSession::new(None);
    let mut first = vec![0u8; 128];
    let mut second = vec![0u8; 128];
    load(&mut soc, &fuses, &mut session, &part.image, &mut first).unwrap();
    load(&mut soc, &fuses, &mut session, &part.image, &mut second).unwrap();
    assert_eq!(first, data);
    assert_eq!(second, data);
    assert!(session.availability().is_empty());
}

#[test]
fn test_tampered_ciphertext() {
    let (helper, _) = provision_puf();
    let fuses = fuses(&helper);
    let mut part = generate(&PartitionConfig {
        content: content(128),
        block_size: 64,
        encryption: Some(encryption(KeySource::UsrKey0, None)),
        ..Default::default()
    });
    // Second block
    let offset = part.header.data_offset as usize + 64 + 64 + 64 + 10;
    part.image[offset] ^= 0x80;

    let mut soc = soc();
    soc.load_key(KeySlot::UserKey0, &RED_KEY).unwrap();
    let mut session = BootSession::new(None);
    let mut dest = vec![0u8; 128];
    assert_eq!(
        load(&mut soc, &fuses, &mut session, &part.image, &mut dest),
        Err(SecureBootError::LOADER_AEAD_TAG_MISMATCH)
    );
    // The first block had been delivered and is wiped again.
    assert!(dest.iter().all(|b| *b == 0));
    assert_eq!(soc.aes().decrypt_ops(), 3);
}

#[test]
fn test_tampered_authenticated_data() {
    let (helper, _) = provision_puf();
    let mut part = generate(&PartitionConfig {
        content: content(300),
        cert: Some(cert_keys(0)),
        ..Default::default()
    });
    let mut fuses = fuses(&helper);
    program_ppk(&mut fuses, &part);
    let last = part.image.len() - 1;
    part.image[last] ^= 1;

    let mut soc = soc();
    let mut session = BootSession::new(None);
    let mut dest = vec![0u8; 300];
    assert_eq!(
        load(&mut soc, &fuses, &mut session, &part.image, &mut dest),
        Err(SecureBootError::IMAGE_VERIFIER_ERR_PARTITION_ECDSA_AUTH_FAIL)
    );
    assert!(dest.iter().all(|b| *b == 0));
}

#[test]
fn test_chain_length_mismatches() {
    let (helper, _) = provision_puf();
    let fuses = fuses(&helper);
    let part = generate(&PartitionConfig {
        content: content(64),
        block_size: 32,
        encryption: Some(encryption(KeySource::UsrKey0, None)),
        ..Default::default()
    });

    let mut soc = soc();
    soc.load_key(KeySlot::UserKey0, &RED_KEY).unwrap();

    // Trailing data after the closing secure header
    let mut image = part.image.clone();
    image.extend_from_slice(&[0u8; 64]);
    patch_header(&mut image, |h| h.stored_len += 64);
    let mut session = BootSession::new(None);
    let mut dest = vec![0u8; 64];
    assert_eq!(
        load(&mut soc, &fuses, &mut session, &image, &mut dest),
        Err(SecureBootError::LOADER_ENC_DATA_LEFT_FOR_DECRYPT)
    );

    // Stored length cut short of the last unit
    let mut image = part.image.clone();
    patch_header(&mut image, |h| h.stored_len -= 16);
    assert_eq!(
        load(&mut soc, &fuses, &mut session, &image, &mut dest),
        Err(SecureBootError::LOADER_DECRYPT_REMAINDER_SIZE_MISMATCH)
    );

    // Header claims more plaintext than the chain carries
    let mut image = part.image.clone();
    patch_header(&mut image, |h| h.plain_len += 16);
    let mut dest = vec![0u8; 80];
    assert_eq!(
        load(&mut soc, &fuses, &mut session, &image, &mut dest),
        Err(SecureBootError::LOADER_PLAIN_LEN_MISMATCH)
    );

    // Destination too small
    let mut dest = vec![0u8; 48];
    assert_eq!(
        load(&mut soc, &fuses, &mut session, &part.image, &mut dest),
        Err(SecureBootError::LOADER_DEST_BUFFER_TOO_SMALL)
    );
}

#[test]
fn test_block_larger_than_chunk() {
    let (helper, _) = provision_puf();
    let fuses = fuses(&helper);
    let part = generate(&PartitionConfig {
        content: content(256),
        block_size: 256,
        encryption: Some(encryption(KeySource::UsrKey0, None)),
        ..Default::default()
    });
    let mut soc = soc();
    soc.load_key(KeySlot::UserKey0, &RED_KEY).unwrap();
    let mut session = BootSession::new(None);
    let config = LoaderConfig {
        chunk_size: 128,
        ..Default::default()
    };
    let mut dest = vec![0u8; 256];
    let mut loader = PartitionLoader::new(&mut soc, &fuses, &mut session, config).unwrap();
    assert_eq!(
        loader.load_partition(&part.image, 0, &mut dest),
        Err(SecureBootError::LOADER_ENC_BLOCK_TOO_LARGE)
    );
}

#[test]
fn test_plain_partition_in_chunks() {
    let (helper, _) = provision_puf();
    let fuses = fuses(&helper);
    let data = content(1000);
    let part = generate(&PartitionConfig {
        content: data.clone(),
        ..Default::default()
    });
    let mut soc = soc();
    let mut session = BootSession::new(None);
    let config = LoaderConfig {
        chunk_size: 256,
        ..Default::default()
    };
    let mut dest = vec![0u8; 1024];
    let mut loader = PartitionLoader::new(&mut soc, &fuses, &mut session, config).unwrap();
    let info = loader.load_partition(&part.image, 0, &mut dest).unwrap();
    assert_eq!(info.block_count, 4);
    assert!(!info.authenticated && !info.encrypted);
    assert_eq!(info.digest, None);
    assert_eq!(&dest[..1000], &data[..]);
    assert_eq!(soc.sha3().bytes_hashed(), 0);
}

#[test]
fn test_secure_state_policy() {
    let (helper, _) = provision_puf();
    let signed = generate(&PartitionConfig {
        content: content(32),
        cert: Some(cert_keys(0)),
        ..Default::default()
    });
    let unsigned = generate(&PartitionConfig {
        content: content(32),
        ..Default::default()
    });
    let mut fuses = fuses(&helper);
    program_ppk(&mut fuses, &signed);

    let mut soc = soc();
    let mut session = BootSession::new(None);
    let mut dest = vec![0u8; 32];
    assert_eq!(
        load(&mut soc, &fuses, &mut session, &unsigned.image, &mut dest),
        Err(SecureBootError::LOADER_AUTH_COMPULSORY)
    );

    fuses.set_sec_ctrl(SecurityControl::DEC_ONLY_1);
    assert_eq!(
        load(&mut soc, &fuses, &mut session, &signed.image, &mut dest),
        Err(SecureBootError::LOADER_ENC_COMPULSORY)
    );
}

#[test]
fn test_revocation() {
    let (helper, _) = provision_puf();
    let mut enc = encryption(KeySource::UsrKey0, None);
    enc.enc_revoke_id = 40;
    let part = generate(&PartitionConfig {
        content: content(32),
        block_size: 32,
        cert: Some(cert_keys(7)),
        encryption: Some(enc),
        ..Default::default()
    });

    let mut fuses = fuses(&helper);
    program_ppk(&mut fuses, &part);
    let mut soc = soc();
    soc.load_key(KeySlot::UserKey0, &RED_KEY).unwrap();
    let mut session = BootSession::new(None);
    let mut dest = vec![0u8; 32];
    assert!(load(&mut soc, &fuses, &mut session, &part.image, &mut dest).is_ok());

    let mut revoked = fuses.clone();
    revoked.revocation_mut().revoke(7).unwrap();
    assert_eq!(
        load(&mut soc, &revoked, &mut session, &part.image, &mut dest),
        Err(SecureBootError::IMAGE_VERIFIER_ERR_ID_REVOKED)
    );

    let mut revoked = fuses.clone();
    revoked.revocation_mut().revoke(40).unwrap();
    assert_eq!(
        load(&mut soc, &revoked, &mut session, &part.image, &mut dest),
        Err(SecureBootError::IMAGE_VERIFIER_ERR_ID_REVOKED)
    );
}

#[test]
fn test_invalid_loader_config() {
    let (helper, _) = provision_puf();
    let fuses = fuses(&helper);
    let mut soc = soc();
    let mut session = BootSession::new(None);
    let config = LoaderConfig {
        chunk_size: 100,
        ..Default::default()
    };
    assert!(matches!(
        PartitionLoader::new(&mut soc, &fuses, &mut session, config),
        Err(SecureBootError::LOADER_INVALID_CHUNK_SIZE)
    ));
}

#[test]
fn test_hash_engine_scrubbed_after_failed_load() {
    let (helper, _) = provision_puf();
    let mut part = generate(&PartitionConfig {
        content: content(128),
        block_size: 64,
        cert: Some(cert_keys(0)),
        encryption: Some(encryption(KeySource::UsrKey0, None)),
        ..Default::default()
    });
    let mut fuses = fuses(&helper);
    program_ppk(&mut fuses, &part);
    // Second block, after the first one went through the digest
    let offset = part.header.data_offset as usize + 64 + 64 + 64 + 10;
    part.image[offset] ^= 0x80;

    let mut soc = soc();
    soc.load_key(KeySlot::UserKey0, &RED_KEY).unwrap();
    let mut session = BootSession::new(None);
    let mut dest = vec![0u8; 128];
    assert_eq!(
        load(&mut soc, &fuses, &mut session, &part.image, &mut dest),
        Err(SecureBootError::LOADER_AEAD_TAG_MISMATCH)
    );
    assert!(soc.sha3().is_zeroized());
    assert_eq!(
        soc.sha3_384_finalize(),
        Err(SecureBootError::DRIVER_SHA3_INVALID_STATE)
    );
}

#[test]
fn test_hash_engine_scrubbed_after_successful_load() {
    let (helper, _) = provision_puf();
    let data = content(64);
    let part = generate(&PartitionConfig {
        content: data.clone(),
        cert: Some(cert_keys(0)),
        ..Default::default()
    });
    let mut fuses = fuses(&helper);
    program_ppk(&mut fuses, &part);

    let mut soc = soc();
    let mut session = BootSession::new(None);
    let mut dest = vec![0u8; 64];
    let info = load(&mut soc, &fuses, &mut session, &part.image, &mut dest).unwrap();
    assert!(info.digest.is_some());
    assert_eq!(dest, data);
    assert!(soc.sha3().is_zeroized());

    // An engine that cannot be scrubbed withholds the partition.
    soc.sha3_mut().set_zeroize_stuck(true);
    let mut dest = vec![0u8; 64];
    assert_eq!(
        load(&mut soc, &fuses, &mut session, &part.image, &mut dest),
        Err(SecureBootError::LOADER_SEC_BUF_CLEAR_ERR)
    );
    assert!(dest.iter().all(|b| *b == 0));
}

#[test]
fn test_id_clear_timeout_keeps_earlier_red_keys() {
    let (helper, kek) = provision_puf();
    let fuses = fuses(&helper);
    let efuse_data = content(64);
    let efuse_part = generate(&PartitionConfig {
        content: efuse_data.clone(),
        block_size: 32,
        encryption: Some(encryption(KeySource::EfuseBlkKey, Some(kek))),
        ..Default::default()
    });
    let usr_part = generate(&PartitionConfig {
        content: content(32),
        block_size: 32,
        encryption: Some(encryption(KeySource::EfuseUsrBlkKey0, Some(kek))),
        ..Default::default()
    });

    let mut soc = soc();
    soc.load_key(KeySlot::EfuseKey, &efuse_part.black_key.unwrap())
        .unwrap();
    soc.load_key(KeySlot::EfuseUserKey0, &usr_part.black_key.unwrap())
        .unwrap();
    let mut session = BootSession::new(None);
    let mut dest = vec![0u8; 64];
    load(&mut soc, &fuses, &mut session, &efuse_part.image, &mut dest).unwrap();
    assert_eq!(session.availability(), DecKeyAvailability::EFUSE_RED);

    soc.puf_mut().set_faults(EmuPufFaults {
        never_clear_id: true,
        ..Default::default()
    });
    let mut usr_dest = vec![0u8; 32];
    assert_eq!(
        load(&mut soc, &fuses, &mut session, &usr_part.image, &mut usr_dest),
        Err(SecureBootError::DRIVER_PUF_ID_CLEAR_TIMEOUT)
    );
    assert!(!session
        .availability()
        .contains(DecKeyAvailability::EFUSE_USR0_RED));
    assert_eq!(
        KeySourceResolver::resolve(KeySource::EfuseUsrBlkKey0, session.availability()),
        Err(SecureBootError::KEY_SOURCE_INVALID)
    );

    // The red key derived before the fault still decrypts.
    assert!(KeySourceResolver::resolve(KeySource::EfuseBlkKey, session.availability()).is_ok());
    assert_eq!(soc.aes().slot(KeySlot::EfuseRedKey), Some(&RED_KEY));
    let regen_commands = soc.puf().regen_commands();
    let mut dest = vec![0u8; 64];
    load(&mut soc, &fuses, &mut session, &efuse_part.image, &mut dest).unwrap();
    assert_eq!(dest, efuse_data);
    assert_eq!(soc.puf().regen_commands(), regen_commands);
}
