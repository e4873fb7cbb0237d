/*++

Licensed under the Apache-2.0 license.

File Name:

    policy.rs

Abstract:

    File contains the secure state checks applied to every partition.

--*/

use secboot_cfi_lib::cfi_launder;
use secboot_drivers::FuseBank;
use secboot_error::{SecureBootError, SecureBootResult};
use secboot_image_types::{KeySource, PartitionHeader};

/// Requirements derived from the eFuse secure state
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SecureStatePolicy {
    /// A PPK hash is programmed
    pub auth_compulsory: bool,

    /// Decrypt only mode, either redundant bit
    pub enc_compulsory: bool,
}

impl SecureStatePolicy {
    pub fn from_fuses(fuses: &FuseBank) -> Self {
        Self {
            auth_compulsory: fuses.any_ppk_programmed(),
            enc_compulsory: fuses.dec_only(),
        }
    }

    /// Check a partition header against the secure state
    pub fn check(&self, header: &PartitionHeader) -> SecureBootResult<()> {
        if cfi_launder(self.auth_compulsory) && !header.is_authenticated() {
            return Err(SecureBootError::LOADER_AUTH_COMPULSORY);
        }

        if cfi_launder(self.enc_compulsory) {
            match header.key_source {
                None => return Err(SecureBootError::LOADER_ENC_COMPULSORY),
                Some(KeySource::EfuseBlkKey) => {}
                Some(_) => return Err(SecureBootError::LOADER_DEC_ONLY_KEY_SOURCE),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secboot_drivers::{Array4x8, PpkSlot, SecurityControl};
    use secboot_image_types::PartitionAttributes;

    fn header(key_source: Option<KeySource>, auth_cert_offset: u32) -> PartitionHeader {
        PartitionHeader {
            data_offset: 0x1000,
            stored_len: 64,
            plain_len: 0,
            attributes: PartitionAttributes::default(),
            key_source,
            iv: [0; 12],
            kek_iv: [0; 12],
            enc_revoke_id: 0,
            auth_cert_offset,
        }
    }

    #[test]
    fn test_open_device_accepts_anything() {
        let policy = SecureStatePolicy::from_fuses(&FuseBank::default());
        assert_eq!(policy.check(&header(None, 0)), Ok(()));
        assert_eq!(policy.check(&header(Some(KeySource::UsrKey3), 0)), Ok(()));
    }

    #[test]
    fn test_programmed_ppk_requires_auth() {
        let mut fuses = FuseBank::default();
        fuses.set_ppk_hash(PpkSlot::Ppk2, Array4x8([1; 8]));
        let policy = SecureStatePolicy::from_fuses(&fuses);
        assert_eq!(
            policy.check(&header(None, 0)),
            Err(SecureBootError::LOADER_AUTH_COMPULSORY)
        );
        assert_eq!(policy.check(&header(None, 0x40)), Ok(()));
    }

    #[test]
    fn test_dec_only_either_bit() {
        for bit in [SecurityControl::DEC_ONLY_0, SecurityControl::DEC_ONLY_1] {
            let mut fuses = FuseBank::default();
            fuses.set_sec_ctrl(bit);
            let policy = SecureStatePolicy::from_fuses(&fuses);
            assert_eq!(
                policy.check(&header(None, 0)),
                Err(SecureBootError::LOADER_ENC_COMPULSORY)
            );
            assert_eq!(
                policy.check(&header(Some(KeySource::EfuseKey), 0)),
                Err(SecureBootError::LOADER_DEC_ONLY_KEY_SOURCE)
            );
            assert_eq!(
                policy.check(&header(Some(KeySource::BhBlkKey), 0)),
                Err(SecureBootError::LOADER_DEC_ONLY_KEY_SOURCE)
            );
            assert_eq!(policy.check(&header(Some(KeySource::EfuseBlkKey), 0)), Ok(()));
        }
    }
}
