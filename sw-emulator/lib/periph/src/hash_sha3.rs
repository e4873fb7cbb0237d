/*++

Licensed under the Apache-2.0 license.

File Name:

    hash_sha3.rs

Abstract:

    File contains the SHA3-384 engine of the emulated SoC.

--*/

use secboot_drivers::{Array4x12, Sha3};
use secboot_emu_crypto::Sha3_384;
use secboot_error::{SecureBootError, SecureBootResult};

/// SHA3-384 engine
#[derive(Default)]
pub struct HashSha3 {
    sha3: Sha3_384,

    /// Total bytes absorbed since power on
    bytes_hashed: usize,

    /// Zeroize requests are ignored and reported as failed
    zeroize_stuck: bool,
}

impl HashSha3 {
    pub fn bytes_hashed(&self) -> usize {
        self.bytes_hashed
    }

    /// True when no operation is in progress and the digest reads as zero
    pub fn is_zeroized(&self) -> bool {
        !self.sha3.has_hasher() && self.sha3.digest().iter().all(|b| *b == 0)
    }

    pub fn set_zeroize_stuck(&mut self, stuck: bool) {
        self.zeroize_stuck = stuck;
    }
}

impl Sha3 for HashSha3 {
    fn sha3_384_init(&mut self) -> SecureBootResult<()> {
        self.sha3.init();
        Ok(())
    }

    fn sha3_384_update(&mut self, data: &[u8]) -> SecureBootResult<()> {
        if !self.sha3.update(data) {
            return Err(SecureBootError::DRIVER_SHA3_INVALID_STATE);
        }
        self.bytes_hashed += data.len();
        Ok(())
    }

    fn sha3_384_finalize(&mut self) -> SecureBootResult<Array4x12> {
        if !self.sha3.finalize() {
            return Err(SecureBootError::DRIVER_SHA3_INVALID_STATE);
        }
        Ok(Array4x12::from(self.sha3.digest()))
    }

    fn sha3_384_zeroize(&mut self) -> SecureBootResult<()> {
        if self.zeroize_stuck {
            return Err(SecureBootError::DRIVER_SHA3_INVALID_STATE);
        }
        self.sha3.zeroize();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_streaming_matches_one_shot() {
        let mut sha = HashSha3::default();
        sha.sha3_384_init().unwrap();
        sha.sha3_384_update(b"secure").unwrap();
        sha.sha3_384_update(b" boot").unwrap();
        let digest = sha.sha3_384_finalize().unwrap();
        assert_eq!(digest, Array4x12::from(Sha3_384::hash(b"secure boot")));
        assert_eq!(sha.bytes_hashed(), 11);
        assert_eq!(sha.sha3_384_digest(b"secure boot"), Ok(digest));
    }

    #[test]
    fn test_zeroize_aborts_operation() {
        let mut sha = HashSha3::default();
        sha.sha3_384_init().unwrap();
        sha.sha3_384_update(b"partial").unwrap();
        assert!(!sha.is_zeroized());
        sha.sha3_384_zeroize().unwrap();
        assert!(sha.is_zeroized());
        assert_eq!(
            sha.sha3_384_finalize(),
            Err(SecureBootError::DRIVER_SHA3_INVALID_STATE)
        );

        sha.set_zeroize_stuck(true);
        sha.sha3_384_digest(b"abc").unwrap();
        assert_eq!(
            sha.sha3_384_zeroize(),
            Err(SecureBootError::DRIVER_SHA3_INVALID_STATE)
        );
        assert!(!sha.is_zeroized());
    }

    #[test]
    fn test_update_without_init() {
        let mut sha = HashSha3::default();
        assert_eq!(
            sha.sha3_384_update(b"abc"),
            Err(SecureBootError::DRIVER_SHA3_INVALID_STATE)
        );
        assert_eq!(
            sha.sha3_384_finalize(),
            Err(SecureBootError::DRIVER_SHA3_INVALID_STATE)
        );
    }
}
