/*++

Licensed under the Apache-2.0 license.

File Name:

    sha3.rs

Abstract:

    File contains implementation of the SHA3-384 hash.

--*/

use sha3::{Digest, Sha3_384 as Sha3_384Core};

pub const SHA3_384_DIGEST_SIZE: usize = 48;

/// SHA3-384
pub struct Sha3_384 {
    /// Hasher
    hasher: Option<Sha3_384Core>,

    /// Output digest
    digest: [u8; SHA3_384_DIGEST_SIZE],
}

impl Default for Sha3_384 {
    fn default() -> Self {
        Self::new()
    }
}

impl Sha3_384 {
    pub fn new() -> Self {
        Self {
            hasher: None,
            digest: [0u8; SHA3_384_DIGEST_SIZE],
        }
    }

    /// Start a new digest, discarding any operation in progress.
    pub fn init(&mut self) {
        self.hasher = Some(Sha3_384Core::new());
    }

    /// Write data to hasher.
    pub fn update(&mut self, data: &[u8]) -> bool {
        if let Some(hasher) = &mut self.hasher {
            hasher.update(data);
            return true;
        }

        false
    }

    /// Write hash to digest and end the operation.
    pub fn finalize(&mut self) -> bool {
        if let Some(hasher) = self.hasher.take() {
            self.digest.copy_from_slice(&hasher.finalize());
            return true;
        }

        false
    }

    /// Drop the operation in progress and clear the digest.
    pub fn zeroize(&mut self) {
        self.hasher = None;
        self.digest.fill(0);
    }

    pub fn digest(&self) -> [u8; SHA3_384_DIGEST_SIZE] {
        self.digest
    }

    pub fn has_hasher(&self) -> bool {
        self.hasher.is_some()
    }

    /// One-shot SHA3-384.
    pub fn hash(data: &[u8]) -> [u8; SHA3_384_DIGEST_SIZE] {
        let mut digest = [0u8; SHA3_384_DIGEST_SIZE];
        digest.copy_from_slice(&Sha3_384Core::digest(data));
        digest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha3_384_kat() {
        let expected = [
            0xec, 0x01, 0x49, 0x82, 0x88, 0x51, 0x6f, 0xc9, 0x26, 0x45, 0x9f, 0x58, 0xe2, 0xc6,
            0xad, 0x8d, 0xf9, 0xb4, 0x73, 0xcb, 0x0f, 0xc0, 0x8c, 0x25, 0x96, 0xda, 0x7c, 0xf0,
            0xe4, 0x9b, 0xe4, 0xb2, 0x98, 0xd8, 0x8c, 0xea, 0x92, 0x7a, 0xc7, 0xf5, 0x39, 0xf1,
            0xed, 0xf2, 0x28, 0x37, 0x6d, 0x25,
        ];

        let mut sha = Sha3_384::new();
        sha.init();
        assert!(sha.update(b"a"));
        assert!(sha.update(b"bc"));
        assert!(sha.finalize());
        assert_eq!(sha.digest(), expected);
        assert_eq!(Sha3_384::hash(b"abc"), expected);
    }

    #[test]
    fn test_unset_hasher() {
        let mut sha = Sha3_384::new();
        assert!(!sha.update(b"abc"));
        assert!(!sha.finalize());
        assert!(sha.digest().iter().all(|n| *n == 0));

        sha.init();
        assert!(sha.finalize());
        assert!(!sha.has_hasher());
    }

    #[test]
    fn test_zeroize() {
        let mut sha = Sha3_384::new();
        sha.init();
        assert!(sha.update(b"abc"));
        sha.zeroize();
        assert!(!sha.has_hasher());
        assert!(!sha.finalize());

        sha.init();
        assert!(sha.finalize());
        assert!(sha.digest().iter().any(|n| *n != 0));
        sha.zeroize();
        assert!(sha.digest().iter().all(|n| *n == 0));
    }
}
