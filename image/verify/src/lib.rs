/*++

Licensed under the Apache-2.0 license.

File Name:

   lib.rs

Abstract:

    Authentication certificate verification library.

--*/
#![cfg_attr(not(feature = "std"), no_std)]

mod verifier;

use secboot_drivers::*;
use secboot_image_types::*;

pub use verifier::AuthCertVerifier;

/// Elliptic curve named by the authentication header
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum EccCurve {
    P384,
    P521,
}

/// Certificate whose SPK has been authenticated by a fused PPK
#[derive(Debug, Copy, Clone)]
pub struct TrustedChain<'a> {
    /// Certificate the chain was walked on
    pub cert: AuthCertificate<'a>,

    /// PPK slot that anchored the chain
    pub ppk_slot: PpkSlot,

    /// Trusted secondary public key
    pub spk: PublicKey<'a>,

    /// Revocation id bound into the SPK block
    pub spk_id: u32,
}

/// Chain whose partition signature has been verified as well
#[derive(Debug, Copy, Clone)]
pub struct VerifiedChain<'a> {
    pub chain: TrustedChain<'a>,

    /// Digest covered by the partition signature
    pub digest: Array4x12,
}

/// Certificate Verification Environment
pub trait AuthCertVerificationEnv: Sha3 {
    /// Perform RSA-4096 signature verification
    fn rsa4096_verify(
        &mut self,
        digest: &Array4x12,
        pub_key: &RsaPubKey,
        sig: &[u8; RSA4096_BYTE_SIZE],
    ) -> SecureBootResult<bool>;

    /// Perform ECDSA verification over the curve named by `curve`
    fn ecdsa_verify(
        &mut self,
        curve: EccCurve,
        digest: &Array4x12,
        pub_key: &EccPubKey,
        sig: &EccSignature,
    ) -> SecureBootResult<bool>;
}
