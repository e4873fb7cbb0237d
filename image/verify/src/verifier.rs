/*++

Licensed under the Apache-2.0 license.

File Name:

    verifier.rs

Abstract:

    This file is the main implementation of the authentication certificate verifier.

--*/

use crate::*;
use secboot_cfi_lib::{cfi_assert, cfi_assert_eq_8_words, cfi_ct_eq_words, cfi_launder};

/// Errors raised by a failed signature check, chosen by scheme
#[derive(Copy, Clone)]
struct SigErrors {
    rsa: SecureBootError,
    ecdsa: SecureBootError,
}

const SPK_SIG_ERRORS: SigErrors = SigErrors {
    rsa: SecureBootError::IMAGE_VERIFIER_ERR_SPK_RSA_AUTH_FAIL,
    ecdsa: SecureBootError::IMAGE_VERIFIER_ERR_SPK_ECDSA_AUTH_FAIL,
};

const PARTITION_SIG_ERRORS: SigErrors = SigErrors {
    rsa: SecureBootError::IMAGE_VERIFIER_ERR_PARTITION_RSA_AUTH_FAIL,
    ecdsa: SecureBootError::IMAGE_VERIFIER_ERR_PARTITION_ECDSA_AUTH_FAIL,
};

const HEADER_SIG_ERRORS: SigErrors = SigErrors {
    rsa: SecureBootError::IMAGE_VERIFIER_ERR_HEADER_RSA_AUTH_FAIL,
    ecdsa: SecureBootError::IMAGE_VERIFIER_ERR_HEADER_ECDSA_AUTH_FAIL,
};

impl SigErrors {
    fn for_scheme(&self, scheme: SignatureScheme) -> SecureBootError {
        if scheme.is_rsa() {
            self.rsa
        } else {
            self.ecdsa
        }
    }
}

/// Authentication Certificate Verifier
pub struct AuthCertVerifier<'a, Env: AuthCertVerificationEnv + ?Sized> {
    /// Verification Environment
    env: &'a mut Env,

    /// Fuses holding the PPK hashes and their invalid bits
    fuses: &'a FuseBank,
}

impl<'a, Env: AuthCertVerificationEnv + ?Sized> AuthCertVerifier<'a, Env> {
    /// Create a new instance `AuthCertVerifier`
    ///
    /// # Arguments
    ///
    /// * `env` - Environment
    /// * `fuses` - Fuse bank
    pub fn new(env: &'a mut Env, fuses: &'a FuseBank) -> Self {
        Self { env, fuses }
    }

    /// Verify a certificate and the partition signature it carries
    ///
    /// # Arguments
    ///
    /// * `cert` - Structurally checked certificate
    /// * `revocation` - Burned revocation ids
    /// * `digest` - Partition digest covered by the partition signature
    ///
    /// # Returns
    ///
    /// * `VerifiedChain` - Chain with the trusted SPK
    pub fn verify<'c>(
        &mut self,
        cert: &AuthCertificate<'c>,
        revocation: &RevocationState,
        digest: &Array4x12,
    ) -> SecureBootResult<VerifiedChain<'c>> {
        let chain = self.verify_chain(cert, revocation)?;
        self.verify_partition_signature(&chain, digest)
    }

    /// Walk PPK to SPK and check the SPK revocation id
    ///
    /// Gates run in a fixed order and the first failure ends the walk:
    /// PPK selection, SPK signature, revocation.
    ///
    /// # Arguments
    ///
    /// * `cert` - Structurally checked certificate
    /// * `revocation` - Burned revocation ids
    ///
    /// # Returns
    ///
    /// * `TrustedChain` - Chain with the authenticated SPK
    pub fn verify_chain<'c>(
        &mut self,
        cert: &AuthCertificate<'c>,
        revocation: &RevocationState,
    ) -> SecureBootResult<TrustedChain<'c>> {
        let ppk_slot = self.verify_ppk(cert)?;

        let spk = self.verify_spk(cert)?;

        let spk_id = cert.spk_id();
        revocation.check(spk_id)?;

        cprintln!(
            "[auth] SPK trusted, PPK slot {}, id {}",
            ppk_slot as u32,
            spk_id
        );

        Ok(TrustedChain {
            cert: *cert,
            ppk_slot,
            spk,
            spk_id,
        })
    }

    /// Verify the partition signature against the trusted SPK
    pub fn verify_partition_signature<'c>(
        &mut self,
        chain: &TrustedChain<'c>,
        digest: &Array4x12,
    ) -> SecureBootResult<VerifiedChain<'c>> {
        let sig = chain.cert.partition_signature();
        self.verify_sig(
            chain.cert.scheme(),
            digest,
            &chain.spk,
            &sig,
            PARTITION_SIG_ERRORS,
        )?;

        Ok(VerifiedChain {
            chain: *chain,
            digest: *digest,
        })
    }

    /// Verify a boot header or image header table signature with the trusted SPK
    pub fn verify_header_signature(
        &mut self,
        chain: &TrustedChain,
        digest: &Array4x12,
        sig: &Signature,
    ) -> SecureBootResult<()> {
        self.verify_sig(
            chain.cert.scheme(),
            digest,
            &chain.spk,
            sig,
            HEADER_SIG_ERRORS,
        )
    }

    /// Select the fused PPK slot matching the certificate PPK
    fn verify_ppk(&mut self, cert: &AuthCertificate) -> SecureBootResult<PpkSlot> {
        if self.fuses.all_ppk_invalid() {
            Err(SecureBootError::IMAGE_VERIFIER_ERR_ALL_PPK_REVOKED)?;
        }

        if cert.ppk().is_none() {
            Err(SecureBootError::IMAGE_VERIFIER_ERR_PPK_KEY_INVALID)?;
        }

        let actual = self
            .env
            .sha3_384_digest(cert.ppk_block())
            .map_err(|_| SecureBootError::IMAGE_VERIFIER_ERR_PPK_HASH_FAIL)?
            .upper_256();

        let mut any_usable = false;
        let mut matched = None;
        for slot in PpkSlot::ALL {
            let expected = self.fuses.ppk_hash(slot);
            if expected.is_zero() || self.fuses.ppk_invalid(slot) {
                continue;
            }
            any_usable = true;
            if cfi_ct_eq_words(&expected.0, &actual.0) {
                matched = Some(slot);
                break;
            }
        }

        if !any_usable {
            Err(SecureBootError::IMAGE_VERIFIER_ERR_ALL_PPK_INVALID)?;
        }

        let slot = matched.ok_or(SecureBootError::IMAGE_VERIFIER_ERR_PPK_HASH_FAIL)?;
        cfi_assert_eq_8_words(&cfi_launder(self.fuses.ppk_hash(slot)).0, &actual.0);

        Ok(slot)
    }

    /// Authenticate the SPK block with the PPK
    fn verify_spk<'c>(&mut self, cert: &AuthCertificate<'c>) -> SecureBootResult<PublicKey<'c>> {
        let ppk = cert
            .ppk()
            .ok_or(SecureBootError::IMAGE_VERIFIER_ERR_PPK_KEY_INVALID)?;
        let spk = cert
            .spk()
            .ok_or(SecureBootError::IMAGE_VERIFIER_ERR_SPK_KEY_INVALID)?;

        let digest = self
            .spk_digest(cert)
            .map_err(|_| SecureBootError::IMAGE_VERIFIER_ERR_SPK_HASH_FAIL)?;

        let sig = cert.spk_signature();
        self.verify_sig(cert.scheme(), &digest, &ppk, &sig, SPK_SIG_ERRORS)?;

        Ok(spk)
    }

    /// SHA3-384 over the certificate header then the SPK block
    fn spk_digest(&mut self, cert: &AuthCertificate) -> SecureBootResult<Array4x12> {
        self.env.sha3_384_init()?;
        self.env.sha3_384_update(cert.header_bytes())?;
        self.env.sha3_384_update(cert.spk_block())?;
        self.env.sha3_384_finalize()
    }

    fn verify_sig(
        &mut self,
        scheme: SignatureScheme,
        digest: &Array4x12,
        pub_key: &PublicKey,
        sig: &Signature,
        errors: SigErrors,
    ) -> SecureBootResult<()> {
        let err = errors.for_scheme(scheme);

        let result = match (pub_key, sig) {
            (PublicKey::Rsa4096(key), Signature::Rsa4096(sig)) => {
                self.env.rsa4096_verify(digest, key, sig)
            }
            (PublicKey::EcdsaP384(key), Signature::EcdsaP384(sig)) => {
                self.env.ecdsa_verify(EccCurve::P384, digest, key, sig)
            }
            (PublicKey::EcdsaP521(key), Signature::EcdsaP521(sig)) => {
                self.env.ecdsa_verify(EccCurve::P521, digest, key, sig)
            }
            _ => Err(err),
        }
        .map_err(|_| err)?;

        if !cfi_launder(result) {
            Err(err)?;
        } else {
            cfi_assert!(result);
        }

        Ok(())
    }
}
