/*++

Licensed under the Apache-2.0 license.

File Name:

    ecc384.rs

Abstract:

    File contains implementation of ECDSA over the P-384 curve.

--*/

use p384::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p384::ecdsa::{Signature, SigningKey, VerifyingKey};
use p384::{EncodedPoint, FieldBytes};

/// ECC-384 coordinate size in bytes
pub const ECC_384_COORD_SIZE: usize = 48;

/// ECC-384 Coordinate
pub type Ecc384Scalar = [u8; ECC_384_COORD_SIZE];

/// ECC-384 Private Key
pub type Ecc384PrivKey = Ecc384Scalar;

/// ECC-384 Public Key
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Ecc384PubKey {
    /// X coordinate
    pub x: Ecc384Scalar,

    /// Y coordinate
    pub y: Ecc384Scalar,
}

impl Default for Ecc384PubKey {
    /// Returns the "default value" for a type.
    fn default() -> Self {
        Self {
            x: [0u8; ECC_384_COORD_SIZE],
            y: [0u8; ECC_384_COORD_SIZE],
        }
    }
}

impl From<&Ecc384PubKey> for EncodedPoint {
    /// Converts to this type from the input type.
    fn from(key: &Ecc384PubKey) -> Self {
        EncodedPoint::from_affine_coordinates(
            FieldBytes::from_slice(&key.x),
            FieldBytes::from_slice(&key.y),
            false,
        )
    }
}

/// ECC-384 Signature
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Ecc384Signature {
    /// Random point
    pub r: Ecc384Scalar,

    /// Proof
    pub s: Ecc384Scalar,
}

impl Default for Ecc384Signature {
    /// Returns the "default value" for a type.
    fn default() -> Self {
        Self {
            r: [0u8; ECC_384_COORD_SIZE],
            s: [0u8; ECC_384_COORD_SIZE],
        }
    }
}

impl From<Signature> for Ecc384Signature {
    /// Converts to this type from the input type.
    fn from(ecc_sig: Signature) -> Self {
        let (r, s) = ecc_sig.split_bytes();
        let mut sig = Self::default();
        sig.r.copy_from_slice(&r);
        sig.s.copy_from_slice(&s);
        sig
    }
}

pub enum Ecc384 {}

impl Ecc384 {
    /// Derive the public key of `priv_key`
    ///
    /// # Arguments
    ///
    /// * `priv_key` - Private key, big-endian scalar
    ///
    /// # Result
    ///
    /// *  Option<Ecc384PubKey> - None if `priv_key` is not a valid scalar
    pub fn pub_key(priv_key: &Ecc384PrivKey) -> Option<Ecc384PubKey> {
        let signing_key = SigningKey::from_slice(priv_key).ok()?;
        let point = signing_key.verifying_key().to_encoded_point(false);
        let mut pub_key = Ecc384PubKey::default();
        pub_key.x.copy_from_slice(point.x()?);
        pub_key.y.copy_from_slice(point.y()?);
        Some(pub_key)
    }

    /// Sign the hash with specified private key
    ///
    /// # Arguments
    ///
    /// * `priv_key` - Private key
    /// * `hash` - Hash to sign
    ///
    /// # Result
    ///
    /// *  Option<Ecc384Signature> - Deterministic signature
    pub fn sign(priv_key: &Ecc384PrivKey, hash: &Ecc384Scalar) -> Option<Ecc384Signature> {
        let signing_key = SigningKey::from_slice(priv_key).ok()?;
        let ecc_sig: Signature = signing_key.sign_prehash(hash).ok()?;
        Some(ecc_sig.into())
    }

    /// Verify the signature
    ///
    /// # Arguments
    ///
    /// * `pub_key` - Public key
    /// * `hash` - Signed hash
    /// * `signature` - Signature to verify
    ///
    /// # Result
    ///
    /// *  bool - True if the signature is valid. A key that is not on the
    ///    curve or a zero scalar is an invalid signature.
    pub fn verify(pub_key: &Ecc384PubKey, hash: &Ecc384Scalar, signature: &Ecc384Signature) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_encoded_point(&pub_key.into()) else {
            return false;
        };
        let Ok(sig) = Signature::from_scalars(
            FieldBytes::clone_from_slice(&signature.r),
            FieldBytes::clone_from_slice(&signature.s),
        ) else {
            return false;
        };
        verifying_key.verify_prehash(hash, &sig).is_ok()
    }
}
