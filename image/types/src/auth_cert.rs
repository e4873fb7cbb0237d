/*++

Licensed under the Apache-2.0 license.

File Name:

   auth_cert.rs

Abstract:

    File contains the authentication certificate layout and its decoder.

--*/

use core::ops::Range;

use bitfield::bitfield;
use memoffset::span_of;
use secboot_error::{SecureBootError, SecureBootResult};
use zerocopy::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

pub const AUTH_CERT_MARKER: u32 = 0x5443_4841;
pub const AUTH_CERT_USER_DATA_MAX_SIZE: usize = 48;
pub const PUB_KEY_BLOCK_SIZE: usize = 1040;
pub const SIGNATURE_BLOCK_SIZE: usize = 512;
pub const SPK_RESERVED_SIZE: usize = 12;
pub const RSA4096_BYTE_SIZE: usize = 512;
pub const ECC_P384_SCALAR_BYTE_SIZE: usize = 48;
pub const ECC_P521_SCALAR_BYTE_SIZE: usize = 66;
pub const AUTH_HDR_HASH_ALGO_SHA3: u32 = 2;
pub const AUTH_CERT_SIZE: usize = core::mem::size_of::<AuthCertificateRaw>();

bitfield! {
    /// Authentication header word
    #[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
    pub struct AuthHeader(u32);

    /// Hash algorithm used for every digest bound by this certificate
    pub hash_algo, set_hash_algo: 1, 0;

    /// Public key strength, selects the signature scheme
    pub pub_strength, set_pub_strength: 7, 4;
}

/// Signature scheme selected by the public strength field
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SignatureScheme {
    EcdsaP384,
    Rsa4096,
    EcdsaP521,
}

impl SignatureScheme {
    pub fn is_rsa(&self) -> bool {
        matches!(self, SignatureScheme::Rsa4096)
    }
}

impl From<SignatureScheme> for u32 {
    fn from(scheme: SignatureScheme) -> Self {
        match scheme {
            SignatureScheme::EcdsaP384 => 0,
            SignatureScheme::Rsa4096 => 1,
            SignatureScheme::EcdsaP521 => 2,
        }
    }
}

impl TryFrom<u32> for SignatureScheme {
    type Error = SecureBootError;

    fn try_from(val: u32) -> Result<Self, Self::Error> {
        match val {
            0 => Ok(SignatureScheme::EcdsaP384),
            1 => Ok(SignatureScheme::Rsa4096),
            2 => Ok(SignatureScheme::EcdsaP521),
            _ => Err(SecureBootError::IMAGE_VERIFIER_ERR_CERT_PUB_STRENGTH_INVALID),
        }
    }
}

#[repr(C)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned, Debug, Clone, Copy)]
pub struct AuthCertHeaderRaw {
    pub marker: U32,
    pub auth_header: U32,
    pub cert_size: U32,
    pub user_data_len: U32,
}

#[repr(C)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned, Debug, Clone, Copy)]
pub struct SpkBlockRaw {
    pub key: [u8; PUB_KEY_BLOCK_SIZE],
    pub spk_id: U32,
    pub reserved: [u8; SPK_RESERVED_SIZE],
}

/// Authentication certificate wire layout (little-endian)
#[repr(C)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned, Debug, Clone, Copy)]
pub struct AuthCertificateRaw {
    pub header: AuthCertHeaderRaw,
    pub user_data: [u8; AUTH_CERT_USER_DATA_MAX_SIZE],
    pub ppk: [u8; PUB_KEY_BLOCK_SIZE],
    pub spk: SpkBlockRaw,
    pub spk_signature: [u8; SIGNATURE_BLOCK_SIZE],
    pub bh_signature: [u8; SIGNATURE_BLOCK_SIZE],
    pub partition_signature: [u8; SIGNATURE_BLOCK_SIZE],
}

impl AuthCertificateRaw {
    /// Returns the `Range` containing the certificate header
    pub fn header_range() -> Range<usize> {
        span_of!(AuthCertificateRaw, header)
    }

    /// Returns the `Range` containing the PPK block
    pub fn ppk_range() -> Range<usize> {
        span_of!(AuthCertificateRaw, ppk)
    }

    /// Returns the `Range` containing the SPK block, id included
    pub fn spk_range() -> Range<usize> {
        span_of!(AuthCertificateRaw, spk)
    }

    /// Returns the `Range` of the partition signature
    pub fn partition_signature_range() -> Range<usize> {
        span_of!(AuthCertificateRaw, partition_signature)
    }

    /// Returns the `Range` of certificate bytes that open every partition digest
    pub fn partition_digest_prefix_range() -> Range<usize> {
        span_of!(AuthCertificateRaw, header..partition_signature)
    }
}

/// RSA-4096 public key
#[derive(Debug, Copy, Clone)]
pub struct RsaPubKey<'a> {
    pub modulus: &'a [u8; RSA4096_BYTE_SIZE],
    pub modulus_ext: &'a [u8; RSA4096_BYTE_SIZE],
    pub exponent: u32,
}

/// ECDSA public key; coordinate length follows the curve
#[derive(Debug, Copy, Clone)]
pub struct EccPubKey<'a> {
    pub x: &'a [u8],
    pub y: &'a [u8],
}

/// ECDSA signature; scalar length follows the curve
#[derive(Debug, Copy, Clone)]
pub struct EccSignature<'a> {
    pub r: &'a [u8],
    pub s: &'a [u8],
}

#[derive(Debug, Copy, Clone)]
pub enum PublicKey<'a> {
    Rsa4096(RsaPubKey<'a>),
    EcdsaP384(EccPubKey<'a>),
    EcdsaP521(EccPubKey<'a>),
}

#[derive(Debug, Copy, Clone)]
pub enum Signature<'a> {
    Rsa4096(&'a [u8; RSA4096_BYTE_SIZE]),
    EcdsaP384(EccSignature<'a>),
    EcdsaP521(EccSignature<'a>),
}

fn array_at<const N: usize>(bytes: &[u8], offset: usize) -> Option<&[u8; N]> {
    bytes.get(offset..offset.checked_add(N)?)?.try_into().ok()
}

fn ecc_coords(bytes: &[u8], len: usize) -> Option<(&[u8], &[u8])> {
    let a = bytes.get(..len)?;
    let b = bytes.get(len..len.checked_mul(2)?)?;
    Some((a, b))
}

impl<'a> PublicKey<'a> {
    /// Decode a padded public key block
    ///
    /// # Arguments
    ///
    /// * `scheme` - Scheme named by the authentication header
    /// * `block` - Public key block
    ///
    /// # Returns
    ///
    /// * `Option<PublicKey>` - None if the block cannot hold a key of this scheme
    pub fn decode(scheme: SignatureScheme, block: &'a [u8; PUB_KEY_BLOCK_SIZE]) -> Option<Self> {
        match scheme {
            SignatureScheme::Rsa4096 => {
                let modulus = array_at::<RSA4096_BYTE_SIZE>(block, 0)?;
                let modulus_ext = array_at::<RSA4096_BYTE_SIZE>(block, RSA4096_BYTE_SIZE)?;
                let exponent = u32::from_le_bytes(*array_at::<4>(block, 2 * RSA4096_BYTE_SIZE)?);
                if exponent == 0 || modulus.iter().all(|b| *b == 0) {
                    return None;
                }
                Some(PublicKey::Rsa4096(RsaPubKey {
                    modulus,
                    modulus_ext,
                    exponent,
                }))
            }
            SignatureScheme::EcdsaP384 | SignatureScheme::EcdsaP521 => {
                let len = match scheme {
                    SignatureScheme::EcdsaP384 => ECC_P384_SCALAR_BYTE_SIZE,
                    _ => ECC_P521_SCALAR_BYTE_SIZE,
                };
                let (x, y) = ecc_coords(block, len)?;
                if x.iter().chain(y.iter()).all(|b| *b == 0) {
                    return None;
                }
                let key = EccPubKey { x, y };
                Some(match scheme {
                    SignatureScheme::EcdsaP384 => PublicKey::EcdsaP384(key),
                    _ => PublicKey::EcdsaP521(key),
                })
            }
        }
    }
}

impl<'a> Signature<'a> {
    /// Decode a signature block
    pub fn decode(scheme: SignatureScheme, block: &'a [u8; SIGNATURE_BLOCK_SIZE]) -> Self {
        match scheme {
            SignatureScheme::Rsa4096 => Signature::Rsa4096(block),
            SignatureScheme::EcdsaP384 => {
                let (r, s) = block.split_at(ECC_P384_SCALAR_BYTE_SIZE);
                Signature::EcdsaP384(EccSignature {
                    r,
                    s: &s[..ECC_P384_SCALAR_BYTE_SIZE],
                })
            }
            SignatureScheme::EcdsaP521 => {
                let (r, s) = block.split_at(ECC_P521_SCALAR_BYTE_SIZE);
                Signature::EcdsaP521(EccSignature {
                    r,
                    s: &s[..ECC_P521_SCALAR_BYTE_SIZE],
                })
            }
        }
    }
}

/// Structurally validated authentication certificate
#[derive(Debug, Copy, Clone)]
pub struct AuthCertificate<'a> {
    raw: &'a AuthCertificateRaw,
    auth_header: AuthHeader,
    scheme: SignatureScheme,
}

impl<'a> AuthCertificate<'a> {
    /// Decode and bound-check a certificate
    ///
    /// Trailing bytes beyond the fixed layout are ignored; every embedded
    /// length field must match the fixed layout.
    ///
    /// # Arguments
    ///
    /// * `bytes` - Certificate bytes
    ///
    /// # Returns
    ///
    /// * `AuthCertificate` - Certificate view over `bytes`
    pub fn parse(bytes: &'a [u8]) -> SecureBootResult<Self> {
        let (raw, _) = AuthCertificateRaw::ref_from_prefix(bytes)
            .map_err(|_| SecureBootError::AUTH_CERT_TOO_SMALL)?;

        if raw.header.marker.get() != AUTH_CERT_MARKER {
            Err(SecureBootError::IMAGE_VERIFIER_ERR_CERT_MARKER_MISMATCH)?;
        }

        if raw.header.cert_size.get() as usize != AUTH_CERT_SIZE {
            Err(SecureBootError::IMAGE_VERIFIER_ERR_CERT_SIZE_MISMATCH)?;
        }

        if raw.header.user_data_len.get() as usize > AUTH_CERT_USER_DATA_MAX_SIZE {
            Err(SecureBootError::IMAGE_VERIFIER_ERR_CERT_USER_DATA_LEN_INVALID)?;
        }

        let auth_header = AuthHeader(raw.header.auth_header.get());
        if auth_header.hash_algo() != AUTH_HDR_HASH_ALGO_SHA3 {
            Err(SecureBootError::IMAGE_VERIFIER_ERR_CERT_HASH_ALGO_INVALID)?;
        }
        let scheme = SignatureScheme::try_from(auth_header.pub_strength())?;

        Ok(Self {
            raw,
            auth_header,
            scheme,
        })
    }

    pub fn raw(&self) -> &'a AuthCertificateRaw {
        self.raw
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.raw.as_bytes()
    }

    pub fn auth_header(&self) -> AuthHeader {
        self.auth_header
    }

    pub fn scheme(&self) -> SignatureScheme {
        self.scheme
    }

    pub fn user_data(&self) -> &'a [u8] {
        let len = self.raw.header.user_data_len.get() as usize;
        &self.raw.user_data[..len.min(AUTH_CERT_USER_DATA_MAX_SIZE)]
    }

    pub fn header_bytes(&self) -> &'a [u8] {
        self.raw.header.as_bytes()
    }

    pub fn ppk_block(&self) -> &'a [u8; PUB_KEY_BLOCK_SIZE] {
        &self.raw.ppk
    }

    /// SPK block bytes: key, revocation id and reserved words
    pub fn spk_block(&self) -> &'a [u8] {
        self.raw.spk.as_bytes()
    }

    pub fn spk_id(&self) -> u32 {
        self.raw.spk.spk_id.get()
    }

    pub fn ppk(&self) -> Option<PublicKey<'a>> {
        PublicKey::decode(self.scheme, &self.raw.ppk)
    }

    pub fn spk(&self) -> Option<PublicKey<'a>> {
        PublicKey::decode(self.scheme, &self.raw.spk.key)
    }

    pub fn spk_signature(&self) -> Signature<'a> {
        Signature::decode(self.scheme, &self.raw.spk_signature)
    }

    pub fn bh_signature(&self) -> Signature<'a> {
        Signature::decode(self.scheme, &self.raw.bh_signature)
    }

    pub fn partition_signature(&self) -> Signature<'a> {
        Signature::decode(self.scheme, &self.raw.partition_signature)
    }

    /// Certificate bytes preceding the partition signature
    pub fn partition_digest_prefix(&self) -> &'a [u8] {
        &self.as_bytes()[AuthCertificateRaw::partition_digest_prefix_range()]
    }
}
