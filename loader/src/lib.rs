/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the partition secure processing pipeline.

--*/

#![cfg_attr(not(feature = "std"), no_std)]

mod config;
mod context;
mod loader;
mod policy;
mod session;

pub use config::{LoaderConfig, LOADER_CHUNK_SIZE, LOADER_MAX_CHUNK_SIZE};
pub use context::SecureProcessingContext;
pub use loader::{PartitionInfo, PartitionLoader};
pub use policy::SecureStatePolicy;
pub use session::BootSession;

use secboot_drivers::{AesGcm, PufRegs};
use secboot_image_verify::AuthCertVerificationEnv;

/// Hardware needed to load a partition: SHA3 and signature engines for
/// authentication, the AES engine for decryption and the PUF for black keys
pub trait LoaderEnv: AuthCertVerificationEnv + AesGcm + PufRegs {}

impl<T: AuthCertVerificationEnv + AesGcm + PufRegs + ?Sized> LoaderEnv for T {}
