/*++

Licensed under the Apache-2.0 license.

File Name:

    sha3.rs

Abstract:

    File contains the SHA3-384 engine interface.

--*/

use crate::Array4x12;
use secboot_error::SecureBootResult;

/// SHA3-384 engine
///
/// One digest operation is active at a time: `sha3_384_init` discards any
/// operation in progress.
pub trait Sha3 {
    fn sha3_384_init(&mut self) -> SecureBootResult<()>;

    fn sha3_384_update(&mut self, data: &[u8]) -> SecureBootResult<()>;

    fn sha3_384_finalize(&mut self) -> SecureBootResult<Array4x12>;

    /// Abort any operation in progress and clear the engine's state and
    /// digest registers
    fn sha3_384_zeroize(&mut self) -> SecureBootResult<()>;

    /// Calculate the digest of `data` in one operation
    fn sha3_384_digest(&mut self, data: &[u8]) -> SecureBootResult<Array4x12> {
        self.sha3_384_init()?;
        self.sha3_384_update(data)?;
        self.sha3_384_finalize()
    }
}
