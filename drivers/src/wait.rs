/*++

Licensed under the Apache-2.0 license.

File Name:

    wait.rs

Abstract:

    File contains common functions and macros to implement wait routines.

--*/

use secboot_error::{SecureBootError, SecureBootResult};

/// Poll `predicate` until it holds or `timeout` polls have elapsed
///
/// A timeout is final: the caller decides whether the operation is retried.
///
/// # Arguments
///
/// * `predicate` - Status check, usually a register bit test
/// * `timeout`   - Maximum number of polls
/// * `err`       - Error returned on timeout
pub fn poll_until<F>(mut predicate: F, timeout: u32, err: SecureBootError) -> SecureBootResult<()>
where
    F: FnMut() -> bool,
{
    for _ in 0..timeout {
        if predicate() {
            return Ok(());
        }
        core::hint::spin_loop();
    }
    Err(err)
}
