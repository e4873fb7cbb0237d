/*++

Licensed under the Apache-2.0 license.

File Name:

    cfi.rs

Abstract:

    File contains CFI launder, hardened comparison and redundant assertion
    implementation.

References:
    https://github.com/lowRISC/opentitan/blob/7a61300cf7c409fa68fd892942c1d7b58a7cd4c0/sw/device/lib/base/hardened.h#L260

--*/

use secboot_error::SecureBootError;

use core::cfg;
use core::cmp::PartialEq;
use core::marker::Copy;

/// CFI Panic Information
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum CfiPanicInfo {
    /// CFI Assert Equal failed
    AssertEqFail,
}

impl From<CfiPanicInfo> for SecureBootError {
    /// Converts to this type from the input type.
    fn from(info: CfiPanicInfo) -> SecureBootError {
        match info {
            CfiPanicInfo::AssertEqFail => SecureBootError::CFI_PANIC_ASSERT_EQ_FAILURE,
        }
    }
}

/// Launder the value to prevent compiler optimization
///
/// # Arguments
///
/// * `val` - Value to launder
///
/// # Returns
///
/// `T` - Same value
pub fn cfi_launder<T>(val: T) -> T {
    if cfg!(feature = "cfi") {
        core::hint::black_box(val)
    } else {
        val
    }
}

/// Compare two word slices without an early exit
///
/// Every word is visited regardless of where the first difference is, and
/// slices of different lengths never compare equal.
///
/// # Arguments
///
/// * `a` - Left hand side
/// * `b` - Right hand side
///
/// # Returns
///
/// `bool` - True if both slices hold the same words
#[inline(never)]
pub fn cfi_ct_eq_words(a: &[u32], b: &[u32]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let diff = a
        .iter()
        .zip(b.iter())
        .fold(0u32, |acc, (x, y)| acc | (cfi_launder(*x) ^ cfi_launder(*y)));
    cfi_launder(diff) == 0
}

/// Control flow integrity panic
///
/// This panic is raised when the control flow integrity error is detected
///
/// # Arguments
///
/// * `info` - Panic information
///
/// # Returns
///
/// `!` - Never returns
#[inline(never)]
pub fn cfi_panic(info: CfiPanicInfo) -> ! {
    // Prevent the compiler from optimizing the reason
    let _ = cfi_launder(info);

    #[cfg(feature = "cfi")]
    {
        #[cfg(feature = "cfi-test")]
        {
            panic!("CFI Panic = {:04x?}", info);
        }

        #[cfg(not(feature = "cfi-test"))]
        {
            extern "C" {
                fn cfi_panic_handler(code: u32) -> !;
            }
            unsafe {
                cfi_panic_handler(SecureBootError::from(info).into());
            }
        }
    }

    #[cfg(not(feature = "cfi"))]
    {
        unimplemented!()
    }
}

macro_rules! cfi_assert_macro {
    ($name: ident, $op: tt, $trait1: path, $trait2: path, $panic_info: ident) => {
        /// CFI Binary Condition Assertion
        ///
        /// # Arguments
        ///
        /// `a` - Left hand side
        /// `b` - Right hand side
        #[inline(always)]
        #[allow(unused)]
        pub fn $name<T>(lhs: T, rhs: T)
        where
            T: $trait1 + $trait2,
        {
            if cfg!(feature = "cfi") {
                if !(lhs $op rhs) {
                    cfi_panic(CfiPanicInfo::$panic_info);
                }

                // Second check for glitch protection
                if !(cfi_launder(lhs) $op cfi_launder(rhs)) {
                    cfi_panic(CfiPanicInfo::$panic_info);
                }

            } else {
                lhs $op rhs;
            }
        }
    };
}

cfi_assert_macro!(cfi_assert_eq, ==, Copy, PartialEq, AssertEqFail);

#[macro_export]
macro_rules! cfi_assert {
    ($cond: expr) => {
        $crate::cfi_assert_eq($cond, true)
    };
}

pub fn cfi_assert_eq_8_words(a: &[u32; 8], b: &[u32; 8]) {
    if cfg!(feature = "cfi") && !cfi_ct_eq_words(a, b) {
        cfi_panic(CfiPanicInfo::AssertEqFail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ct_eq_words() {
        assert!(cfi_ct_eq_words(&[1, 2, 3], &[1, 2, 3]));
        assert!(!cfi_ct_eq_words(&[1, 2, 3], &[1, 2, 4]));
        assert!(!cfi_ct_eq_words(&[0x8000_0000, 2], &[0, 2]));
        assert!(!cfi_ct_eq_words(&[1, 2], &[1, 2, 3]));
        assert!(cfi_ct_eq_words(&[], &[]));
    }

    #[test]
    fn test_launder_is_identity() {
        assert_eq!(cfi_launder(0xA5C3_C5A3u32), 0xA5C3_C5A3);
        assert_eq!(cfi_launder([7u8; 4]), [7u8; 4]);
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum KeyTag {
        Red,
    }

    #[test]
    fn test_asserts_pass_on_holding_condition() {
        cfi_assert_eq(3u32, 3u32);
        cfi_assert_eq(KeyTag::Red, KeyTag::Red);
        cfi_assert!(true);
        cfi_assert_eq_8_words(&[5; 8], &[5; 8]);
    }

    #[test]
    fn test_panic_info_maps_to_cfi_component() {
        let err = SecureBootError::from(CfiPanicInfo::AssertEqFail);
        assert_eq!(err, SecureBootError::CFI_PANIC_ASSERT_EQ_FAILURE);
        assert_eq!(err.component(), 0x0006);
    }
}
