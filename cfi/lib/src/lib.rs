/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

--*/

#![cfg_attr(not(test), no_std)]
extern crate core;

mod cfi;

pub use cfi::*;
