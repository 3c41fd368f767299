//! Small value types shared between the module entry and the firmware interface crates.

#![no_std]

pub mod fmt;
pub mod mem;
