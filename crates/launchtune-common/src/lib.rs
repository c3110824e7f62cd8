#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

//! Common utilities shared by the launchtune crates.

extern crate alloc;

#[macro_use]
extern crate derive_new;

/// Backtrace capture for error reporting.
pub mod backtrace;

/// Exclusive lock files guarding files shared between processes.
#[cfg(feature = "std")]
pub mod lock_file;
