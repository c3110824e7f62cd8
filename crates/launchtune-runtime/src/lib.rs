#![warn(missing_docs)]

//! Launchtune runtime crate: searches the launch configuration space of tunable kernels and
//! remembers the fastest configuration per kernel instantiation.

#[macro_use]
extern crate derive_new;

/// Configuration module.
pub mod config;

/// Autotune module.
pub mod tune;

mod device;
mod validation;

pub use device::*;
pub use validation::*;

pub use launchtune_common::backtrace::BackTrace;
