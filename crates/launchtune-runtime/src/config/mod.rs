/// Autotune config module.
pub mod autotune;

mod base;
mod logger;

pub use base::*;
pub use logger::*;
