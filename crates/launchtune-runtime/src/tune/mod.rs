mod context;
mod error;
mod key;
mod param;
mod stream;
mod tunable;
mod tune_benchmark;
mod tune_cache;
mod tuner;

/// Default traversal algorithms of the [Tunable] contract.
pub mod traversal;

/// Traversal strategies for common kernel launch shapes.
pub mod strategy;

pub use context::*;
pub use error::*;
pub use key::*;
pub use param::*;
pub use stream::*;
pub use tunable::*;
pub use tune_benchmark::*;
pub use tune_cache::*;
pub use tuner::*;
