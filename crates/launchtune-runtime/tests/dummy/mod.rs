mod kernels;
mod stream;

pub use kernels::*;
pub use stream::*;

use std::path::PathBuf;

use launchtune_runtime::{
    config::autotune::{AutotuneCache, AutotuneConfig},
    tune::{LaunchDim, TuneContext, Tuner},
    ArchVersion, DeviceProperties, ResidentBlocks,
};

/// A device with 4 multiprocessors, so grids are tuned from 1 to 8 blocks.
pub fn test_device() -> DeviceProperties {
    DeviceProperties {
        name: String::from("dummy"),
        arch: ArchVersion::new(7, 0),
        max_block_dim: LaunchDim::new_3d(1024, 1024, 64),
        max_grid_dim: LaunchDim::new_3d(2147483647, 65535, 65535),
        max_threads_per_block: 1024,
        max_shared_memory_per_block: 48 * 1024,
        warp_size: 32,
        multiprocessor_count: 4,
        max_threads_per_multiprocessor: 2048,
        resident_blocks: ResidentBlocks::default(),
    }
}

pub fn test_context() -> TuneContext {
    TuneContext::with_block_threshold(test_device(), None).unwrap()
}

/// An empty directory unique to the test.
pub fn scratch_dir(test: &str) -> PathBuf {
    let dir = std::env::temp_dir()
        .join("launchtune-integration")
        .join(format!("{test}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// A configuration persisting into a scratch directory.
pub fn test_config(test: &str) -> AutotuneConfig {
    AutotuneConfig {
        cache: AutotuneCache::File(scratch_dir(test)),
        ..Default::default()
    }
}

pub fn test_tuner(test: &str) -> Tuner {
    Tuner::from_config(test, &test_config(test))
}
