use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use launchtune_runtime::{
    aux_string, check_launch_param,
    tune::{LaunchError, TuneKey, TuneParam, Tunable},
    DeviceProperties,
};

use super::DummyStream;

/// A kernel whose simulated duration grows with the distance to an optimal configuration.
#[derive(Debug, Clone)]
pub struct CostModelKernel {
    key: TuneKey,
    optimal_block: (u32, u32),
    optimal_grid: u32,
    max_launchable_block: Option<u32>,
    shared_per_block: u32,
    device: Option<DeviceProperties>,
    trials: Arc<AtomicUsize>,
    post_tunes: Arc<AtomicUsize>,
}

impl CostModelKernel {
    pub fn new(name: &str, volume: &[usize]) -> Self {
        let aux = aux_string!("prec={},stride={}", 4, volume.iter().product::<usize>()).unwrap();

        Self {
            key: TuneKey::new(name, TuneKey::volume_string(volume), aux).unwrap(),
            optimal_block: (256, 1),
            optimal_grid: 6,
            max_launchable_block: None,
            shared_per_block: 0,
            device: None,
            trials: Arc::new(AtomicUsize::new(0)),
            post_tunes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Make `block` and `grid` the fastest configuration.
    pub fn with_optimum(mut self, block: (u32, u32), grid: u32) -> Self {
        self.optimal_block = block;
        self.optimal_grid = grid;
        self
    }

    /// Reject launches with more than `block_x` threads along x.
    pub fn rejecting_blocks_above(mut self, block_x: u32) -> Self {
        self.max_launchable_block = Some(block_x);
        self
    }

    pub fn with_shared_per_block(mut self, bytes: u32) -> Self {
        self.shared_per_block = bytes;
        self
    }

    /// Panic if a launch is attempted with a configuration the device can't run.
    pub fn validated_against(mut self, device: DeviceProperties) -> Self {
        self.device = Some(device);
        self
    }

    pub fn cost(&self, param: &TuneParam) -> f64 {
        let distance = |a: u32, b: u32| (a as f64 - b as f64).abs();

        1e-6 * (1.0
            + distance(param.block.x, self.optimal_block.0) / 32.0
            + distance(param.block.y, self.optimal_block.1)
            + distance(param.grid.x, self.optimal_grid))
    }

    /// Number of measured trials, across every clone of this kernel.
    pub fn trials(&self) -> usize {
        self.trials.load(Ordering::Relaxed)
    }

    pub fn post_tunes(&self) -> usize {
        self.post_tunes.load(Ordering::Relaxed)
    }
}

impl Tunable for CostModelKernel {
    type Stream = DummyStream;

    fn flops(&self) -> u64 {
        2 * 1024 * 1024
    }

    fn bytes(&self) -> u64 {
        12 * 1024 * 1024
    }

    fn shared_bytes_per_block(&self, _param: &TuneParam) -> u32 {
        self.shared_per_block
    }

    fn tune_shared_bytes(&self) -> bool {
        false
    }

    fn tune_key(&self) -> TuneKey {
        self.key.clone()
    }

    fn apply(&mut self, param: &TuneParam, stream: &DummyStream) -> Result<(), LaunchError> {
        if let Some(device) = &self.device {
            if let Err(err) = check_launch_param(param, device) {
                panic!("Launched an invalid configuration: {err}");
            }
        }

        if let Some(max) = self.max_launchable_block {
            if param.block.x > max {
                return Err(LaunchError::Rejected {
                    reason: format!("block of {} threads needs too many registers", param.block.x),
                });
            }
        }

        stream.run(self.cost(param));
        Ok(())
    }

    fn pre_tune(&mut self) {
        self.trials.fetch_add(1, Ordering::Relaxed);
    }

    fn post_tune(&mut self) {
        self.post_tunes.fetch_add(1, Ordering::Relaxed);
    }

    fn tuning_iter(&self) -> u32 {
        2
    }
}
