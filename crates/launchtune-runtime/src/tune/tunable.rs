use super::{
    traversal, ExecutionStream, LaunchError, TuneContext, TuneError, TuneKey, TuneParam,
};

/// A kernel whose launch configuration can be autotuned.
///
/// Implementors describe the cost and resource requirements of the kernel, how to launch it with
/// a given configuration, and optionally how to walk its configuration space. The default
/// traversal walks shared memory, then block size, then grid size, then the auxiliary dimension,
/// as implemented by the functions of [traversal].
///
/// Traversal methods return `true` while the axis they advance has more candidates, and `false`
/// once the axis was reset to its first value, at which point the next outer axis advances.
pub trait Tunable {
    /// The stream kernels are launched on.
    type Stream: ExecutionStream;

    /// Number of floating point operations of one launch, for throughput reporting.
    fn flops(&self) -> u64;

    /// Number of bytes moved by one launch, for throughput reporting.
    fn bytes(&self) -> u64 {
        0
    }

    /// Minimum shared memory per thread, in bytes.
    fn shared_bytes_per_thread(&self) -> u32 {
        0
    }

    /// Minimum shared memory per block for the given configuration, in bytes.
    fn shared_bytes_per_block(&self, _param: &TuneParam) -> u32 {
        0
    }

    /// Number of threads the launch must cover when the grid isn't tuned.
    fn min_threads(&self) -> u32 {
        1
    }

    /// Whether the grid size is part of the search.
    fn tune_grid_dim(&self) -> bool {
        true
    }

    /// Whether the auxiliary dimension is part of the search.
    fn tune_aux_dim(&self) -> bool {
        false
    }

    /// Whether shared memory over-allocation is part of the search.
    fn tune_shared_bytes(&self) -> bool {
        true
    }

    /// Largest block extent along x to try.
    fn max_block_size(&self, ctx: &TuneContext) -> u32 {
        ctx.properties().max_block_dim.x
    }

    /// Additive block growth below the threshold.
    fn block_step(&self, ctx: &TuneContext) -> u32 {
        ctx.properties().warp_size
    }

    /// Smallest block extent along x, and the granularity of computed block sizes.
    fn block_min(&self, ctx: &TuneContext) -> u32 {
        ctx.properties().warp_size
    }

    /// The identity of this kernel instantiation.
    fn tune_key(&self) -> TuneKey;

    /// Launch the kernel once with the given configuration.
    ///
    /// This is called many times during a search, so it must be repeatable without leaking
    /// resources or corrupting its inputs.
    fn apply(&mut self, param: &TuneParam, stream: &Self::Stream) -> Result<(), LaunchError>;

    /// Called before each measured trial, e.g. to back up buffers the kernel overwrites.
    fn pre_tune(&mut self) {}

    /// Called after each measured trial, even when the trial failed.
    fn post_tune(&mut self) {}

    /// Number of launches timed per candidate.
    fn tuning_iter(&self) -> u32 {
        1
    }

    /// Human readable description of a configuration.
    fn param_string(&self, param: &TuneParam) -> String {
        let block = param.block;
        let mut out = format!("block=({},{},{}), ", block.x, block.y, block.z);

        if self.tune_grid_dim() {
            let grid = param.grid;
            out += &format!("grid=({},{},{}), ", grid.x, grid.y, grid.z);
        }
        out += &format!("shared={}, ", param.shared_bytes);

        if self.tune_aux_dim() {
            let [x, y, z, w] = param.aux;
            out += &format!("aux=({x},{y},{z},{w})");
        }

        out
    }

    /// Human readable throughput achieved by one launch taking `time` seconds.
    fn perf_string(&self, time: f64) -> String {
        let gflops = self.flops() as f64 / (1e9 * time);
        let gbytes = self.bytes() as f64 / (1e9 * time);

        format!("{gflops:.2} Gflop/s, {gbytes:.2} GB/s")
    }

    /// Advance the grid size.
    fn advance_grid_dim(&self, param: &mut TuneParam, ctx: &TuneContext) -> bool {
        traversal::advance_grid_dim(self, param, ctx)
    }

    /// Advance the block size.
    fn advance_block_dim(
        &self,
        param: &mut TuneParam,
        ctx: &TuneContext,
    ) -> Result<bool, TuneError> {
        traversal::advance_block_dim(self, param, ctx)
    }

    /// Advance the shared memory allocation to throttle the number of resident blocks.
    fn advance_shared_bytes(
        &self,
        param: &mut TuneParam,
        ctx: &TuneContext,
    ) -> Result<bool, TuneError> {
        traversal::advance_shared_bytes(self, param, ctx)
    }

    /// Advance the auxiliary dimension.
    fn advance_aux(&self, _param: &mut TuneParam, _ctx: &TuneContext) -> bool {
        false
    }

    /// Move to the next candidate, returning `false` once the whole space was walked.
    fn advance_tune_param(
        &self,
        param: &mut TuneParam,
        ctx: &TuneContext,
    ) -> Result<bool, TuneError> {
        Ok(self.advance_shared_bytes(param, ctx)?
            || self.advance_block_dim(param, ctx)?
            || self.advance_grid_dim(param, ctx)
            || self.advance_aux(param, ctx))
    }

    /// The first candidate of the search.
    fn init_tune_param(&self, ctx: &TuneContext) -> Result<TuneParam, TuneError> {
        traversal::init_tune_param(self, ctx)
    }

    /// The configuration used when tuning is disabled.
    fn default_tune_param(&self, ctx: &TuneContext) -> Result<TuneParam, TuneError> {
        traversal::default_tune_param(self, ctx)
    }
}
