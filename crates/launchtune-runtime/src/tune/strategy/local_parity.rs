use crate::tune::{traversal, TuneContext, TuneError, TuneParam, Tunable};

/// Strategy for kernels processing both parities of a checkerboarded domain in one block.
///
/// The two parities are laid out along `block.y`, which is always 2, while `block.x` covers the
/// checkerboarded volume. The grid is sized to cover [Tunable::min_threads] and isn't tuned, and
/// the kernel uses no shared memory.
#[derive(new, Debug, Clone)]
pub struct LocalParity<T> {
    inner: T,
}

impl<T> LocalParity<T> {
    /// The wrapped kernel.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// The wrapped kernel, mutably.
    pub fn inner_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Unwrap the kernel.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Tunable> Tunable for LocalParity<T> {
    type Stream = T::Stream;

    forward_tunable!(
        inner;
        flops,
        bytes,
        min_threads,
        tune_aux_dim,
        tune_shared_bytes,
        block_step,
        block_min,
        tune_key,
        apply,
        pre_tune,
        post_tune,
        tuning_iter,
        perf_string,
        advance_shared_bytes,
        advance_aux,
    );

    fn shared_bytes_per_thread(&self) -> u32 {
        0
    }

    fn shared_bytes_per_block(&self, _param: &TuneParam) -> u32 {
        0
    }

    fn tune_grid_dim(&self) -> bool {
        false
    }

    /// Both parities share the thread budget of a block.
    fn max_block_size(&self, ctx: &TuneContext) -> u32 {
        ctx.properties().max_threads_per_block / 2
    }

    fn advance_block_dim(
        &self,
        param: &mut TuneParam,
        ctx: &TuneContext,
    ) -> Result<bool, TuneError> {
        let advanced = traversal::advance_block_dim(self, param, ctx)?;
        param.block.y = 2;
        Ok(advanced)
    }

    fn init_tune_param(&self, ctx: &TuneContext) -> Result<TuneParam, TuneError> {
        let mut param = traversal::init_tune_param(self, ctx)?;
        param.block.y = 2;
        Ok(param)
    }

    fn default_tune_param(&self, ctx: &TuneContext) -> Result<TuneParam, TuneError> {
        let mut param = traversal::default_tune_param(self, ctx)?;
        param.block.y = 2;
        Ok(param)
    }
}
