use crate::tune::{
    traversal::{div_ceil, required_shared_bytes},
    TuneContext, TuneError, TuneParam, Tunable,
};

/// Strategy for kernels computing a vector of independent results along y.
///
/// The vector of length `vector_length_y` is split between `block.y` and `grid.y`. Once the
/// wrapped kernel's block walk along x wraps, `block.y` grows by one up to the vector length,
/// and the grid covers the rest of the vector.
#[derive(new, Debug, Clone)]
pub struct VectorY<T> {
    inner: T,
    vector_length_y: u32,
}

impl<T> VectorY<T> {
    /// Length of the vector along y.
    pub fn vector_length_y(&self) -> u32 {
        self.vector_length_y
    }

    /// Change the vector length, e.g. when the kernel is reused for another problem.
    pub fn resize_vector(&mut self, y: u32) {
        self.vector_length_y = y;
    }

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

impl<T: Tunable> Tunable for VectorY<T> {
    type Stream = T::Stream;

    forward_tunable!(
        inner;
        flops,
        bytes,
        shared_bytes_per_thread,
        shared_bytes_per_block,
        min_threads,
        tune_grid_dim,
        tune_aux_dim,
        tune_shared_bytes,
        max_block_size,
        block_step,
        block_min,
        tune_key,
        apply,
        pre_tune,
        post_tune,
        tuning_iter,
        param_string,
        perf_string,
        advance_grid_dim,
        advance_shared_bytes,
        advance_aux,
    );

    fn advance_block_dim(
        &self,
        param: &mut TuneParam,
        ctx: &TuneContext,
    ) -> Result<bool, TuneError> {
        let (block, grid) = (param.block, param.grid);
        let advanced = self.inner.advance_block_dim(param, ctx)?;
        param.block.y = block.y;
        param.grid.y = grid.y;

        if advanced {
            return Ok(true);
        }

        let props = ctx.properties();
        if param.block.y < self.vector_length_y && param.block.y < props.max_block_dim.y {
            param.block.y += 1;
            param.grid.y = div_ceil(self.vector_length_y, param.block.y);
            param.shared_bytes = required_shared_bytes(self, param);
            if param.shared_bytes <= props.max_shared_memory_per_block {
                return Ok(true);
            }
        }

        param.block.y = 1;
        param.grid.y = self.vector_length_y;
        param.shared_bytes = required_shared_bytes(self, param);
        Ok(false)
    }

    fn init_tune_param(&self, ctx: &TuneContext) -> Result<TuneParam, TuneError> {
        let mut param = self.inner.init_tune_param(ctx)?;
        param.block.y = 1;
        param.grid.y = self.vector_length_y;
        Ok(param)
    }

    fn default_tune_param(&self, ctx: &TuneContext) -> Result<TuneParam, TuneError> {
        let mut param = self.inner.default_tune_param(ctx)?;
        param.block.y = 1;
        param.grid.y = self.vector_length_y;
        Ok(param)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        device::tests::test_device,
        tune::{
            traversal::tests::{context, walk, TestKernel},
            LaunchDim,
        },
    };
    use pretty_assertions::assert_eq;

    // A device whose blocks hold a single warp along x and 4 threads along y.
    fn narrow_context() -> TuneContext {
        let mut device = test_device();
        device.max_block_dim = LaunchDim::new_3d(32, 4, 64);
        TuneContext::with_block_threshold(device, None).unwrap()
    }

    #[test]
    fn block_y_walks_the_vector_then_resets() {
        let kernel = VectorY::new(TestKernel::default(), 8);
        let ctx = narrow_context();
        let mut param = kernel.init_tune_param(&ctx).unwrap();
        assert_eq!((param.block.y, param.grid.y), (1, 8));

        let mut steps = Vec::new();
        while kernel.advance_block_dim(&mut param, &ctx).unwrap() {
            steps.push((param.block.y, param.grid.y));
        }

        assert_eq!(steps, Vec::from([(2, 4), (3, 3), (4, 2)]));
        assert_eq!((param.block.y, param.grid.y), (1, 8));
    }

    #[test]
    fn block_x_is_walked_before_block_y() {
        let kernel = VectorY::new(
            TestKernel {
                grid: false,
                min_threads: 64,
                ..Default::default()
            },
            2,
        );
        let ctx = context();

        let candidates = walk(&kernel, &ctx);

        // 32 block sizes along x for each of the 2 block sizes along y.
        assert_eq!(candidates.len(), 64);
        assert!(candidates[..32].iter().all(|param| param.block.y == 1));
        assert!(candidates[32..].iter().all(|param| param.block.y == 2));
        assert!(candidates.iter().all(|param| param.grid.x == 64u32.div_ceil(param.block.x)));
    }

    #[test]
    fn block_y_is_bounded_by_shared_memory() {
        // 512 bytes per thread leave room for 96 threads per block.
        let kernel = VectorY::new(
            TestKernel {
                grid: false,
                min_threads: 32,
                per_thread: 512,
                ..Default::default()
            },
            8,
        );

        let blocks: Vec<_> = walk(&kernel, &context())
            .into_iter()
            .map(|param| (param.block.x, param.block.y, param.shared_bytes))
            .collect();

        assert_eq!(
            blocks,
            Vec::from([
                (32, 1, 16384),
                (64, 1, 32768),
                (96, 1, 49152),
                (32, 2, 32768),
                (32, 3, 49152),
            ])
        );
    }

    #[test]
    fn resized_vector_changes_the_grid() {
        let mut kernel = VectorY::new(TestKernel::default(), 8);
        kernel.resize_vector(5);

        let param = kernel.default_tune_param(&context()).unwrap();

        assert_eq!(param.block, LaunchDim::new_2d(32, 1));
        assert_eq!(param.grid, LaunchDim::new_2d(128, 5));
    }
}
