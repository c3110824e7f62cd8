use crate::tune::{
    traversal::{div_ceil, required_shared_bytes},
    TuneContext, TuneError, TuneParam, Tunable,
};

use super::VectorY;

/// Strategy for kernels computing a matrix of independent results along y and z.
///
/// Extends [VectorY] with a second vector along z, walked once the y walk wraps.
#[derive(Debug, Clone)]
pub struct VectorYZ<T> {
    inner: VectorY<T>,
    vector_length_z: u32,
}

impl<T> VectorYZ<T> {
    /// Wrap a kernel with vectors of the given lengths along y and z.
    pub fn new(inner: T, vector_length_y: u32, vector_length_z: u32) -> Self {
        Self {
            inner: VectorY::new(inner, vector_length_y),
            vector_length_z,
        }
    }

    /// Length of the vector along y.
    pub fn vector_length_y(&self) -> u32 {
        self.inner.vector_length_y()
    }

    /// Length of the vector along z.
    pub fn vector_length_z(&self) -> u32 {
        self.vector_length_z
    }

    /// Change both vector lengths.
    pub fn resize_vector(&mut self, y: u32, z: u32) {
        self.inner.resize_vector(y);
        self.vector_length_z = z;
    }

    /// The wrapped kernel.
    pub fn inner(&self) -> &T {
        self.inner.inner()
    }

    /// The wrapped kernel, mutably.
    pub fn inner_mut(&mut self) -> &mut T {
        self.inner.inner_mut()
    }

    /// Unwrap the kernel.
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

impl<T: Tunable> Tunable for VectorYZ<T> {
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
        param.block.z = block.z;
        param.grid.z = grid.z;

        if advanced {
            return Ok(true);
        }

        let props = ctx.properties();
        if param.block.z < self.vector_length_z && param.block.z < props.max_block_dim.z {
            param.block.z += 1;
            param.grid.z = div_ceil(self.vector_length_z, param.block.z);
            param.shared_bytes = required_shared_bytes(self, param);
            if param.shared_bytes <= props.max_shared_memory_per_block {
                return Ok(true);
            }
        }

        param.block.z = 1;
        param.grid.z = self.vector_length_z;
        param.shared_bytes = required_shared_bytes(self, param);
        Ok(false)
    }

    fn init_tune_param(&self, ctx: &TuneContext) -> Result<TuneParam, TuneError> {
        let mut param = self.inner.init_tune_param(ctx)?;
        param.block.z = 1;
        param.grid.z = self.vector_length_z;
        Ok(param)
    }

    fn default_tune_param(&self, ctx: &TuneContext) -> Result<TuneParam, TuneError> {
        let mut param = self.inner.default_tune_param(ctx)?;
        param.block.z = 1;
        param.grid.z = self.vector_length_z;
        Ok(param)
    }
}
