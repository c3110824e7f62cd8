//! The functions here implement the default behavior of the traversal methods of [Tunable], and
//! are public so strategies overriding one axis can still reuse the base walk of the others.

use launchtune_common::backtrace::BackTrace;

use super::{LaunchDim, TuneContext, TuneError, TuneParam, Tunable};

/// Grid size used when tuning is disabled for kernels that tune their grid.
pub const DEFAULT_GRID_SIZE: u32 = 128;

/// Advance `grid.x` by one, up to twice the number of multiprocessors.
pub fn advance_grid_dim<T: Tunable + ?Sized>(
    tunable: &T,
    param: &mut TuneParam,
    ctx: &TuneContext,
) -> bool {
    if !tunable.tune_grid_dim() {
        return false;
    }

    let max_blocks = 2 * ctx.properties().multiprocessor_count;
    param.grid.x += 1;

    if param.grid.x > max_blocks {
        param.grid.x = 1;
        false
    } else {
        true
    }
}

/// Grow `block.x` additively below the block threshold and by doubling above it.
///
/// When the block no longer fits the kernel's maximum size or the shared memory it needs, it is
/// reset and `false` is returned. Kernels that don't tune their grid get a grid recomputed to
/// cover [Tunable::min_threads] after every step. The shared memory of the record is set to what
/// the kernel needs with the new block.
pub fn advance_block_dim<T: Tunable + ?Sized>(
    tunable: &T,
    param: &mut TuneParam,
    ctx: &TuneContext,
) -> Result<bool, TuneError> {
    let props = ctx.properties();
    let max_threads = tunable.max_block_size(ctx);
    let step = tunable.block_step(ctx).max(1);

    param.block.x = if param.block.x < ctx.block_threshold() {
        param.block.x.saturating_add(step)
    } else {
        param.block.x.saturating_mul(2)
    };

    let fits = param.block.x <= max_threads
        && required_shared_bytes(tunable, param) <= props.max_shared_memory_per_block;
    if !fits {
        param.block.x = if tunable.tune_grid_dim() {
            step
        } else {
            min_block_size(tunable.min_threads(), step, max_threads, props.max_grid_dim.x)?
        };
    }

    if !tunable.tune_grid_dim() {
        param.grid = LaunchDim::new_1d(div_ceil(tunable.min_threads(), param.block.x));
    }
    param.shared_bytes = required_shared_bytes(tunable, param);

    Ok(fits)
}

/// Over-allocate shared memory so that one fewer block fits on a multiprocessor.
///
/// Once a single block uses the whole capacity, the allocation is reset to what the kernel needs
/// for the next block size and `false` is returned.
pub fn advance_shared_bytes<T: Tunable + ?Sized>(
    tunable: &T,
    param: &mut TuneParam,
    ctx: &TuneContext,
) -> Result<bool, TuneError> {
    if !tunable.tune_shared_bytes() {
        return Ok(false);
    }

    let props = ctx.properties();
    let max_shared = props.max_shared_memory_per_block;
    let threads = param.block.num_elems().max(1);
    let max_blocks_per_sm = (props.max_threads_per_multiprocessor as u64 / threads)
        .min(props.max_resident_blocks() as u64) as u32;
    let blocks_per_sm = (max_shared / param.shared_bytes.max(1)).min(max_blocks_per_sm);

    param.shared_bytes = match blocks_per_sm {
        0 => max_shared.saturating_add(1),
        blocks => max_shared / blocks + 1,
    };

    if param.shared_bytes <= max_shared {
        return Ok(true);
    }

    let mut next = param.clone();
    tunable.advance_block_dim(&mut next, ctx)?;
    param.shared_bytes = required_shared_bytes(tunable, &next);

    Ok(false)
}

/// The first candidate of the default walk.
pub fn init_tune_param<T: Tunable + ?Sized>(
    tunable: &T,
    ctx: &TuneContext,
) -> Result<TuneParam, TuneError> {
    let props = ctx.properties();
    let min_block = tunable.block_min(ctx).max(1);
    let mut param = TuneParam::default();

    if tunable.tune_grid_dim() {
        param.block = LaunchDim::new_1d(min_block);
        param.grid = LaunchDim::new_single();
    } else {
        let block = min_block_size(
            tunable.min_threads(),
            min_block,
            props.max_block_dim.x,
            props.max_grid_dim.x,
        )?;
        param.block = LaunchDim::new_1d(block);
        param.grid = LaunchDim::new_1d(div_ceil(tunable.min_threads(), block));
    }

    param.shared_bytes = required_shared_bytes(tunable, &param);

    Ok(param)
}

/// The configuration used without tuning: the first candidate with a larger grid.
pub fn default_tune_param<T: Tunable + ?Sized>(
    tunable: &T,
    ctx: &TuneContext,
) -> Result<TuneParam, TuneError> {
    let mut param = tunable.init_tune_param(ctx)?;

    if tunable.tune_grid_dim() {
        param.grid = LaunchDim::new_1d(DEFAULT_GRID_SIZE);
    }

    Ok(param)
}

/// Ceiling of `a / b`, treating an empty range as a single element.
pub fn div_ceil(a: u32, b: u32) -> u32 {
    a.max(1).div_ceil(b.max(1))
}

// Smallest multiple of `granularity` able to cover `min_threads` without exceeding the grid limit.
fn min_block_size(
    min_threads: u32,
    granularity: u32,
    max_block: u32,
    max_grid: u32,
) -> Result<u32, TuneError> {
    let granularity = granularity.max(1) as u64;
    let block = div_ceil(min_threads, max_grid) as u64;
    let block = block.div_ceil(granularity) * granularity;

    if block > max_block as u64 {
        return Err(TuneError::NoValidBlockSize {
            min_threads,
            requested: u32::try_from(block).unwrap_or(u32::MAX),
            max: max_block,
            backtrace: BackTrace::capture(),
        });
    }

    Ok(block as u32)
}

/// Shared memory the kernel needs per block to launch with the configuration's block.
pub fn required_shared_bytes<T: Tunable + ?Sized>(tunable: &T, param: &TuneParam) -> u32 {
    let per_thread = tunable.shared_bytes_per_thread() as u64 * param.block.num_elems();
    let per_block = tunable.shared_bytes_per_block(param) as u64;

    u32::try_from(per_thread.max(per_block)).unwrap_or(u32::MAX)
}
