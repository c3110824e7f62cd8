use launchtune_common::backtrace::BackTrace;

use crate::{
    tune::{Axis, DimKind, LaunchDim, TuneError, TuneParam},
    DeviceProperties,
};

/// Check the launch parameters of a kernel against the limits of the device.
///
/// A failure means the tunable produced a configuration the hardware can't launch. This is a bug
/// in the tunable, not a dead end of the search, so callers abort instead of skipping it.
pub fn check_launch_param(
    param: &TuneParam,
    properties: &DeviceProperties,
) -> Result<(), TuneError> {
    validate_dim(DimKind::Block, param.block, properties.max_block_dim)?;
    validate_dim(DimKind::Grid, param.grid, properties.max_grid_dim)?;
    validate_shared_memory(param.shared_bytes, properties)
}

/// Validate every axis of a launch dim fits within the hardware limits.
pub fn validate_dim(kind: DimKind, requested: LaunchDim, max: LaunchDim) -> Result<(), TuneError> {
    let axes = [
        (Axis::X, requested.x, max.x),
        (Axis::Y, requested.y, max.y),
        (Axis::Z, requested.z, max.z),
    ];

    for (axis, requested, max) in axes {
        if requested == 0 {
            return Err(TuneError::EmptyDim {
                kind,
                axis,
                backtrace: BackTrace::capture(),
            });
        }
        if requested > max {
            return Err(TuneError::DimLimit {
                kind,
                axis,
                requested,
                max,
                backtrace: BackTrace::capture(),
            });
        }
    }

    Ok(())
}

/// Validate the shared memory of a kernel fits within the per-block capacity.
pub fn validate_shared_memory(
    requested: u32,
    properties: &DeviceProperties,
) -> Result<(), TuneError> {
    let max = properties.max_shared_memory_per_block;
    if requested > max {
        Err(TuneError::SharedMemory {
            requested,
            max,
            backtrace: BackTrace::capture(),
        })
    } else {
        Ok(())
    }
}
