use launchtune_common::backtrace::BackTrace;
use thiserror::Error;

use super::TuneKey;

/// Axis of a launch dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// The x axis.
    X,
    /// The y axis.
    Y,
    /// The z axis.
    Z,
}

impl core::fmt::Display for Axis {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
        })
    }
}

/// Which launch dimension a limit applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimKind {
    /// Thread block extent.
    Block,
    /// Grid extent.
    Grid,
}

impl core::fmt::Display for DimKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            DimKind::Block => "block",
            DimKind::Grid => "grid",
        })
    }
}

/// Errors of the tuning contract.
///
/// All of them are programming or configuration errors: they abort the current tuning operation
/// and nothing is cached for it.
#[derive(Error)]
pub enum TuneError {
    /// A launch dimension exceeds the device limit.
    #[error(
        "Requested {axis}-dimension {kind} size {requested} greater than hardware limit {max}\nBacktrace\n{backtrace}"
    )]
    DimLimit {
        /// Block or grid.
        kind: DimKind,
        /// Offending axis.
        axis: Axis,
        /// Requested extent.
        requested: u32,
        /// Device limit.
        max: u32,
        /// The backtrace for this error.
        backtrace: BackTrace,
    },
    /// A launch dimension is empty.
    #[error("Requested {axis}-dimension {kind} size is 0\nBacktrace\n{backtrace}")]
    EmptyDim {
        /// Block or grid.
        kind: DimKind,
        /// Offending axis.
        axis: Axis,
        /// The backtrace for this error.
        backtrace: BackTrace,
    },
    /// Shared memory exceeds the per-block capacity.
    #[error(
        "Too much shared memory requested.\nRequested {requested} bytes, maximum {max} bytes available.\nBacktrace\n{backtrace}"
    )]
    SharedMemory {
        /// Requested bytes.
        requested: u32,
        /// Per-block capacity.
        max: u32,
        /// The backtrace for this error.
        backtrace: BackTrace,
    },
    /// No block size can cover the required threads within the grid limit.
    #[error(
        "Problem is too large for the device: {min_threads} threads need a block of {requested} threads, maximum is {max}\nBacktrace\n{backtrace}"
    )]
    NoValidBlockSize {
        /// Threads the launch must cover.
        min_threads: u32,
        /// Smallest block size that would cover them.
        requested: u32,
        /// Maximum block size.
        max: u32,
        /// The backtrace for this error.
        backtrace: BackTrace,
    },
    /// A key string is longer than its fixed capacity.
    #[error("Key {field} string of {len} bytes exceeds its capacity of {max} bytes")]
    KeyCapacity {
        /// Which part of the key.
        field: &'static str,
        /// Length of the rejected string.
        len: usize,
        /// Capacity.
        max: usize,
    },
    /// The block growth threshold override is not a valid block size for the device.
    #[error("Invalid tuning threshold {value:?}, expected an integer no greater than {max}")]
    InvalidThreshold {
        /// The rejected value.
        value: String,
        /// Maximum block extent of the device.
        max: u32,
    },
    /// Every candidate of a search failed to launch.
    #[error("All {candidates} candidate configurations failed to launch for {key}\nCaused by:\n  {source}")]
    NoValidCandidate {
        /// Key of the kernel being tuned.
        key: TuneKey,
        /// Number of candidates tried.
        candidates: usize,
        /// The last launch failure.
        source: LaunchError,
    },
}

impl core::fmt::Debug for TuneError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!("{self}"))
    }
}

/// Error reported by the kernel launch collaborator.
#[derive(Error, Debug, Clone)]
pub enum LaunchError {
    /// The launch was rejected, e.g. the configuration needs too many registers.
    #[error("The launch was rejected\nCaused by:\n  {reason}")]
    Rejected {
        /// Why the launch was rejected.
        reason: String,
    },
    /// Waiting for the stream failed.
    #[error("An error happened while synchronizing the stream\nCaused by:\n  {reason}")]
    Sync {
        /// Why the synchronization failed.
        reason: String,
    },
}

/// Error of the tuning cache persistence.
#[derive(Error, Debug)]
pub enum PersistError {
    /// Reading or writing a file failed.
    #[error("An io error happened with the tuning cache\nCaused by:\n  {0}")]
    Io(#[from] std::io::Error),
    /// The snapshot could not be encoded or decoded.
    #[cfg(std_io)]
    #[error("The tuning cache snapshot is malformed\nCaused by:\n  {0}")]
    Format(#[from] serde_json::Error),
    /// The snapshot was written by an incompatible version.
    #[error("The tuning cache snapshot has version {found:?}, expected {expected:?}")]
    Version {
        /// Version found in the snapshot.
        found: String,
        /// Version this crate writes.
        expected: String,
    },
    /// The snapshot was written for another device.
    #[error("The tuning cache snapshot was written for device {found:?}, expected {expected:?}")]
    Device {
        /// Device found in the snapshot.
        found: String,
        /// Device of the cache.
        expected: String,
    },
    /// Another process holds the snapshot lock.
    #[error("The tuning cache {path:?} is locked by another process")]
    Locked {
        /// Path of the lock file.
        path: std::path::PathBuf,
    },
}
