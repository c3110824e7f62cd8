use crate::tune::LaunchDim;

/// Hardware properties of the device kernels are tuned for.
///
/// This is read-only data discovered by the backend; the tuner never mutates it.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DeviceProperties {
    /// Name of the device, used to identify persisted tuning caches.
    pub name: String,
    /// Architecture generation of the device.
    pub arch: ArchVersion,
    /// Maximum extent of a thread block in each dimension.
    pub max_block_dim: LaunchDim,
    /// Maximum extent of the grid in each dimension.
    pub max_grid_dim: LaunchDim,
    /// Maximum number of threads in a single block, across all dimensions.
    pub max_threads_per_block: u32,
    /// Maximum amount of shared memory a block can allocate, in bytes.
    pub max_shared_memory_per_block: u32,
    /// Granularity of thread scheduling (warp or wavefront size).
    pub warp_size: u32,
    /// Number of multiprocessors on the device.
    pub multiprocessor_count: u32,
    /// Maximum number of threads resident on a single multiprocessor.
    pub max_threads_per_multiprocessor: u32,
    /// Maximum number of blocks resident on a single multiprocessor, per architecture.
    #[serde(default)]
    pub resident_blocks: ResidentBlocks,
}

impl DeviceProperties {
    /// Maximum number of simultaneously resident blocks per multiprocessor for this device.
    pub fn max_resident_blocks(&self) -> u32 {
        self.resident_blocks.lookup(self.arch)
    }

    /// Replace the resident block table, e.g. for architectures newer than the built-in table.
    pub fn with_resident_blocks(mut self, resident_blocks: ResidentBlocks) -> Self {
        self.resident_blocks = resident_blocks;
        self
    }
}

/// Architecture generation of a device, as a `major.minor` pair.
#[derive(
    new, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct ArchVersion {
    /// Major generation.
    pub major: u32,
    /// Minor revision.
    pub minor: u32,
}

impl core::fmt::Display for ArchVersion {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Maximum number of resident blocks per multiprocessor, keyed by major architecture version.
///
/// This can't be queried from the device, so it is tabulated. An architecture missing from the
/// table uses the closest older generation, or the oldest entry when none is older.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ResidentBlocks {
    /// Per-generation table of `(major, max resident blocks)`.
    Table(Vec<(u32, u32)>),
    /// The same limit for every architecture.
    Fixed(u32),
}

impl Default for ResidentBlocks {
    fn default() -> Self {
        Self::Table(Vec::from([(2, 8), (3, 16), (5, 32), (6, 32), (7, 32)]))
    }
}

impl ResidentBlocks {
    /// Maximum resident blocks per multiprocessor for the given architecture.
    pub fn lookup(&self, arch: ArchVersion) -> u32 {
        let table = match self {
            ResidentBlocks::Fixed(blocks) => return *blocks,
            ResidentBlocks::Table(table) => table,
        };

        if let Some((_, blocks)) = table.iter().find(|(major, _)| *major == arch.major) {
            return *blocks;
        }

        let older = table
            .iter()
            .filter(|(major, _)| *major < arch.major)
            .max_by_key(|(major, _)| *major);
        let fallback = older.or_else(|| table.iter().min_by_key(|(major, _)| *major));

        match fallback {
            Some((major, blocks)) => {
                log::debug!(
                    "Unknown architecture {arch} for the resident block table, using the limit of generation {major} ({blocks} blocks)"
                );
                *blocks
            }
            None => {
                log::warn!("Empty resident block table, assuming a single resident block");
                1
            }
        }
    }
}
