use core::fmt::Display;

/// Extent of a kernel launch along three dimensions, used for both thread blocks and grids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct LaunchDim {
    /// The extent along the x axis.
    pub x: u32,
    /// The extent along the y axis.
    pub y: u32,
    /// The extent along the z axis.
    pub z: u32,
}

impl LaunchDim {
    /// Create a new launch dim with x = y = z = 1.
    pub const fn new_single() -> Self {
        Self { x: 1, y: 1, z: 1 }
    }

    /// Create a new launch dim with the given x, and y = z = 1.
    pub const fn new_1d(x: u32) -> Self {
        Self { x, y: 1, z: 1 }
    }

    /// Create a new launch dim with the given x and y, and z = 1.
    pub const fn new_2d(x: u32, y: u32) -> Self {
        Self { x, y, z: 1 }
    }

    /// Create a new launch dim with the given x, y and z.
    pub const fn new_3d(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// Total number of elements covered, e.g. threads per block.
    pub const fn num_elems(&self) -> u64 {
        self.x as u64 * self.y as u64 * self.z as u64
    }
}

impl Display for LaunchDim {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// A point in the launch configuration space together with the performance measured for it.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TuneParam {
    /// Thread block shape.
    pub block: LaunchDim,
    /// Grid shape.
    pub grid: LaunchDim,
    /// Dynamic shared memory per block, in bytes.
    pub shared_bytes: u32,
    /// Free parameter that a kernel can use as an arbitrary autotuning dimension.
    pub aux: [i32; 4],
    /// Human readable description of the configuration and its performance.
    #[serde(default)]
    pub comment: String,
    /// Measured time per launch in seconds, infinite when not measured.
    #[serde(with = "time_serde", default = "unmeasured")]
    pub time: f64,
    /// Number of launches recorded while profiling.
    #[serde(default)]
    pub n_calls: u64,
}

impl Default for TuneParam {
    fn default() -> Self {
        Self {
            block: LaunchDim::new_1d(32),
            grid: LaunchDim::new_single(),
            shared_bytes: 0,
            aux: [1, 1, 1, 1],
            comment: String::new(),
            time: unmeasured(),
            n_calls: 0,
        }
    }
}

impl TuneParam {
    /// Whether a time was measured for this configuration.
    pub fn is_measured(&self) -> bool {
        self.time.is_finite()
    }
}

impl Display for TuneParam {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "block = {}", self.block)?;
        writeln!(f, "grid = {}", self.grid)?;
        writeln!(f, "shared_bytes = {}", self.shared_bytes)?;
        let [x, y, z, w] = self.aux;
        writeln!(f, "aux = ({x}, {y}, {z}, {w})")?;
        write!(f, "{}", self.comment)
    }
}

fn unmeasured() -> f64 {
    f64::INFINITY
}

/// JSON has no infinity, so an unmeasured time is stored as `null`.
mod time_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if time.is_finite() {
            serializer.serialize_some(time)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}
