use core::fmt::{Display, Write};

use super::TuneError;

/// Identity of a tuning problem, used as the tuning cache key.
///
/// Two kernel instances that run structurally identical code on identically shaped inputs must
/// produce equal keys. Equality is structural over the three strings, never a digest.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct TuneKey {
    volume: String,
    name: String,
    aux: String,
}

impl TuneKey {
    /// Maximum length of the kernel name, in bytes.
    pub const NAME_MAX_LEN: usize = 255;
    /// Maximum length of the volume descriptor, in bytes.
    pub const VOLUME_MAX_LEN: usize = 31;
    /// Maximum length of the auxiliary descriptor, in bytes.
    pub const AUX_MAX_LEN: usize = 255;

    /// Create a key, failing if any of the strings is longer than its capacity.
    pub fn new(
        name: impl Into<String>,
        volume: impl Into<String>,
        aux: impl Into<String>,
    ) -> Result<Self, TuneError> {
        let name = checked("name", name.into(), Self::NAME_MAX_LEN)?;
        let volume = checked("volume", volume.into(), Self::VOLUME_MAX_LEN)?;
        let aux = checked("aux", aux.into(), Self::AUX_MAX_LEN)?;

        Ok(Self { volume, name, aux })
    }

    /// The kernel name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The shape descriptor of the problem.
    pub fn volume(&self) -> &str {
        &self.volume
    }

    /// The auxiliary descriptor (precision, strides, kernel flavour, ...).
    pub fn aux(&self) -> &str {
        &self.aux
    }

    /// Format dimensions as a volume descriptor, e.g. `16x16x16x8`.
    pub fn volume_string(dims: &[usize]) -> String {
        let mut volume = String::new();
        for (i, dim) in dims.iter().enumerate() {
            if i > 0 {
                volume.push('x');
            }
            // Writing to a `String` can't fail.
            let _ = write!(volume, "{dim}");
        }
        volume
    }
}

impl Display for TuneKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} {} {}", self.volume, self.name, self.aux)
    }
}

fn checked(field: &'static str, value: String, max: usize) -> Result<String, TuneError> {
    if value.len() > max {
        return Err(TuneError::KeyCapacity {
            field,
            len: value.len(),
            max,
        });
    }
    Ok(value)
}

/// Fixed capacity builder for the auxiliary descriptor of a [TuneKey].
///
/// Writing past the capacity is an error instead of a silent truncation.
#[derive(Debug, Default, Clone)]
pub struct AuxString {
    inner: String,
    overflow: usize,
}

impl AuxString {
    /// Create an empty auxiliary string.
    pub fn new() -> Self {
        Self::default()
    }

    /// Format the arguments into a new auxiliary string.
    pub fn from_args(args: core::fmt::Arguments<'_>) -> Result<String, TuneError> {
        let mut aux = Self::new();
        // Overflow is tracked by the writer itself and reported by `finish`.
        let _ = aux.write_fmt(args);
        aux.finish()
    }

    /// Validate the capacity and return the string.
    pub fn finish(self) -> Result<String, TuneError> {
        if self.overflow > 0 {
            return Err(TuneError::KeyCapacity {
                field: "aux",
                len: self.inner.len() + self.overflow,
                max: TuneKey::AUX_MAX_LEN,
            });
        }
        Ok(self.inner)
    }
}

impl Write for AuxString {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        if self.overflow > 0 || self.inner.len() + s.len() > TuneKey::AUX_MAX_LEN {
            self.overflow += s.len();
            return Err(core::fmt::Error);
        }
        self.inner.push_str(s);
        Ok(())
    }
}

/// Format an auxiliary descriptor, failing if it exceeds [TuneKey::AUX_MAX_LEN].
#[macro_export]
macro_rules! aux_string {
    ($($arg:tt)*) => {
        $crate::tune::AuxString::from_args(format_args!($($arg)*))
    };
}

pub use aux_string;
