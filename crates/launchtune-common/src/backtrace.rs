use alloc::string::String;

/// Contains the backtrace information if available.
///
/// Capturing follows the `RUST_BACKTRACE` and `RUST_LIB_BACKTRACE` environment variables, so the
/// cost is only paid when the user asked for it.
#[derive(Clone)]
pub struct BackTrace {
    inner: String,
}

impl BackTrace {
    /// Creates a new backtrace from the current thread.
    pub fn capture() -> Self {
        Self {
            #[cfg(feature = "std")]
            inner: alloc::format!("{}", std::backtrace::Backtrace::capture()),
            #[cfg(not(feature = "std"))]
            inner: String::from("No backtrace available"),
        }
    }
}

impl core::fmt::Debug for BackTrace {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!("{}", self.inner))
    }
}

impl core::fmt::Display for BackTrace {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!("{}", self.inner))
    }
}
