use std::{sync::OnceLock, time::Instant};

use super::LaunchError;

/// The execution stream kernels are launched on.
///
/// The tuner only needs to wait for submitted work and read a clock, so that timing a candidate
/// covers the execution of its launches and not just their submission.
pub trait ExecutionStream {
    /// Block until all work submitted on this stream has completed.
    fn sync(&self) -> Result<(), LaunchError>;

    /// Block until all submitted work has completed, then read the stream clock in seconds.
    ///
    /// Only differences between two readings are meaningful. Streams with device timestamps
    /// should override this, the default reads the host monotonic clock.
    fn sync_time(&self) -> Result<f64, LaunchError> {
        self.sync()?;
        Ok(host_time())
    }
}

/// A stream whose launches complete synchronously, e.g. host fallbacks of kernels.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostStream;

impl ExecutionStream for HostStream {
    fn sync(&self) -> Result<(), LaunchError> {
        Ok(())
    }
}

fn host_time() -> f64 {
    static ORIGIN: OnceLock<Instant> = OnceLock::new();
    ORIGIN.get_or_init(Instant::now).elapsed().as_secs_f64()
}
