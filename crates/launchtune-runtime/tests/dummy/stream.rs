use std::cell::Cell;

use launchtune_runtime::tune::{ExecutionStream, LaunchError};

/// A stream whose clock only advances by the simulated duration of the kernels run on it.
#[derive(Debug, Default)]
pub struct DummyStream {
    clock: Cell<f64>,
    launches: Cell<usize>,
}

impl DummyStream {
    /// Simulate a kernel taking `seconds` to execute.
    pub fn run(&self, seconds: f64) {
        self.clock.set(self.clock.get() + seconds);
        self.launches.set(self.launches.get() + 1);
    }

    /// Number of kernels run on this stream.
    pub fn launches(&self) -> usize {
        self.launches.get()
    }
}

impl ExecutionStream for DummyStream {
    fn sync(&self) -> Result<(), LaunchError> {
        Ok(())
    }

    fn sync_time(&self) -> Result<f64, LaunchError> {
        Ok(self.clock.get())
    }
}
