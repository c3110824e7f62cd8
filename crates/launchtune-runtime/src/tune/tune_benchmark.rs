use super::{ExecutionStream, LaunchError, TuneParam, Tunable};

/// A benchmark measuring one candidate configuration of a kernel.
#[derive(new)]
pub struct TuneBenchmark<'a, T: Tunable> {
    tunable: &'a mut T,
    stream: &'a T::Stream,
}

impl<T: Tunable> TuneBenchmark<'_, T> {
    /// Time per launch of the kernel with the given configuration, in seconds.
    ///
    /// The tunable's hooks surround the measurement, and [Tunable::post_tune] runs even when a
    /// launch fails.
    pub fn run(&mut self, param: &TuneParam) -> Result<f64, LaunchError> {
        self.tunable.pre_tune();
        let time = self.sample(param);
        self.tunable.post_tune();

        time
    }

    fn sample(&mut self, param: &TuneParam) -> Result<f64, LaunchError> {
        let iterations = self.tunable.tuning_iter().max(1);

        // Previously submitted work must not be accounted to this candidate.
        let start = self.stream.sync_time()?;
        for _ in 0..iterations {
            self.tunable.apply(param, self.stream)?;
        }
        let end = self.stream.sync_time()?;

        Ok((end - start).max(0.0) / iterations as f64)
    }
}
