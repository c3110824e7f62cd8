#[cfg(std_io)]
use std::path::PathBuf;
use std::sync::{Arc, PoisonError};

use hashbrown::HashMap;

#[cfg(std_io)]
use super::{PersistError, CACHE_FILE_NAME};
use super::{
    LaunchError, TuneBenchmark, TuneCache, TuneContext, TuneError, TuneKey, TuneParam, Tunable,
};
use crate::{
    check_launch_param,
    config::{
        autotune::{AutotuneConfig, AutotuneLogLevel},
        GlobalConfig, Logger,
    },
};

/// Name of the process-wide tuner.
pub const DEFAULT_TUNER_NAME: &str = "default";

static GLOBAL_TUNER: spin::Mutex<Option<Arc<Tuner>>> = spin::Mutex::new(None);

/// Whether a launch may search the configuration space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuneMode {
    /// Use the cached configuration, or the kernel's default one without measuring anything.
    Disabled,
    /// Use the cached configuration, or search for the best one.
    Enabled,
    /// Search for the best configuration even if one is cached.
    Force,
}

impl From<bool> for TuneMode {
    fn from(enabled: bool) -> Self {
        if enabled {
            TuneMode::Enabled
        } else {
            TuneMode::Disabled
        }
    }
}

/// How much a launch reports through the autotune logger.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// Nothing.
    Silent,
    /// The configuration selected for each newly tuned kernel.
    #[default]
    Summarize,
    /// The start of each search as well.
    Verbose,
    /// Every candidate measured during a search as well.
    DebugVerbose,
}

/// Selects and remembers the best launch configuration of every kernel it tunes.
///
/// Searches for distinct kernels can run concurrently. Searches for the same kernel are
/// serialized, and a caller waiting for another search reuses its result. No lock is held while
/// a kernel is benchmarked, so a kernel may tune nested kernels while it is launched. Tuning the
/// same kernel again from inside its own launch deadlocks.
#[derive(Debug)]
pub struct Tuner {
    name: String,
    cache: spin::RwLock<TuneCache>,
    searches: spin::Mutex<HashMap<TuneKey, Arc<std::sync::Mutex<()>>>>,
    logger: spin::Mutex<Logger>,
    profile: bool,
    persist_on_tune: bool,
    #[cfg(std_io)]
    cache_dir: PathBuf,
}

impl Tuner {
    /// Create a tuner configured by the [global configuration](GlobalConfig), and load its
    /// persisted cache.
    pub fn new(name: impl Into<String>) -> Self {
        let tuner = Self::from_config(name, &GlobalConfig::get().autotune);

        #[cfg(std_io)]
        tuner.load();

        tuner
    }

    /// Create a tuner with an empty cache from the given configuration.
    pub fn from_config(name: impl Into<String>, config: &AutotuneConfig) -> Self {
        let name = name.into();

        Self {
            cache: spin::RwLock::new(TuneCache::new(name.clone())),
            searches: spin::Mutex::new(HashMap::new()),
            logger: spin::Mutex::new(Logger::new(&config.logger)),
            profile: config.profile,
            persist_on_tune: config.persist_on_tune,
            #[cfg(std_io)]
            cache_dir: config
                .cache
                .root()
                .join("launchtune")
                .join("autotune")
                .join(sanitize_filename::sanitize(&name)),
            name,
        }
    }

    /// Name of the tuner, used as the directory of its persisted files.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the configuration to launch the kernel with, searching for it if needed.
    ///
    /// A stored configuration the device can launch is returned without launching the kernel.
    /// Otherwise, with tuning disabled the kernel's default configuration is stored, and with
    /// tuning enabled every candidate of the kernel's configuration space is measured and the
    /// fastest one is stored.
    /// Nothing is stored when an error is returned.
    pub fn tune_launch<T: Tunable>(
        &self,
        tunable: &mut T,
        stream: &T::Stream,
        ctx: &TuneContext,
        mode: TuneMode,
        verbosity: Verbosity,
    ) -> Result<TuneParam, TuneError> {
        let key = tunable.tune_key();

        if mode != TuneMode::Force {
            if let Some(param) = self.cached(&key, ctx) {
                return Ok(param);
            }
        }

        let search = self.search_lock(&key);
        let tuned = {
            let _guard = search.lock().unwrap_or_else(PoisonError::into_inner);
            self.tune_locked(tunable, stream, ctx, &key, mode, verbosity)
        };
        self.release_search_lock(&key, search);

        tuned
    }

    /// The configuration stored for the key.
    pub fn lookup(&self, key: &TuneKey) -> Option<TuneParam> {
        self.cache.read().lookup(key)
    }

    /// Number of kernels with a stored configuration.
    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    /// Whether no kernel has a stored configuration.
    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }

    /// Reset the launch counts used by profile reports.
    pub fn flush_profile(&self) {
        self.cache.write().flush();
    }

    /// Forget every stored configuration.
    pub fn clear(&self) {
        self.cache.write().clear();
    }

    fn tune_locked<T: Tunable>(
        &self,
        tunable: &mut T,
        stream: &T::Stream,
        ctx: &TuneContext,
        key: &TuneKey,
        mode: TuneMode,
        verbosity: Verbosity,
    ) -> Result<TuneParam, TuneError> {
        // Another caller may have tuned the kernel while we were waiting.
        if mode != TuneMode::Force {
            if let Some(param) = self.cached(key, ctx) {
                return Ok(param);
            }
        }

        let param = match mode {
            TuneMode::Disabled => {
                let mut param = tunable.default_tune_param(ctx)?;
                check_launch_param(&param, ctx.properties())?;
                param.comment = tunable.param_string(&param);
                param
            }
            TuneMode::Enabled | TuneMode::Force => {
                self.search(tunable, stream, ctx, key, verbosity)?
            }
        };

        self.cache.write().insert(key.clone(), param.clone());

        #[cfg(std_io)]
        if self.persist_on_tune {
            if let Err(err) = self.save() {
                log::warn!("Unable to save the tuning cache of {}: {err}", self.name);
            }
        }

        Ok(param)
    }

    // A stored configuration the device can't launch, e.g. loaded from a snapshot written for
    // another device, is treated as missing and tuned again.
    fn cached(&self, key: &TuneKey, ctx: &TuneContext) -> Option<TuneParam> {
        let param = if self.profile {
            self.cache.write().record_call(key)
        } else {
            self.cache.read().lookup(key)
        }?;

        match check_launch_param(&param, ctx.properties()) {
            Ok(()) => Some(param),
            Err(err) => {
                log::warn!("Ignoring the stored configuration of {key}: {err}");
                None
            }
        }
    }

    fn search_lock(&self, key: &TuneKey) -> Arc<std::sync::Mutex<()>> {
        self.searches.lock().entry(key.clone()).or_default().clone()
    }

    fn release_search_lock(&self, key: &TuneKey, search: Arc<std::sync::Mutex<()>>) {
        let mut searches = self.searches.lock();

        // Only the map and this caller own the lock, so nobody is waiting on it.
        if Arc::strong_count(&search) == 2 {
            searches.remove(key);
        }
    }

    fn search<T: Tunable>(
        &self,
        tunable: &mut T,
        stream: &T::Stream,
        ctx: &TuneContext,
        key: &TuneKey,
        verbosity: Verbosity,
    ) -> Result<TuneParam, TuneError> {
        self.log(verbosity, Verbosity::Verbose, || format!("Tuning {key}"));

        let mut param = tunable.init_tune_param(ctx)?;
        let mut best: Option<TuneParam> = None;
        let mut failure: Option<LaunchError> = None;
        let mut candidates = 0;

        loop {
            check_launch_param(&param, ctx.properties())?;
            candidates += 1;

            let measured = TuneBenchmark::new(tunable, stream).run(&param);
            match measured {
                Ok(time) => {
                    self.log(verbosity, Verbosity::DebugVerbose, || {
                        format!(
                            "{key}: {} gives {time:e} s ({})",
                            tunable.param_string(&param),
                            tunable.perf_string(time)
                        )
                    });

                    if best.as_ref().map_or(true, |best| time < best.time) {
                        param.time = time;
                        best = Some(param.clone());
                    }
                }
                Err(err) => {
                    self.log(verbosity, Verbosity::DebugVerbose, || {
                        format!("{key}: {} failed: {err}", tunable.param_string(&param))
                    });
                    failure = Some(err);
                }
            }

            if !tunable.advance_tune_param(&mut param, ctx)? {
                break;
            }
        }

        let Some(mut best) = best else {
            return Err(TuneError::NoValidCandidate {
                key: key.clone(),
                candidates,
                source: failure.unwrap_or_else(|| LaunchError::Rejected {
                    reason: String::from("no candidate was launched"),
                }),
            });
        };

        best.n_calls = 0;
        best.comment = format!(
            "{}, {}",
            tunable.param_string(&best),
            tunable.perf_string(best.time)
        );
        self.log(verbosity, Verbosity::Summarize, || {
            format!(
                "Tuned {key} in {candidates} candidates, giving {}",
                best.comment
            )
        });

        Ok(best)
    }

    fn log<F: FnOnce() -> String>(&self, verbosity: Verbosity, required: Verbosity, msg: F) {
        let mut logger = self.logger.lock();
        let verbosity = match logger.log_level_autotune() {
            AutotuneLogLevel::Disabled => return,
            AutotuneLogLevel::Minimal => verbosity,
            AutotuneLogLevel::Full => verbosity.max(Verbosity::Verbose),
        };

        if verbosity >= required {
            logger.log_autotune(&msg());
        }
    }
}

#[cfg(std_io)]
impl Tuner {
    /// Directory holding the persisted files of this tuner.
    pub fn cache_dir(&self) -> &std::path::Path {
        &self.cache_dir
    }

    /// Path of the tuning cache snapshot.
    pub fn snapshot_path(&self) -> PathBuf {
        self.cache_dir.join(CACHE_FILE_NAME)
    }

    /// Merge the persisted snapshot into the cache, returning the number of entries added.
    pub fn load(&self) -> usize {
        let path = self.snapshot_path();
        let loaded = self.cache.write().load_from_snapshot(&path);

        let mut logger = self.logger.lock();
        if loaded > 0 && logger.log_level_autotune() == AutotuneLogLevel::Full {
            logger.log_autotune(&format!("Loaded {loaded} tuned kernels from {path:?}"));
        }

        loaded
    }

    /// Save the cache to the snapshot, returning the number of entries written.
    pub fn save(&self) -> Result<usize, PersistError> {
        let path = self.snapshot_path();
        let saved = self.cache.read().save_snapshot(&path)?;

        let mut logger = self.logger.lock();
        if logger.log_level_autotune() == AutotuneLogLevel::Full {
            logger.log_autotune(&format!("Saved {saved} tuned kernels to {path:?}"));
        }

        Ok(saved)
    }

    /// Write the launch profile to `profile_<label>.tsv`, or `profile.tsv` when the label is
    /// empty, next to the snapshot. Returns the path written.
    pub fn save_profile(&self, label: &str) -> Result<PathBuf, PersistError> {
        let file_name = match label {
            "" => String::from("profile.tsv"),
            label => sanitize_filename::sanitize(format!("profile_{label}.tsv")),
        };
        let path = self.cache_dir.join(file_name);

        self.cache.read().save_profile(&path)?;

        Ok(path)
    }
}

/// The process-wide tuner, created on first use from the global configuration.
pub fn global_tuner() -> Arc<Tuner> {
    let mut state = GLOBAL_TUNER.lock();

    match state.as_ref() {
        Some(tuner) => tuner.clone(),
        None => {
            let tuner = Arc::new(Tuner::new(DEFAULT_TUNER_NAME));
            *state = Some(tuner.clone());
            tuner
        }
    }
}

/// Return the configuration to launch the kernel with, using the process-wide tuner.
///
/// See [Tuner::tune_launch].
pub fn tune_launch<T: Tunable>(
    tunable: &mut T,
    stream: &T::Stream,
    ctx: &TuneContext,
    mode: TuneMode,
    verbosity: Verbosity,
) -> Result<TuneParam, TuneError> {
    global_tuner().tune_launch(tunable, stream, ctx, mode, verbosity)
}

/// Merge the persisted snapshot into the process-wide cache.
#[cfg(std_io)]
pub fn load_tune_cache() -> usize {
    global_tuner().load()
}

/// Save the process-wide cache to its snapshot.
#[cfg(std_io)]
pub fn save_tune_cache() -> Result<usize, PersistError> {
    global_tuner().save()
}

/// Write the launch profile of the process-wide cache.
#[cfg(std_io)]
pub fn save_profile(label: &str) -> Result<PathBuf, PersistError> {
    global_tuner().save_profile(label)
}

/// Reset the launch counts of the process-wide cache.
pub fn flush_profile() {
    global_tuner().flush_profile()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tune::{
        traversal::tests::{context, TestKernel},
        HostStream, LaunchDim,
    };
    use pretty_assertions::assert_eq;

    fn tuner() -> Tuner {
        Tuner::from_config("tuner-tests", &AutotuneConfig::default())
    }

    #[test_log::test]
    fn search_locks_are_released_after_tuning() {
        let tuner = tuner();
        let ctx = context();
        let mut kernel = TestKernel::default();

        for mode in [TuneMode::Enabled, TuneMode::Force, TuneMode::Enabled] {
            tuner
                .tune_launch(&mut kernel, &HostStream, &ctx, mode, Verbosity::Silent)
                .unwrap();
            assert!(tuner.searches.lock().is_empty());
        }
        assert_eq!(tuner.len(), 1);
    }

    #[test_log::test]
    fn failed_tuning_releases_its_search_lock() {
        let tuner = tuner();
        let ctx = context();
        let mut kernel = TestKernel {
            per_block: ctx.properties().max_shared_memory_per_block + 1,
            ..Default::default()
        };

        let err = tuner
            .tune_launch(&mut kernel, &HostStream, &ctx, TuneMode::Disabled, Verbosity::Silent)
            .unwrap_err();

        assert!(matches!(err, TuneError::SharedMemory { .. }));
        assert!(tuner.searches.lock().is_empty());
        assert!(tuner.is_empty());
    }

    #[test_log::test]
    fn unlaunchable_stored_configuration_is_tuned_again() {
        let tuner = tuner();
        let ctx = context();
        let mut kernel = TestKernel::default();
        let stored = TuneParam {
            block: LaunchDim::new_2d(0, 4096),
            shared_bytes: 999_999,
            ..Default::default()
        };
        tuner.cache.write().insert(kernel.tune_key(), stored);

        let param = tuner
            .tune_launch(&mut kernel, &HostStream, &ctx, TuneMode::Disabled, Verbosity::Silent)
            .unwrap();

        let default = kernel.default_tune_param(&ctx).unwrap();
        assert_eq!(param.block, default.block);
        assert_eq!(param.grid, default.grid);
        assert_eq!(param.shared_bytes, 0);
        assert_eq!(tuner.lookup(&kernel.tune_key()), Some(param));
    }
}
