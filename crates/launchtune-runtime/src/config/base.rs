use super::autotune::AutotuneConfig;
use std::sync::Arc;

/// Static mutex holding the global configuration, initialized as `None`.
static LAUNCHTUNE_GLOBAL_CONFIG: spin::Mutex<Option<Arc<GlobalConfig>>> = spin::Mutex::new(None);

/// Environment variable routing autotune logs: `stdout`, `stderr`, `0`/`false` or a file path.
pub const AUTOTUNE_LOG_ENV: &str = "LAUNCHTUNE_AUTOTUNE_LOG";
/// Environment variable selecting the cache root: `local`, `target`, `global` or a directory.
pub const AUTOTUNE_CACHE_ENV: &str = "LAUNCHTUNE_AUTOTUNE_CACHE";
/// Environment variable enabling launch counting for profile reports.
pub const AUTOTUNE_PROFILE_ENV: &str = "LAUNCHTUNE_AUTOTUNE_PROFILE";

/// Represents the global configuration for launchtune.
#[derive(Default, Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct GlobalConfig {
    /// Configuration for autotuning launch parameters.
    #[serde(default)]
    pub autotune: AutotuneConfig,
}

impl GlobalConfig {
    /// Retrieves the current global configuration, loading it from the current directory if not set.
    ///
    /// If no configuration is set, it attempts to load one from `launchtune.toml` in the current
    /// directory or its parents, then applies the environment overrides. If no file is found, a
    /// default configuration is used.
    ///
    /// # Notes
    ///
    /// Calling this function takes a global lock, so hot paths should read the configuration once
    /// and keep the values they need.
    pub fn get() -> Arc<Self> {
        let mut state = LAUNCHTUNE_GLOBAL_CONFIG.lock();
        match state.as_ref() {
            Some(config) => config.clone(),
            None => {
                cfg_if::cfg_if! {
                    if #[cfg(std_io)] {
                        let config = Self::from_current_dir().override_from_env();
                    } else {
                        let config = Self::default().override_from_env();
                    }
                }

                let config = Arc::new(config);
                *state = Some(config.clone());
                config
            }
        }
    }

    /// Sets the global configuration to the provided value.
    ///
    /// # Panics
    /// Panics if the configuration has already been set or read, as it cannot be overridden.
    ///
    /// # Warning
    /// This method must be called at the start of the program, before any calls to `get`.
    pub fn set(config: Self) {
        let mut state = LAUNCHTUNE_GLOBAL_CONFIG.lock();
        if state.is_some() {
            panic!("Cannot set the global configuration multiple times.");
        }
        *state = Some(Arc::new(config));
    }

    #[cfg(std_io)]
    /// Save the current configuration to the provided file path.
    pub fn save_default<P: AsRef<std::path::Path>>(path: P) -> std::io::Result<()> {
        let config = Self::get();
        let content = toml::to_string_pretty(config.as_ref()).map_err(std::io::Error::other)?;
        std::fs::write(path, content)
    }

    /// Overrides configuration fields based on environment variables.
    pub fn override_from_env(mut self) -> Self {
        use crate::config::autotune::{AutotuneCache, AutotuneLogLevel};

        if let Ok(val) = std::env::var(AUTOTUNE_LOG_ENV) {
            self.autotune.logger.level = AutotuneLogLevel::Full;

            match val.as_str() {
                "stdout" => self.autotune.logger.stdout = true,
                "stderr" => self.autotune.logger.stderr = true,
                "0" | "false" => self.autotune.logger.level = AutotuneLogLevel::Disabled,
                #[cfg(std_io)]
                file_path => self.autotune.logger.file = Some(file_path.into()),
                #[cfg(not(std_io))]
                _ => {}
            }
        }

        if let Ok(val) = std::env::var(AUTOTUNE_CACHE_ENV) {
            self.autotune.cache = match val.as_str() {
                "local" => AutotuneCache::Local,
                "target" => AutotuneCache::Target,
                "global" => AutotuneCache::Global,
                dir => AutotuneCache::File(dir.into()),
            };
        }

        if let Ok(val) = std::env::var(AUTOTUNE_PROFILE_ENV) {
            self.autotune.profile = matches!(val.as_str(), "1" | "true");
        }

        self
    }

    // Loads configuration from `launchtune.toml` in the current directory or its parents.
    //
    // Traverses up the directory tree until a valid configuration file is found or the root is
    // reached. Returns a default configuration if no file is found.
    #[cfg(std_io)]
    fn from_current_dir() -> Self {
        let mut dir = match std::env::current_dir() {
            Ok(dir) => dir,
            Err(_) => return Self::default(),
        };

        loop {
            if let Some(config) = Self::from_file_path(dir.join("launchtune.toml")) {
                return config;
            }

            if !dir.pop() {
                break;
            }
        }

        Self::default()
    }

    // Loads configuration from a specified file path, ignoring missing and malformed files.
    #[cfg(std_io)]
    fn from_file_path<P: AsRef<std::path::Path>>(path: P) -> Option<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).ok()?;

        match toml::from_str(&content) {
            Ok(config) => Some(config),
            Err(err) => {
                log::warn!("Ignoring malformed configuration file {path:?}: {err}");
                None
            }
        }
    }
}
