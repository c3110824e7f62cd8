use super::logger::{LogLevel, LoggerConfig};

/// Configuration of the tuner.
#[derive(Default, Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct AutotuneConfig {
    /// Where autotune messages are written.
    #[serde(default)]
    pub logger: LoggerConfig<AutotuneLogLevel>,
    /// Where the tuning cache snapshot lives.
    #[serde(default)]
    pub cache: AutotuneCache,
    /// Count the launches going through the tuner, for profile reports.
    #[serde(default)]
    pub profile: bool,
    /// Save the tuning cache each time a new kernel is tuned.
    #[serde(default)]
    pub persist_on_tune: bool,
    /// Block size from which block growth switches from additive to multiplicative.
    ///
    /// Defaults to the maximum block extent of the device.
    #[serde(default)]
    pub block_threshold: Option<u32>,
}

/// Root directory of the tuning cache snapshot.
#[derive(Default, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AutotuneCache {
    /// The current directory.
    #[serde(rename = "local")]
    Local,
    /// The `target` directory of the closest cargo project.
    #[default]
    #[serde(rename = "target")]
    Target,
    /// The user's local configuration directory.
    #[serde(rename = "global")]
    Global,
    /// An explicit directory.
    #[serde(rename = "file")]
    File(std::path::PathBuf),
}

/// Verbosity of the autotune logger.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AutotuneLogLevel {
    /// Nothing is logged.
    #[serde(rename = "disabled")]
    Disabled,
    /// Tuning results are logged.
    #[default]
    #[serde(rename = "minimal")]
    Minimal,
    /// Cache loads and saves are logged as well.
    #[serde(rename = "full")]
    Full,
}

impl LogLevel for AutotuneLogLevel {}

impl AutotuneCache {
    /// The root directory of the cache.
    pub fn root(&self) -> std::path::PathBuf {
        match self {
            AutotuneCache::Local => current_dir(),
            AutotuneCache::Target => {
                let dir_original = current_dir();
                let mut dir = dir_original.clone();

                loop {
                    if let Ok(true) = std::fs::exists(dir.join("Cargo.toml")) {
                        return dir.join("target");
                    }

                    if !dir.pop() {
                        break;
                    }
                }

                dir_original.join("target")
            }
            AutotuneCache::Global => global_dir(),
            AutotuneCache::File(path_buf) => path_buf.clone(),
        }
    }
}

fn current_dir() -> std::path::PathBuf {
    std::env::current_dir().unwrap_or_else(|_| std::path::PathBuf::from("."))
}

fn global_dir() -> std::path::PathBuf {
    cfg_if::cfg_if! {
        if #[cfg(feature = "std")] {
            dirs::config_local_dir().unwrap_or_else(current_dir)
        } else {
            current_dir()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_directory_is_its_own_root() {
        let cache = AutotuneCache::File("/var/cache/tuning".into());

        assert_eq!(cache.root(), std::path::PathBuf::from("/var/cache/tuning"));
    }

    #[test]
    fn target_root_ends_with_target() {
        assert!(AutotuneCache::Target.root().ends_with("target"));
    }
}
