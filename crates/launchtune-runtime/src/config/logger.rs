use super::{autotune::AutotuneLogLevel, GlobalConfig};
use core::fmt::Display;

#[cfg(std_io)]
use std::{
    fs::{File, OpenOptions},
    io::{BufWriter, Write},
    path::PathBuf,
};

/// Configuration for logging, parameterized by a log level type.
///
/// Note that you can use multiple outputs at the same time.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(bound = "")]
pub struct LoggerConfig<L: LogLevel> {
    /// Path to the log file, if file logging is enabled.
    #[serde(default)]
    #[cfg(std_io)]
    pub file: Option<PathBuf>,

    /// Whether to append to the log file (true) or overwrite it (false). Defaults to true.
    #[serde(default = "append_default")]
    pub append: bool,

    /// Whether to log to standard output.
    #[serde(default)]
    pub stdout: bool,

    /// Whether to log to standard error.
    #[serde(default)]
    pub stderr: bool,

    /// Optional crate-level logging configuration (e.g., info, debug, trace).
    #[serde(default = "log_default")]
    pub log: Option<LogCrateLevel>,

    /// The log level for this logger, determining verbosity.
    #[serde(default)]
    pub level: L,
}

impl<L: LogLevel> Default for LoggerConfig<L> {
    fn default() -> Self {
        Self {
            #[cfg(std_io)]
            file: None,
            append: true,
            stdout: false,
            stderr: false,
            log: log_default(),
            level: L::default(),
        }
    }
}

/// Log levels using the `log` crate.
#[derive(
    Clone, Copy, Debug, Default, serde::Serialize, serde::Deserialize, Hash, PartialEq, Eq,
)]
pub enum LogCrateLevel {
    /// Logs informational messages.
    #[default]
    #[serde(rename = "info")]
    Info,

    /// Logs debugging messages.
    #[serde(rename = "debug")]
    Debug,

    /// Logs trace-level messages.
    #[serde(rename = "trace")]
    Trace,
}

fn append_default() -> bool {
    true
}

fn log_default() -> Option<LogCrateLevel> {
    Some(LogCrateLevel::Info)
}

/// Trait for types that can be used as log levels in `LoggerConfig`.
pub trait LogLevel:
    serde::de::DeserializeOwned + serde::Serialize + Clone + Copy + core::fmt::Debug + Default
{
}

/// Routes autotune messages to every configured output.
#[derive(Debug)]
pub struct Logger {
    loggers: Vec<LoggerKind>,
    level: AutotuneLogLevel,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(&GlobalConfig::get().autotune.logger)
    }
}

impl Logger {
    /// Creates a new `Logger` from the given configuration.
    ///
    /// Note that creating a logger opens the log file, if any.
    pub fn new(config: &LoggerConfig<AutotuneLogLevel>) -> Self {
        let mut loggers = Vec::new();

        if let AutotuneLogLevel::Disabled = config.level {
            return Self {
                loggers,
                level: config.level,
            };
        }

        #[cfg(std_io)]
        if let Some(file) = &config.file {
            match FileLogger::new(file, config.append) {
                Ok(logger) => loggers.push(LoggerKind::File(logger)),
                Err(err) => log::warn!("Unable to open autotune log file {file:?}: {err}"),
            }
        }

        if config.stdout {
            loggers.push(LoggerKind::Stdout);
        }

        if config.stderr {
            loggers.push(LoggerKind::Stderr);
        }

        if let Some(level) = config.log {
            loggers.push(LoggerKind::Log(level));
        }

        Self {
            loggers,
            level: config.level,
        }
    }

    /// Logs a message for autotuning, directing it to all configured outputs.
    pub fn log_autotune<S: Display>(&mut self, msg: &S) {
        if self.loggers.len() > 1 {
            let msg = msg.to_string();
            for logger in self.loggers.iter_mut() {
                logger.log(&msg);
            }
        } else if let Some(logger) = self.loggers.first_mut() {
            logger.log(msg);
        }
    }

    /// Returns the autotune log level.
    pub fn log_level_autotune(&self) -> AutotuneLogLevel {
        self.level
    }
}

/// Represents different types of loggers.
#[derive(Debug)]
enum LoggerKind {
    /// Logs to a file.
    #[cfg(std_io)]
    File(FileLogger),

    /// Logs to standard output.
    Stdout,

    /// Logs to standard error.
    Stderr,

    /// Logs using the `log` crate with a specified level.
    Log(LogCrateLevel),
}

impl LoggerKind {
    fn log<S: Display>(&mut self, msg: &S) {
        match self {
            #[cfg(std_io)]
            LoggerKind::File(file_logger) => file_logger.log(msg),
            LoggerKind::Stdout => println!("{msg}"),
            LoggerKind::Stderr => eprintln!("{msg}"),
            LoggerKind::Log(level) => match level {
                LogCrateLevel::Info => log::info!("{msg}"),
                LogCrateLevel::Debug => log::debug!("{msg}"),
                LogCrateLevel::Trace => log::trace!("{msg}"),
            },
        }
    }
}

/// Logger that writes messages to a file.
#[derive(Debug)]
#[cfg(std_io)]
struct FileLogger {
    writer: BufWriter<File>,
}

#[cfg(std_io)]
impl FileLogger {
    fn new(path: &PathBuf, append: bool) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .append(append)
            .truncate(!append)
            .create(true)
            .open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    // Flushes on every message so the file is readable while tuning runs.
    fn log<S: Display>(&mut self, msg: &S) {
        let written = writeln!(self.writer, "{msg}").and_then(|_| self.writer.flush());
        if let Err(err) = written {
            log::warn!("Unable to write to the autotune log file: {err}");
        }
    }
}

#[cfg(all(test, std_io))]
mod tests {
    use super::*;

    #[test]
    fn disabled_logger_has_no_output() {
        let config = LoggerConfig::<AutotuneLogLevel> {
            stdout: true,
            level: AutotuneLogLevel::Disabled,
            ..Default::default()
        };

        let logger = Logger::new(&config);

        assert!(logger.loggers.is_empty());
    }

    #[test]
    fn file_logger_writes_messages() {
        let path = std::env::temp_dir().join(format!(
            "launchtune-logger-{}.log",
            std::process::id()
        ));
        let config = LoggerConfig::<AutotuneLogLevel> {
            file: Some(path.clone()),
            append: false,
            log: None,
            ..Default::default()
        };

        let mut logger = Logger::new(&config);
        logger.log_autotune(&"Fastest result dslash");
        drop(logger);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "Fastest result dslash\n");
        std::fs::remove_file(path).ok();
    }
}
