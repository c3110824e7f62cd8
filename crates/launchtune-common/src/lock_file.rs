use core::{fmt::Display, time::Duration};
use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    time::SystemTime,
};

/// How long [LockFile::acquire] keeps trying before giving up.
#[derive(new, Debug, Clone, Copy)]
pub struct LockOptions {
    /// Number of attempts before reporting the lock as busy.
    pub max_try: u32,
    /// Time slept between two attempts.
    pub waiting_duration: Duration,
    /// Age after which a lock still present once every attempt failed is considered left behind
    /// by a process that died while holding it, and is removed.
    pub stale_after: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            max_try: 10,
            waiting_duration: Duration::from_millis(100),
            stale_after: Duration::from_secs(10),
        }
    }
}

/// A lock file is a sibling `<name>.lock` file whose existence marks the guarded file as being
/// written by some process.
///
/// The lock is created with `create_new`, so only one process can hold it at a time. It is
/// released when the value is dropped.
#[derive(Debug)]
pub struct LockFile {
    path_lock: PathBuf,
}

impl Display for LockFile {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Lock file: {:?}", self.path_lock)
    }
}

impl LockFile {
    /// The path of the lock guarding `path`.
    pub fn lock_path(path: &Path) -> PathBuf {
        let mut path_lock = path.to_path_buf();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        path_lock.set_file_name(format!("{file_name}.lock"));
        path_lock
    }

    /// Try to lock `path`.
    ///
    /// Returns `Ok(None)` when another holder kept the lock for all of the attempts. A lock older
    /// than [LockOptions::stale_after] at that point is removed and acquired instead.
    pub fn acquire<P: AsRef<Path>>(path: P, options: LockOptions) -> io::Result<Option<Self>> {
        let path = path.as_ref();
        let path_lock = Self::lock_path(path);

        if let Some(parent) = path_lock.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut current_try = 0;
        let mut reset = false;

        loop {
            match Self::create(&path_lock)? {
                Some(lock) => return Ok(Some(lock)),
                None => {
                    current_try += 1;
                    if current_try < options.max_try {
                        std::thread::sleep(options.waiting_duration);
                        continue;
                    }

                    if reset || !is_stale(&path_lock, options.stale_after) {
                        log::warn!("{path_lock:?} is held by another process");
                        return Ok(None);
                    }

                    // We hard reset the lock.
                    log::warn!("Removing stale lock {path_lock:?}");
                    match fs::remove_file(&path_lock) {
                        Err(err) if err.kind() != io::ErrorKind::NotFound => return Err(err),
                        _ => reset = true,
                    }
                }
            }
        }
    }

    fn create(path_lock: &Path) -> io::Result<Option<Self>> {
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path_lock)
        {
            Ok(mut file) => {
                // The content is only informative, the existence of the file is the lock.
                writeln!(file, "{}", std::process::id()).ok();
                Ok(Some(Self {
                    path_lock: path_lock.to_path_buf(),
                }))
            }
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// The path of the lock file itself.
    pub fn path(&self) -> &Path {
        &self.path_lock
    }
}

fn is_stale(path_lock: &Path, stale_after: Duration) -> bool {
    let modified = fs::metadata(path_lock).and_then(|metadata| metadata.modified());

    match modified {
        Ok(modified) => SystemTime::now()
            .duration_since(modified)
            .is_ok_and(|age| age >= stale_after),
        // Released between the last attempt and now.
        Err(_) => true,
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path_lock) {
            log::warn!("Unable to release {:?}: {err}", self.path_lock);
        }
    }
}
