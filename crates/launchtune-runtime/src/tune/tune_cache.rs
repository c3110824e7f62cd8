#[cfg(std_io)]
mod std_imports {
    pub use std::fs;
    pub use std::io;
    pub use std::path::Path;
}

#[cfg(std_io)]
use std_imports::*;

#[cfg(std_io)]
use super::PersistError;
#[cfg(std_io)]
use launchtune_common::lock_file::{LockFile, LockOptions};

use super::{TuneKey, TuneParam};
use hashbrown::HashMap;

/// Name of the snapshot file inside the cache directory.
pub const CACHE_FILE_NAME: &str = "tunecache.json";

/// Version written in snapshots. Snapshots of other versions are ignored.
pub const CACHE_VERSION: &str = concat!("launchtune-", env!("CARGO_PKG_VERSION"));

/// Best known configuration of every kernel tuned so far, keyed by kernel identity.
#[derive(Debug, Default)]
pub struct TuneCache {
    entries: HashMap<TuneKey, TuneParam>,
    device: String,
}

/// Persisted form of a [TuneCache].
#[cfg(std_io)]
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct Snapshot {
    version: String,
    device: String,
    entries: Vec<(TuneKey, TuneParam)>,
}

impl TuneCache {
    /// Create an empty cache for the given device.
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            entries: HashMap::new(),
            device: device.into(),
        }
    }

    /// The configuration stored for the key.
    pub fn lookup(&self, key: &TuneKey) -> Option<TuneParam> {
        self.entries.get(key).cloned()
    }

    /// Count a launch of the kernel and return its stored configuration.
    pub fn record_call(&mut self, key: &TuneKey) -> Option<TuneParam> {
        let param = self.entries.get_mut(key)?;
        param.n_calls += 1;
        Some(param.clone())
    }

    /// Store the configuration for the key, replacing any previous one.
    pub fn insert(&mut self, key: TuneKey, param: TuneParam) {
        self.entries.insert(key, param);
    }

    /// Reset the launch counts of every entry, keeping the configurations.
    pub fn flush(&mut self) {
        for param in self.entries.values_mut() {
            param.n_calls = 0;
        }
    }

    /// Remove every entry, so that all kernels are tuned again.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the entries in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&TuneKey, &TuneParam)> {
        self.entries.iter()
    }

    #[cfg(std_io)]
    fn sorted_entries(&self) -> Vec<(&TuneKey, &TuneParam)> {
        let mut entries: Vec<_> = self.entries.iter().collect();
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        entries
    }
}

#[cfg(std_io)]
impl TuneCache {
    /// Merge the entries of the snapshot at `path` into the cache, returning how many were added.
    ///
    /// Loading is best effort: a missing, malformed or outdated snapshot leaves the cache
    /// unchanged. Entries already in memory take precedence over persisted ones.
    pub fn load_from_snapshot<P: AsRef<Path>>(&mut self, path: P) -> usize {
        let path = path.as_ref();

        let entries = match self.read_snapshot(path) {
            Ok(entries) => entries,
            Err(PersistError::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
                log::debug!("No tuning cache at {path:?}");
                return 0;
            }
            Err(err) => {
                log::warn!("Unable to load tuning cache {path:?}. Cache will be ignored ({err}).");
                return 0;
            }
        };

        let mut loaded = 0;
        for (key, param) in entries {
            if let hashbrown::hash_map::Entry::Vacant(entry) = self.entries.entry(key) {
                entry.insert(param);
                loaded += 1;
            }
        }

        loaded
    }

    /// Read the entries of a snapshot written for the device of this cache.
    ///
    /// Entries that no kernel could have produced, with an empty launch dimension or a key over
    /// its capacity, are skipped.
    pub fn read_snapshot<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<Vec<(TuneKey, TuneParam)>, PersistError> {
        // Reading the whole file first is faster than `serde_json::from_reader`.
        let data = fs::read_to_string(path)?;
        let snapshot: Snapshot = serde_json::from_str(&data)?;

        if snapshot.version != CACHE_VERSION {
            return Err(PersistError::Version {
                found: snapshot.version,
                expected: CACHE_VERSION.to_string(),
            });
        }

        if snapshot.device != self.device {
            return Err(PersistError::Device {
                found: snapshot.device,
                expected: self.device.clone(),
            });
        }

        let entries = snapshot
            .entries
            .into_iter()
            .filter(|(key, param)| match check_entry(key, param) {
                Ok(()) => true,
                Err(reason) => {
                    log::warn!("Skipping corrupt tuning cache entry {key}: {reason}");
                    false
                }
            })
            .collect();

        Ok(entries)
    }

    /// Write every entry to the snapshot at `path`, returning the number of entries written.
    ///
    /// Entries are sorted by key so that identical caches produce identical files.
    pub fn save_snapshot<P: AsRef<Path>>(&self, path: P) -> Result<usize, PersistError> {
        let path = path.as_ref();
        let _lock = LockFile::acquire(path, LockOptions::default())?.ok_or_else(|| {
            PersistError::Locked {
                path: LockFile::lock_path(path),
            }
        })?;

        let snapshot = Snapshot {
            version: CACHE_VERSION.to_string(),
            device: self.device.clone(),
            entries: self
                .sorted_entries()
                .into_iter()
                .map(|(key, param)| (key.clone(), param.clone()))
                .collect(),
        };

        let data = serde_json::to_string_pretty(&snapshot)?;
        fs::write(path, data)?;

        Ok(snapshot.entries.len())
    }

    /// Write the launch profile of every entry to `path` as tab separated values, the most
    /// expensive kernels first.
    pub fn save_profile<P: AsRef<Path>>(&self, path: P) -> Result<usize, PersistError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut rows: Vec<_> = self
            .sorted_entries()
            .into_iter()
            .map(|(key, param)| (total_time(param), key, param))
            .collect();
        rows.sort_by(|(a, ..), (b, ..)| b.total_cmp(a));

        let mut out = String::from("# total time\tcalls\ttime per call\tvolume\tname\taux\tcomment\n");
        for (total, key, param) in rows.iter() {
            let time = if param.is_measured() { param.time } else { 0.0 };
            out += &format!(
                "{total:.6}\t{}\t{time:.6}\t{}\t{}\t{}\t{}\n",
                param.n_calls,
                key.volume(),
                key.name(),
                key.aux(),
                param.comment.replace(['\t', '\n'], " "),
            );
        }

        fs::write(path, out)?;

        Ok(rows.len())
    }
}

#[cfg(std_io)]
fn check_entry(key: &TuneKey, param: &TuneParam) -> Result<(), String> {
    TuneKey::new(key.name(), key.volume(), key.aux()).map_err(|err| err.to_string())?;

    let dims = [param.block, param.grid];
    if dims.iter().any(|dim| dim.num_elems() == 0) {
        return Err(format!("empty launch dimension {} {}", param.block, param.grid));
    }

    Ok(())
}

#[cfg(std_io)]
fn total_time(param: &TuneParam) -> f64 {
    if param.is_measured() {
        param.time * param.n_calls as f64
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tune::LaunchDim;
    use pretty_assertions::assert_eq;

    fn key(name: &str, volume: &str) -> TuneKey {
        TuneKey::new(name, volume, "prec=4").unwrap()
    }

    fn param(block: u32, time: f64, n_calls: u64) -> TuneParam {
        TuneParam {
            block: LaunchDim::new_1d(block),
            time,
            n_calls,
            comment: format!("block={block}"),
            ..Default::default()
        }
    }

    #[test]
    fn lookup_returns_a_copy() {
        let mut cache = TuneCache::new("test-device");
        cache.insert(key("axpy", "16x16"), param(64, 1e-3, 0));

        let mut found = cache.lookup(&key("axpy", "16x16")).unwrap();
        found.block.x = 128;

        assert_eq!(cache.lookup(&key("axpy", "16x16")).unwrap().block.x, 64);
        assert_eq!(cache.lookup(&key("axpy", "8x8")), None);
    }

    #[test]
    fn flush_resets_counts_and_keeps_keys() {
        let mut cache = TuneCache::new("test-device");
        cache.insert(key("axpy", "16x16"), param(64, 1e-3, 0));
        cache.record_call(&key("axpy", "16x16"));
        cache.record_call(&key("axpy", "16x16"));
        assert_eq!(cache.lookup(&key("axpy", "16x16")).unwrap().n_calls, 2);

        cache.flush();

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.lookup(&key("axpy", "16x16")).unwrap().n_calls, 0);
    }

    #[test]
    fn clear_removes_every_entry() {
        let mut cache = TuneCache::new("test-device");
        cache.insert(key("axpy", "16x16"), param(64, 1e-3, 0));
        cache.insert(key("dot", "16x16"), param(32, 2e-3, 0));

        cache.clear();

        assert!(cache.is_empty());
        assert_eq!(cache.record_call(&key("axpy", "16x16")), None);
    }

    #[cfg(std_io)]
    mod persistence {
        use super::*;
        use pretty_assertions::assert_eq;

        fn scratch_dir(name: &str) -> std::path::PathBuf {
            let dir = std::env::temp_dir()
                .join("launchtune-tests")
                .join(format!("{name}-{}", std::process::id()));
            let _ = fs::remove_dir_all(&dir);
            fs::create_dir_all(&dir).unwrap();
            dir
        }

        #[test]
        fn snapshot_round_trip() {
            let path = scratch_dir("snapshot_round_trip").join(CACHE_FILE_NAME);
            let mut cache = TuneCache::new("test-device");
            cache.insert(key("axpy", "16x16"), param(64, 1e-3, 0));
            cache.insert(key("dot", "8x8"), param(32, f64::INFINITY, 0));

            assert_eq!(cache.save_snapshot(&path).unwrap(), 2);
            assert!(!LockFile::lock_path(&path).exists());

            let mut loaded = TuneCache::new("test-device");
            assert_eq!(loaded.load_from_snapshot(&path), 2);

            assert_eq!(loaded.lookup(&key("axpy", "16x16")), cache.lookup(&key("axpy", "16x16")));
            assert_eq!(loaded.lookup(&key("dot", "8x8")), cache.lookup(&key("dot", "8x8")));
        }

        #[test]
        fn snapshots_are_deterministic() {
            let dir = scratch_dir("snapshots_are_deterministic");
            let mut first = TuneCache::new("test-device");
            let mut second = TuneCache::new("test-device");
            for volume in ["4x4", "8x8", "16x16", "2x2"] {
                first.insert(key("axpy", volume), param(64, 1e-3, 0));
            }
            for volume in ["2x2", "16x16", "8x8", "4x4"] {
                second.insert(key("axpy", volume), param(64, 1e-3, 0));
            }

            first.save_snapshot(dir.join("first.json")).unwrap();
            second.save_snapshot(dir.join("second.json")).unwrap();

            assert_eq!(
                fs::read_to_string(dir.join("first.json")).unwrap(),
                fs::read_to_string(dir.join("second.json")).unwrap()
            );
        }

        #[test]
        fn missing_or_corrupt_snapshot_is_ignored() {
            let dir = scratch_dir("missing_or_corrupt_snapshot_is_ignored");
            fs::write(dir.join("corrupt.json"), "{ not json").unwrap();
            let mut cache = TuneCache::new("test-device");

            assert_eq!(cache.load_from_snapshot(dir.join("missing.json")), 0);
            assert_eq!(cache.load_from_snapshot(dir.join("corrupt.json")), 0);
            assert!(cache.is_empty());
        }

        #[test]
        fn stale_version_is_rejected() {
            let path = scratch_dir("stale_version_is_rejected").join(CACHE_FILE_NAME);
            fs::write(
                &path,
                r#"{ "version": "launchtune-0.0.0", "device": "test-device", "entries": [] }"#,
            )
            .unwrap();

            let err = TuneCache::new("test-device").read_snapshot(&path).unwrap_err();

            assert!(matches!(err, PersistError::Version { .. }));
        }

        #[test]
        fn snapshot_of_another_device_is_rejected() {
            let path = scratch_dir("snapshot_of_another_device_is_rejected").join(CACHE_FILE_NAME);
            let mut cache = TuneCache::new("test-device");
            cache.insert(key("axpy", "16x16"), param(64, 1e-3, 0));
            cache.save_snapshot(&path).unwrap();

            let mut other = TuneCache::new("other-device");
            let err = other.read_snapshot(&path).unwrap_err();

            assert!(matches!(err, PersistError::Device { .. }));
            assert_eq!(other.load_from_snapshot(&path), 0);
            assert!(other.is_empty());
        }

        #[test]
        fn corrupt_entries_are_skipped() {
            let path = scratch_dir("corrupt_entries_are_skipped").join(CACHE_FILE_NAME);
            let entry = |name: &str, block: &str| {
                format!(
                    r#"[{{ "volume": "16x16", "name": "{name}", "aux": "prec=4" }},
                        {{ "block": {block}, "grid": {{ "x": 2, "y": 1, "z": 1 }},
                          "shared_bytes": 0, "aux": [1, 1, 1, 1], "comment": "",
                          "time": 0.001, "n_calls": 0 }}]"#
                )
            };
            let valid = r#"{ "x": 64, "y": 1, "z": 1 }"#;
            let long_name = "k".repeat(TuneKey::NAME_MAX_LEN + 1);
            let entries = [
                entry("axpy", valid),
                entry("empty", r#"{ "x": 0, "y": 4096, "z": 1 }"#),
                entry(&long_name, valid),
            ];
            fs::write(
                &path,
                format!(
                    r#"{{ "version": "{CACHE_VERSION}", "device": "test-device", "entries": [{}] }}"#,
                    entries.join(",")
                ),
            )
            .unwrap();

            let mut cache = TuneCache::new("test-device");

            assert_eq!(cache.load_from_snapshot(&path), 1);
            assert_eq!(cache.lookup(&key("axpy", "16x16")).unwrap().block.x, 64);
        }

        #[test]
        fn locked_snapshot_is_not_written() {
            let path = scratch_dir("locked_snapshot_is_not_written").join(CACHE_FILE_NAME);
            let _held = LockFile::acquire(&path, LockOptions::default()).unwrap();
            let mut cache = TuneCache::new("test-device");
            cache.insert(key("axpy", "16x16"), param(64, 1e-3, 0));

            let err = cache.save_snapshot(&path).unwrap_err();

            assert!(matches!(err, PersistError::Locked { .. }));
            assert!(!path.exists());
        }

        #[test]
        fn lock_left_by_a_crashed_save_is_recovered() {
            let path = scratch_dir("lock_left_by_a_crashed_save_is_recovered").join(CACHE_FILE_NAME);
            let lock = LockFile::lock_path(&path);
            fs::write(&lock, "4242\n").unwrap();
            let an_hour_ago = std::time::SystemTime::now() - std::time::Duration::from_secs(3600);
            fs::File::options()
                .write(true)
                .open(&lock)
                .unwrap()
                .set_modified(an_hour_ago)
                .unwrap();
            let mut cache = TuneCache::new("test-device");
            cache.insert(key("axpy", "16x16"), param(64, 1e-3, 0));

            assert_eq!(cache.save_snapshot(&path).unwrap(), 1);
            assert_eq!(cache.save_snapshot(&path).unwrap(), 1);
            assert!(!lock.exists());
        }

        #[test]
        fn profile_lists_most_expensive_kernels_first() {
            let path = scratch_dir("profile_lists_most_expensive_kernels_first").join("profile.tsv");
            let mut cache = TuneCache::new("test-device");
            cache.insert(key("cheap", "16x16"), param(64, 1e-3, 2));
            cache.insert(key("costly", "16x16"), param(32, 1e-2, 5));
            cache.insert(key("unmeasured", "16x16"), param(32, f64::INFINITY, 0));

            assert_eq!(cache.save_profile(&path).unwrap(), 3);

            let profile = fs::read_to_string(&path).unwrap();
            let names: Vec<_> = profile
                .lines()
                .skip(1)
                .map(|line| line.split('\t').nth(4).unwrap())
                .collect();
            assert_eq!(names, ["costly", "cheap", "unmeasured"]);
            assert!(profile.contains("0.050000\t5\t0.010000\t16x16\tcostly\tprec=4\tblock=32"));
        }
    }
}
