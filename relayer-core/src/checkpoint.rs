//! Durable cursor separating "fully processed" source history from
//! "not yet processed". Persisted as decimal ASCII via write-temp,
//! rename-over so a crash never leaves a torn file.

use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;

pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns 0 if no checkpoint file exists yet.
    pub fn load(&self) -> u64 {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents.trim().parse().unwrap_or(0),
            Err(_) => 0,
        }
    }

    /// Atomically persist `block_height`. The caller promises to call
    /// this only after every lock event with `source_block <= block_height`
    /// has reached terminal status. A write failure is logged and
    /// swallowed: correctness survives re-scanning on next start, so
    /// this is not a fatal condition (see error taxonomy, §7).
    pub fn store(&self, block_height: u64) {
        if let Err(err) = atomic_write(&self.path, block_height) {
            warn!(
                path = %self.path.display(),
                error = %err,
                "failed to persist checkpoint; next restart will re-scan"
            );
        }
    }
}

fn atomic_write(path: &Path, block_height: u64) -> io::Result<()> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    let tmp_path = match dir {
        Some(dir) => dir.join(format!(
            ".{}.tmp",
            path.file_name().and_then(|n| n.to_str()).unwrap_or("checkpoint")
        )),
        None => PathBuf::from(format!(
            ".{}.tmp",
            path.file_name().and_then(|n| n.to_str()).unwrap_or("checkpoint")
        )),
    };

    std::fs::write(&tmp_path, format!("{block_height}\n"))?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_file_returns_zero() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("checkpoint.txt"));
        assert_eq!(store.load(), 0);
    }

    #[test]
    fn store_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("checkpoint.txt"));
        store.store(42);
        assert_eq!(store.load(), 42);
    }

    #[test]
    fn store_is_monotonic_in_practice() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("checkpoint.txt"));
        store.store(10);
        store.store(20);
        assert_eq!(store.load(), 20);
    }

    #[test]
    fn no_tmp_file_survives_a_successful_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint.txt");
        let store = CheckpointStore::new(&path);
        store.store(5);

        let tmp = dir.path().join(".checkpoint.txt.tmp");
        assert!(!tmp.exists());
        assert!(path.exists());
    }

    #[test]
    fn trailing_newline_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint.txt");
        std::fs::write(&path, "100\n").unwrap();
        let store = CheckpointStore::new(&path);
        assert_eq!(store.load(), 100);
    }

    #[test]
    fn malformed_contents_fall_back_to_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint.txt");
        std::fs::write(&path, "not-a-number").unwrap();
        let store = CheckpointStore::new(&path);
        assert_eq!(store.load(), 0);
    }
}
