//! Discovery of timestamped log files written by the simulator.

use std::{
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

/// List all files in `dir` whose name matches the glob `pattern` (e.g. `load_balance_*.csv`).
/// Returns an empty list if the directory does not exist.
pub fn matching_files(dir: impl AsRef<Path>, pattern: &str) -> Vec<PathBuf> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        log::trace!("Skipping {dir:?} as it is not a directory.");
        return Vec::new();
    }

    let glob_path = format!(
        "{}/{pattern}",
        glob::Pattern::escape(&dir.to_string_lossy())
    );
    match glob::glob(&glob_path) {
        Ok(paths) => paths
            .filter_map(|entry| match entry {
                Ok(path) if path.is_file() => Some(path),
                Ok(_) => None,
                Err(e) => {
                    log::warn!("Cannot read {:?}: {e}", e.path());
                    None
                }
            })
            .collect(),
        Err(e) => {
            log::error!("Invalid file pattern {glob_path:?}: {e}");
            Vec::new()
        }
    }
}

fn modified(path: &Path) -> SystemTime {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

/// Pick the most recently modified file out of `paths`. Ties are broken by the path name so the
/// result does not depend on directory iteration order.
pub fn newest(paths: impl IntoIterator<Item = PathBuf>) -> Option<PathBuf> {
    paths
        .into_iter()
        .map(|p| (modified(&p), p))
        .max_by(|(ta, pa), (tb, pb)| ta.cmp(tb).then_with(|| pa.cmp(pb)))
        .map(|(_, p)| p)
}

/// Find the most recently modified file in `dir` matching `pattern`.
pub fn find_latest_file(dir: impl AsRef<Path>, pattern: &str) -> Option<PathBuf> {
    newest(matching_files(dir, pattern))
}

#[cfg(test)]
mod test {
    use std::{fs::File, time::Duration};

    use super::*;

    #[test]
    fn latest_by_modification_time() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("xpu_delay_1.csv");
        let new = dir.path().join("xpu_delay_0.csv");
        File::create(&old).unwrap();
        File::create(&new).unwrap();
        File::create(dir.path().join("other.csv")).unwrap();

        let now = SystemTime::now();
        File::options()
            .write(true)
            .open(&old)
            .unwrap()
            .set_modified(now - Duration::from_secs(60))
            .unwrap();
        File::options()
            .write(true)
            .open(&new)
            .unwrap()
            .set_modified(now)
            .unwrap();

        assert_eq!(matching_files(dir.path(), "xpu_delay_*.csv").len(), 2);
        assert_eq!(find_latest_file(dir.path(), "xpu_delay_*.csv"), Some(new));
    }

    #[test]
    fn missing_directory() {
        assert!(find_latest_file("/this/path/does/not/exist", "*.csv").is_none());
    }
}
