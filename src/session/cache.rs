use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context as _;

use crate::compile::fingerprint::Fingerprint;
use crate::foundation::error::{FramecraftError, FramecraftResult};

/// Owner of the intermediate-artifact directory and the final output path.
///
/// Artifacts live at `<cacheDir>/<fingerprint>.mp4`, so writers are partitioned by fingerprint.
/// Every artifact a run uses is leased in a process-wide table. A file produced in this process
/// is deleted when its last live holder releases it, whichever manager wrote it; artifacts left
/// by earlier processes are reused but never deleted.
#[derive(Debug)]
pub struct CacheManager {
    cache_dir: PathBuf,
    output: PathBuf,
    held: Mutex<BTreeSet<PathBuf>>,
}

#[derive(Debug, Default)]
struct Lease {
    holders: usize,
    owned: bool,
}

fn leases() -> &'static Mutex<HashMap<PathBuf, Lease>> {
    static LEASES: OnceLock<Mutex<HashMap<PathBuf, Lease>>> = OnceLock::new();
    LEASES.get_or_init(Default::default)
}

/// Same file, however the cache directory was spelled.
fn lease_key(path: &Path) -> PathBuf {
    match (
        path.parent().and_then(|d| std::fs::canonicalize(d).ok()),
        path.file_name(),
    ) {
        (Some(dir), Some(name)) => dir.join(name),
        _ => path.to_owned(),
    }
}

impl CacheManager {
    /// Manager for `cache_dir` publishing to `output`.
    pub fn new(cache_dir: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            output: output.into(),
            held: Mutex::new(BTreeSet::new()),
        }
    }

    /// Cache directory.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Final output path.
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Create the cache directory and the output's parent directory.
    pub fn prepare(&self) -> FramecraftResult<()> {
        std::fs::create_dir_all(&self.cache_dir).with_context(|| {
            format!(
                "failed to create cache directory '{}'",
                self.cache_dir.display()
            )
        })?;
        if let Some(parent) = self.output.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create output directory '{}'", parent.display())
            })?;
        }
        Ok(())
    }

    /// Completed artifact path for `fp`.
    pub fn artifact_path(&self, fp: Fingerprint) -> PathBuf {
        self.cache_dir.join(format!("{fp}.mp4"))
    }

    /// In-progress artifact path for `fp`; renamed to [`CacheManager::artifact_path`] on success.
    pub fn partial_path(&self, fp: Fingerprint) -> PathBuf {
        self.cache_dir.join(format!("{fp}.partial"))
    }

    /// Unique scratch path next to the final output, so publishing is a same-directory rename.
    pub fn staging_path(&self) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_nanos());
        let name = self
            .output
            .file_name()
            .map_or_else(|| "output".to_owned(), |n| n.to_string_lossy().into_owned());
        let dir = self.output.parent().unwrap_or_else(|| Path::new("."));
        dir.join(format!(
            ".{name}.{}-{nanos}.partial",
            std::process::id()
        ))
    }

    /// Canonical cache directory, identifying it across managers.
    pub fn dir_key(&self) -> PathBuf {
        std::fs::canonicalize(&self.cache_dir).unwrap_or_else(|_| self.cache_dir.clone())
    }

    /// Lease an artifact this run uses without having written it.
    pub fn hold(&self, path: &Path) {
        self.acquire(path, false);
    }

    /// Lease a file produced by this run; it is deleted once no live run holds it.
    pub fn record(&self, path: &Path) {
        self.acquire(path, true);
    }

    fn acquire(&self, path: &Path, owned: bool) {
        let (Ok(mut held), Ok(mut leases)) = (self.held.lock(), leases().lock()) else {
            return;
        };
        let lease = leases.entry(lease_key(path)).or_default();
        if held.insert(path.to_owned()) {
            lease.holders += 1;
        }
        lease.owned |= owned;
    }

    /// Files leased so far.
    pub fn held(&self) -> Vec<PathBuf> {
        self.held
            .lock()
            .map(|p| p.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Release `paths`. A file produced in this process is deleted by its last holder.
    pub fn discard(&self, paths: &[PathBuf]) {
        let (Ok(mut held), Ok(mut leases)) = (self.held.lock(), leases().lock()) else {
            return;
        };
        for p in paths {
            if !held.remove(p) {
                continue;
            }
            let key = lease_key(p);
            let Some(lease) = leases.get_mut(&key) else {
                continue;
            };
            lease.holders = lease.holders.saturating_sub(1);
            if lease.holders > 0 {
                tracing::debug!(path = %p.display(), holders = lease.holders, "artifact still leased");
                continue;
            }
            if leases.remove(&key).is_some_and(|l| l.owned) {
                remove_if_exists(p);
            }
        }
    }

    /// Move a finished staging file to the final output path.
    pub fn publish(&self, staged: &Path) -> FramecraftResult<PathBuf> {
        if !staged.is_file() {
            return Err(FramecraftError::resource_not_found(staged));
        }
        if std::fs::rename(staged, &self.output).is_err() {
            std::fs::copy(staged, &self.output).with_context(|| {
                format!(
                    "failed to publish '{}' to '{}'",
                    staged.display(),
                    self.output.display()
                )
            })?;
            remove_if_exists(staged);
        }
        Ok(self.output.clone())
    }

    /// Release every lease of this manager, deleting the files no other live run holds.
    ///
    /// The published output is not leased and survives.
    pub fn cleanup(&self) {
        let paths = self.held();
        self.discard(&paths);
        // Remove the directory only when nothing else lives in it.
        let _ = std::fs::remove_dir(&self.cache_dir);
    }
}

pub(crate) fn remove_if_exists(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove file"),
    }
}

/// Deletes its file on drop unless disarmed.
pub(crate) struct TempFileGuard(pub(crate) Option<PathBuf>);

impl TempFileGuard {
    pub(crate) fn disarm(&mut self) {
        self.0 = None;
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/cache.rs"]
mod tests;
