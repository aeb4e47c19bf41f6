//! File-backed manifest store shared by independent worker processes.
//!
//! Each route maps to `<root>/<stem>.json` guarded by `<root>/<stem>.json.lock`.
//! The lock lives in its own file because the manifest itself is replaced by
//! an atomic rename on every write.

use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::{ManifestError, Result};
use crate::manifest::CspManifest;
use crate::store::ManifestStore;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Manifest store writing one JSON file per route.
#[derive(Debug, Clone)]
pub struct FileManifestStore {
    root: PathBuf,
    poll_interval: Duration,
}

impl FileManifestStore {
    /// Open (and create) a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            ManifestError::Storage(format!(
                "Failed to create manifest directory {:?}: {}",
                root, e
            ))
        })?;

        info!(path = ?root, "Initialized manifest store");

        Ok(Self {
            root,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Set how often a contended lock is retried.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the manifest file for `route`.
    pub fn manifest_path(&self, route: &str) -> PathBuf {
        self.root.join(format!("{}.json", route_file_stem(route)))
    }

    /// Path of the lock file guarding `route`.
    pub fn lock_path(&self, route: &str) -> PathBuf {
        self.root.join(format!("{}.json.lock", route_file_stem(route)))
    }

    fn write_atomic(&self, path: &Path, manifest: &CspManifest) -> Result<()> {
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        serde_json::to_writer_pretty(&mut tmp, manifest)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl ManifestStore for FileManifestStore {
    fn read(&self, route: &str) -> Result<Option<CspManifest>> {
        let path = self.manifest_path(route);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_with_lock(
        &self,
        route: &str,
        manifest: &CspManifest,
        timeout: Duration,
    ) -> Result<CspManifest> {
        let _lock = RouteLock::acquire(&self.lock_path(route), route, timeout, self.poll_interval)?;

        let mut merged = self.read(route)?.unwrap_or_default();
        merged.merge(manifest);

        let path = self.manifest_path(route);
        self.write_atomic(&path, &merged)?;

        debug!(
            route = %route,
            path = ?path,
            scripts = merged.scripts.len(),
            style_elems = merged.styles.elem.len(),
            style_attrs = merged.styles.attr.len(),
            "Flushed manifest"
        );

        Ok(merged)
    }
}

/// Exclusive advisory lock, released on drop.
struct RouteLock {
    file: File,
}

impl RouteLock {
    fn acquire(path: &Path, route: &str, timeout: Duration, poll: Duration) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)?;

        let started = Instant::now();
        let contended = fs2::lock_contended_error();
        loop {
            match FileExt::try_lock_exclusive(&file) {
                Ok(()) => return Ok(Self { file }),
                Err(e)
                    if e.kind() == ErrorKind::WouldBlock
                        || e.raw_os_error() == contended.raw_os_error() => {}
                Err(e) => return Err(e.into()),
            }

            let waited = started.elapsed();
            if waited >= timeout {
                warn!(route = %route, ?timeout, "Manifest lock not acquired in time");
                return Err(ManifestError::LockTimeout {
                    route: route.to_string(),
                    timeout,
                });
            }

            debug!(route = %route, ?waited, "Manifest lock contended, retrying");
            thread::sleep(poll.min(timeout - waited));
        }
    }
}

impl Drop for RouteLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(error = %e, "Failed to release manifest lock");
        }
    }
}

/// File-name-safe, collision-free encoding of a route key.
///
/// ASCII alphanumerics, `-`, `_` and `.` are kept, `/` becomes `~`, and any
/// other byte (including `~`) becomes `%XX`. The root route maps to `index`.
fn route_file_stem(route: &str) -> String {
    let trimmed = route.trim_matches('/');
    if trimmed.is_empty() {
        return "index".to_string();
    }

    let mut stem = String::with_capacity(trimmed.len());
    for byte in trimmed.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' => stem.push(byte as char),
            b'.' if !stem.is_empty() => stem.push('.'),
            b'/' => stem.push('~'),
            _ => stem.push_str(&format!("%{:02X}", byte)),
        }
    }
    stem
}
