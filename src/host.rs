//! Host capabilities the core consumes: filesystem probe, clock, and
//! document provider. Editors inject their own; the CLI uses the real ones.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

/// Minimal filesystem surface needed by the analyzer.
///
/// Everything the core reads from disk goes through this trait so tests can
/// run against in-memory trees and editors can overlay unsaved buffers.
pub trait FileSystem {
    fn exists(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    fn mtime(&self, path: &Path) -> Option<SystemTime>;
    fn read(&self, path: &Path) -> std::io::Result<String>;
    fn read_dir(&self, path: &Path) -> Vec<PathBuf>;
}

/// Monotonic clock used for debounce and refresh gating.
pub trait Clock {
    fn now(&self) -> Instant;
}

// ─── Real implementations ────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn mtime(&self, path: &Path) -> Option<SystemTime> {
        std::fs::metadata(path).and_then(|m| m.modified()).ok()
    }

    fn read(&self, path: &Path) -> std::io::Result<String> {
        crate::read_file_lossy(path).map(|(text, _lossy)| text)
    }

    fn read_dir(&self, path: &Path) -> Vec<PathBuf> {
        let mut entries: Vec<PathBuf> = std::fs::read_dir(path)
            .map(|rd| rd.flatten().map(|e| e.path()).collect())
            .unwrap_or_default();
        entries.sort();
        entries
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Test clock that only advances when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    elapsed: std::rc::Rc<std::cell::Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: std::rc::Rc::new(std::cell::Cell::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.elapsed.set(self.elapsed.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed.get()
    }
}

/// In-memory filesystem for tests: a sorted map of path → contents.
/// Directories exist implicitly as prefixes of stored files.
#[derive(Debug, Default, Clone)]
pub struct MemoryFileSystem {
    files: std::collections::BTreeMap<PathBuf, String>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, text: impl Into<String>) {
        self.files.insert(path.into(), text.into());
    }
}

impl FileSystem for MemoryFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path) || self.is_dir(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.files.keys().any(|p| p.starts_with(path) && p != path)
    }

    fn mtime(&self, _path: &Path) -> Option<SystemTime> {
        None
    }

    fn read(&self, path: &Path) -> std::io::Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, path.display().to_string())
        })
    }

    fn read_dir(&self, path: &Path) -> Vec<PathBuf> {
        let mut out: Vec<PathBuf> = Vec::new();
        for p in self.files.keys() {
            if let Ok(rest) = p.strip_prefix(path) {
                if let Some(first) = rest.components().next() {
                    let child = path.join(first);
                    if !out.contains(&child) {
                        out.push(child);
                    }
                }
            }
        }
        out
    }
}
