#![allow(clippy::module_name_repetitions)]
//! Byte-quota bookkeeping over the temp-file cache directory.
//!
//! Only files with an allow-listed extension are tracked; anything else in
//! the directory (the serve lock, stray dotfiles) is ignored. Sweeping
//! deletes oldest-by-mtime files one at a time until the total fits the
//! quota.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use serde::Serialize;
use walkdir::WalkDir;

use crate::util::{file_extension, sanitize_file_name};

/// Extensions the cache tracks: raster/vector images, 3D models, text.
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "webp", "svg", "avif", "glb", "gltf", "txt", "json", "md", "html",
];

pub const DEFAULT_CACHE_LIMIT_BYTES: u64 = 512 * 1024 * 1024;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub name: String,
    pub size: u64,
    pub modified_secs: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheUsage {
    pub directory: String,
    pub total_bytes: u64,
    pub limit_bytes: u64,
    pub files: Vec<CacheEntry>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub removed: Vec<String>,
    pub total_bytes_after: u64,
}

#[derive(Debug, Clone)]
pub struct CacheDir {
    dir: PathBuf,
    limit_bytes: u64,
}

impl CacheDir {
    pub fn new(dir: impl Into<PathBuf>, limit_bytes: u64) -> Self {
        Self {
            dir: dir.into(),
            limit_bytes,
        }
    }

    /// Directory from `ORDFORGE_CACHE_DIR` (default `$TMPDIR/ordforge-cache`),
    /// quota from `ORDFORGE_CACHE_LIMIT_BYTES`.
    pub fn from_env() -> Self {
        let dir = crate::probe::env_override("ORDFORGE_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join("ordforge-cache"));
        let limit = crate::probe::env_override("ORDFORGE_CACHE_LIMIT_BYTES")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|&v| v > 0)
            .unwrap_or(DEFAULT_CACHE_LIMIT_BYTES);
        Self::new(dir, limit)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn limit_bytes(&self) -> u64 {
        self.limit_bytes
    }

    pub fn ensure(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir)
    }

    fn entries(&self) -> Vec<CacheEntry> {
        let mut out = Vec::new();
        for entry in WalkDir::new(&self.dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(Result::ok)
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            let Some(ext) = file_extension(&name) else {
                continue;
            };
            if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
                continue;
            }
            let Ok(meta) = entry.metadata() else {
                continue;
            };
            let modified_secs = meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs())
                .unwrap_or(0);
            out.push(CacheEntry {
                name,
                size: meta.len(),
                modified_secs,
            });
        }
        out
    }

    pub fn usage(&self) -> CacheUsage {
        let files = self.entries();
        let total_bytes = files.iter().map(|f| f.size).sum();
        CacheUsage {
            directory: self.dir.display().to_string(),
            total_bytes,
            limit_bytes: self.limit_bytes,
            files,
        }
    }

    /// Delete oldest files until the tracked total fits the quota.
    pub fn sweep(&self) -> SweepReport {
        let mut files = self.entries();
        files.sort_by_key(|f| f.modified_secs);
        let mut total: u64 = files.iter().map(|f| f.size).sum();
        let mut removed = Vec::new();
        let mut it = files.into_iter();
        while total > self.limit_bytes {
            let Some(oldest) = it.next() else {
                break;
            };
            if fs::remove_file(self.dir.join(&oldest.name)).is_ok() {
                total -= oldest.size;
                removed.push(oldest.name);
            }
        }
        SweepReport {
            removed,
            total_bytes_after: total,
        }
    }

    /// Delete every tracked file; returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut removed = 0;
        for entry in self.entries() {
            if fs::remove_file(self.dir.join(&entry.name)).is_ok() {
                removed += 1;
            }
        }
        removed
    }

    /// Path for a cached file name, or None when the name is unsafe or the
    /// extension is not tracked.
    pub fn file_path(&self, name: &str) -> Option<PathBuf> {
        let clean = sanitize_file_name(name)?;
        if clean != name {
            return None;
        }
        let ext = file_extension(&clean)?;
        if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
            return None;
        }
        Some(self.dir.join(clean))
    }

    /// Delete one tracked file; Ok(false) when it did not exist.
    pub fn remove(&self, name: &str) -> io::Result<bool> {
        let Some(path) = self.file_path(name) else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid cache file name: {name}"),
            ));
        };
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Store bytes under a sanitized name, suffixing a short id on collision.
    pub fn store_unique(&self, original_name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        self.ensure()?;
        let clean = sanitize_file_name(original_name).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unusable file name: {original_name}"),
            )
        })?;
        let mut target = self.dir.join(&clean);
        if target.exists() {
            let (stem, ext) = match clean.rsplit_once('.') {
                Some((s, e)) => (s.to_string(), format!(".{e}")),
                None => (clean.clone(), String::new()),
            };
            target = self
                .dir
                .join(format!("{stem}-{}{ext}", crate::create_request_id()));
        }
        fs::write(&target, bytes)?;
        Ok(target)
    }
}
