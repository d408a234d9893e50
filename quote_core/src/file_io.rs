//! # File I/O Module
//!
//! Quote storage on disk with safety features:
//! - **Atomic saves**: Write to .tmp, fsync, rename to prevent corruption
//! - **File locking**: Guard registry read-modify-write against a second process
//! - **Version validation**: Refuse registry files written by a newer schema
//!
//! ## Layout
//!
//! ```text
//! <store>/
//!   quotes.json        registry of saved quotes
//!   quotes.json.lock   present while a process rewrites the registry
//!   current.json       the quote being worked on
//!   settings.toml      optional defaults for new quotes
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use quote_core::file_io::QuoteStorage;
//!
//! let storage = QuoteStorage::open("/tmp/quotes", "producer")?;
//! for entry in storage.load_registry()?.listing() {
//!     println!("{} {}", entry.id, entry.title);
//! }
//! # Ok::<(), quote_core::errors::QuoteError>(())
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::{QuoteError, QuoteResult};
use crate::project::Settings;
use crate::quote::SavedQuote;
use crate::registry::{QuoteRegistry, SCHEMA_VERSION};

pub const REGISTRY_FILE: &str = "quotes.json";
pub const CURRENT_FILE: &str = "current.json";
pub const SETTINGS_FILE: &str = "settings.toml";

/// Lock file metadata stored in .lock files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// User identifier
    pub user_id: String,
    /// Machine name where lock was acquired
    pub machine: String,
    /// Process ID that holds the lock
    pub pid: u32,
    /// When the lock was acquired
    pub locked_at: DateTime<Utc>,
}

impl LockInfo {
    /// Create new lock info for the current process
    pub fn new(user_id: impl Into<String>) -> Self {
        LockInfo {
            user_id: user_id.into(),
            machine: hostname().unwrap_or_else(|| "unknown".to_string()),
            pid: std::process::id(),
            locked_at: Utc::now(),
        }
    }
}

fn hostname() -> Option<String> {
    #[cfg(windows)]
    {
        std::env::var("COMPUTERNAME").ok()
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOSTNAME")
            .ok()
            .or_else(|| std::env::var("HOST").ok())
    }
}

/// Exclusive lock on a file, released on drop.
///
/// Holds an OS-level lock (fs2) and writes a `.lock` file with
/// [`LockInfo`] so a blocked user can see who holds it.
#[derive(Debug)]
pub struct FileLock {
    lock_path: PathBuf,
    _lock_file: File,
    pub info: LockInfo,
}

impl FileLock {
    /// Acquire an exclusive lock on `path`.
    ///
    /// Fails with [`QuoteError::FileLocked`] when another live process
    /// holds it. Stale locks (dead process, or older than a day) are
    /// taken over.
    pub fn acquire(path: &Path, user_id: impl Into<String>) -> QuoteResult<Self> {
        let lock_path = lock_path_for(path);
        let info = LockInfo::new(user_id);

        if let Some(existing) = FileLock::check(path) {
            return Err(QuoteError::file_locked(
                path.display().to_string(),
                format!("{} ({})", existing.user_id, existing.machine),
                existing.locked_at.to_rfc3339(),
            ));
        }

        let mut lock_file = OpenOptions::new()
            .write(true)
            .read(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| {
                QuoteError::file_error("create lock", lock_path.display().to_string(), e.to_string())
            })?;

        lock_file.try_lock_exclusive().map_err(|_| {
            QuoteError::file_locked(path.display().to_string(), "another process", "unknown")
        })?;
        // Only the holder may clear the previous owner's details.
        lock_file.set_len(0).map_err(|e| {
            QuoteError::file_error("truncate lock", lock_path.display().to_string(), e.to_string())
        })?;

        let lock_json = serde_json::to_string_pretty(&info).map_err(|e| {
            QuoteError::SerializationError {
                reason: e.to_string(),
            }
        })?;
        lock_file.write_all(lock_json.as_bytes()).map_err(|e| {
            QuoteError::file_error("write lock", lock_path.display().to_string(), e.to_string())
        })?;
        lock_file.sync_all().map_err(|e| {
            QuoteError::file_error("sync lock", lock_path.display().to_string(), e.to_string())
        })?;

        debug!(path = %path.display(), "acquired lock");
        Ok(FileLock {
            lock_path,
            _lock_file: lock_file,
            info,
        })
    }

    /// Who holds the lock on `path`, if anyone live does.
    pub fn check(path: &Path) -> Option<LockInfo> {
        let info = read_lock_info(&lock_path_for(path)).ok()?;
        (!is_lock_stale(&info)).then_some(info)
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

fn lock_path_for(path: &Path) -> PathBuf {
    sibling_with_suffix(path, "lock")
}

/// `quotes.json` → `quotes.json.<suffix>`
fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut sibling = path.to_path_buf();
    let extension = sibling
        .extension()
        .map(|e| format!("{}.{suffix}", e.to_string_lossy()))
        .unwrap_or_else(|| suffix.to_string());
    sibling.set_extension(extension);
    sibling
}

fn read_lock_info(lock_path: &Path) -> QuoteResult<LockInfo> {
    let contents = read_text(lock_path)?;
    serde_json::from_str(&contents).map_err(|e| QuoteError::SerializationError {
        reason: e.to_string(),
    })
}

/// A lock is stale when its process is gone (same machine only) or it is
/// more than a day old.
fn is_lock_stale(info: &LockInfo) -> bool {
    if hostname().as_deref() == Some(info.machine.as_str()) && !process_alive(info.pid) {
        return true;
    }
    (Utc::now() - info.locked_at).num_hours() > 24
}

#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists() || !Path::new("/proc").exists()
}

#[cfg(not(unix))]
fn process_alive(_pid: u32) -> bool {
    true
}

fn read_text(path: &Path) -> QuoteResult<String> {
    let mut file = File::open(path)
        .map_err(|e| QuoteError::file_error("open", path.display().to_string(), e.to_string()))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| QuoteError::file_error("read", path.display().to_string(), e.to_string()))?;
    Ok(contents)
}

/// Write `contents` to `path` atomically.
///
/// 1. Write to a sibling `.tmp` file
/// 2. Sync to disk (fsync)
/// 3. Rename over `path` (atomic on most filesystems)
pub fn write_atomic(path: &Path, contents: &str) -> QuoteResult<()> {
    let tmp_path = sibling_with_suffix(path, "tmp");

    let mut tmp_file = File::create(&tmp_path).map_err(|e| {
        QuoteError::file_error("create temp file", tmp_path.display().to_string(), e.to_string())
    })?;
    tmp_file.write_all(contents.as_bytes()).map_err(|e| {
        QuoteError::file_error("write temp file", tmp_path.display().to_string(), e.to_string())
    })?;
    tmp_file.sync_all().map_err(|e| {
        QuoteError::file_error("sync temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        QuoteError::file_error("rename to final", path.display().to_string(), e.to_string())
    })
}

/// Check a registry file version against [`SCHEMA_VERSION`].
///
/// The major version must match; while on 0.x a newer minor version is
/// also rejected.
fn validate_version(file_version: &str) -> QuoteResult<()> {
    let parse = |v: &str| -> Vec<u32> { v.split('.').filter_map(|p| p.parse().ok()).collect() };
    let file_parts = parse(file_version);
    let current_parts = parse(SCHEMA_VERSION);

    let mismatch = || QuoteError::VersionMismatch {
        file_version: file_version.to_string(),
        expected_version: SCHEMA_VERSION.to_string(),
    };

    match (file_parts.as_slice(), current_parts.as_slice()) {
        ([file_major, ..], [current_major, ..]) if file_major != current_major => Err(mismatch()),
        ([0, file_minor, ..], [0, current_minor, ..]) if file_minor > current_minor => {
            Err(mismatch())
        }
        ([_, ..], [_, ..]) => Ok(()),
        _ => Err(mismatch()),
    }
}

/// A directory holding the quote registry, the current quote and settings.
#[derive(Debug, Clone)]
pub struct QuoteStorage {
    dir: PathBuf,
    user_id: String,
}

impl QuoteStorage {
    /// Open (creating if needed) a storage directory. `user_id` is
    /// recorded in lock files.
    pub fn open(dir: impl Into<PathBuf>, user_id: impl Into<String>) -> QuoteResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            QuoteError::file_error("create directory", dir.display().to_string(), e.to_string())
        })?;
        Ok(QuoteStorage {
            dir,
            user_id: user_id.into(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn registry_path(&self) -> PathBuf {
        self.dir.join(REGISTRY_FILE)
    }

    pub fn current_path(&self) -> PathBuf {
        self.dir.join(CURRENT_FILE)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.dir.join(SETTINGS_FILE)
    }

    /// Settings from `settings.toml`, or defaults when the file is absent.
    pub fn load_settings(&self) -> QuoteResult<Settings> {
        let path = self.settings_path();
        if !path.exists() {
            return Ok(Settings::default());
        }
        Settings::from_toml(&read_text(&path)?)
    }

    /// The saved-quote registry; empty when no quote was saved yet.
    pub fn load_registry(&self) -> QuoteResult<QuoteRegistry> {
        let path = self.registry_path();
        if !path.exists() {
            return Ok(QuoteRegistry::new());
        }
        let (registry, version) =
            QuoteRegistry::from_json(&read_text(&path)?, &path.display().to_string())?;
        if let Some(version) = version {
            validate_version(&version)?;
        }
        debug!(quotes = registry.len(), "loaded registry");
        Ok(registry)
    }

    fn write_registry(&self, registry: &QuoteRegistry) -> QuoteResult<()> {
        write_atomic(&self.registry_path(), &registry.to_json_pretty()?)
    }

    /// Run a read-modify-write of the registry under the file lock.
    fn update_registry<T>(
        &self,
        change: impl FnOnce(&mut QuoteRegistry) -> QuoteResult<T>,
    ) -> QuoteResult<T> {
        let _lock = FileLock::acquire(&self.registry_path(), self.user_id.clone())?;
        let mut registry = self.load_registry()?;
        let result = change(&mut registry)?;
        self.write_registry(&registry)?;
        Ok(result)
    }

    /// Upsert a quote into the registry and make it the current quote.
    ///
    /// Returns `true` when a quote with the same id was replaced.
    pub fn save_quote(&self, quote: &SavedQuote) -> QuoteResult<bool> {
        let replaced = self.update_registry(|registry| Ok(registry.upsert(quote.clone())))?;
        self.save_current(quote)?;
        info!(id = %quote.id, replaced, "saved quote");
        Ok(replaced)
    }

    /// Remove a quote from the registry.
    pub fn delete_quote(&self, id: &str) -> QuoteResult<SavedQuote> {
        let removed = self.update_registry(|registry| registry.remove(id))?;
        info!(id, "deleted quote");
        Ok(removed)
    }

    /// The current quote, if one was persisted.
    pub fn load_current(&self) -> QuoteResult<Option<SavedQuote>> {
        let path = self.current_path();
        if !path.exists() {
            return Ok(None);
        }
        SavedQuote::from_json(&read_text(&path)?, CURRENT_FILE).map(Some)
    }

    pub fn save_current(&self, quote: &SavedQuote) -> QuoteResult<()> {
        write_atomic(&self.current_path(), &quote.to_json_pretty()?)
    }

    /// Forget the current quote.
    pub fn clear_current(&self) -> QuoteResult<()> {
        let path = self.current_path();
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(QuoteError::file_error(
                "remove",
                path.display().to_string(),
                e.to_string(),
            )),
        }
    }
}

/// Write `quote` as pretty JSON into `dir` under its export file name.
pub fn export_quote(quote: &SavedQuote, dir: &Path) -> QuoteResult<PathBuf> {
    let path = dir.join(quote.export_file_name());
    write_atomic(&path, &quote.to_json_pretty()?)?;
    info!(id = %quote.id, path = %path.display(), "exported quote");
    Ok(path)
}

/// Read an exported quote file.
pub fn import_quote(path: &Path) -> QuoteResult<SavedQuote> {
    let quote = SavedQuote::from_json(&read_text(path)?, &path.display().to_string())?;
    info!(id = %quote.id, path = %path.display(), "imported quote");
    Ok(quote)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn storage() -> (TempDir, QuoteStorage) {
        let dir = TempDir::new().unwrap();
        let storage = QuoteStorage::open(dir.path().join("store"), "tester").unwrap();
        (dir, storage)
    }

    fn quote(id: &str) -> SavedQuote {
        SavedQuote {
            id: id.to_string(),
            saved_at: Utc.with_ymd_and_hms(2025, 4, 2, 8, 0, 0).unwrap(),
            project: Default::default(),
            extra: Default::default(),
            values: Default::default(),
        }
    }

    #[test]
    fn test_lock_path_generation() {
        let lock_path = lock_path_for(Path::new("/store/quotes.json"));
        assert_eq!(lock_path, Path::new("/store/quotes.json.lock"));
    }

    #[test]
    fn test_lock_info_creation() {
        let info = LockInfo::new("producer");
        assert_eq!(info.user_id, "producer");
        assert!(info.pid > 0);
    }

    #[test]
    fn test_file_lock_acquire_and_release() {
        let (_dir, storage) = storage();
        let path = storage.registry_path();

        let lock = FileLock::acquire(&path, "producer").unwrap();
        assert_eq!(lock.info.user_id, "producer");
        assert!(lock_path_for(&path).exists());

        drop(lock);
        assert!(!lock_path_for(&path).exists());
    }

    #[test]
    fn test_blocked_acquire_keeps_holder_info() {
        let (_dir, storage) = storage();
        let path = storage.registry_path();
        let lock_path = lock_path_for(&path);

        // Details that look stale, on a file another handle really holds
        let mut info = LockInfo::new("holder");
        info.machine = "elsewhere".into();
        info.locked_at = Utc::now() - chrono::Duration::hours(30);
        let holder_json = serde_json::to_string_pretty(&info).unwrap();
        fs::write(&lock_path, &holder_json).unwrap();
        let holder = File::open(&lock_path).unwrap();
        holder.try_lock_exclusive().unwrap();

        let err = FileLock::acquire(&path, "second").unwrap_err();
        assert!(matches!(err, QuoteError::FileLocked { .. }));
        assert_eq!(fs::read_to_string(&lock_path).unwrap(), holder_json);
    }

    #[test]
    fn test_old_lock_is_stale() {
        let mut info = LockInfo::new("someone");
        info.machine = "elsewhere".into();
        assert!(!is_lock_stale(&info));
        info.locked_at = Utc::now() - chrono::Duration::hours(30);
        assert!(is_lock_stale(&info));
    }

    #[test]
    fn test_atomic_write_leaves_no_tmp_file() {
        let (_dir, storage) = storage();
        storage.save_current(&quote("a")).unwrap();

        assert!(storage.current_path().exists());
        assert!(!sibling_with_suffix(&storage.current_path(), "tmp").exists());
    }

    #[test]
    fn test_save_and_reload_registry() {
        let (_dir, storage) = storage();
        assert!(storage.load_registry().unwrap().is_empty());

        assert!(!storage.save_quote(&quote("a")).unwrap());
        assert!(!storage.save_quote(&quote("b")).unwrap());
        assert!(storage.save_quote(&quote("a")).unwrap());

        let registry = storage.load_registry().unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(storage.load_current().unwrap().unwrap().id, "a");
        assert!(!lock_path_for(&storage.registry_path()).exists());
    }

    #[test]
    fn test_delete_quote() {
        let (_dir, storage) = storage();
        storage.save_quote(&quote("a")).unwrap();

        assert_eq!(storage.delete_quote("a").unwrap().id, "a");
        assert!(storage.load_registry().unwrap().is_empty());

        let err = storage.delete_quote("a").unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND");
    }

    #[test]
    fn test_save_blocked_by_live_lock() {
        let (_dir, storage) = storage();
        let _held = FileLock::acquire(&storage.registry_path(), "other").unwrap();

        let err = storage.save_quote(&quote("a")).unwrap_err();
        assert!(matches!(err, QuoteError::FileLocked { .. }));
    }

    #[test]
    fn test_current_lifecycle() {
        let (_dir, storage) = storage();
        assert!(storage.load_current().unwrap().is_none());

        storage.save_current(&quote("c")).unwrap();
        assert_eq!(storage.load_current().unwrap().unwrap().id, "c");

        storage.clear_current().unwrap();
        assert!(storage.load_current().unwrap().is_none());
        storage.clear_current().unwrap();
    }

    #[test]
    fn test_settings_default_and_file() {
        let (_dir, storage) = storage();
        assert_eq!(storage.load_settings().unwrap(), Settings::default());

        fs::write(storage.settings_path(), "margin_percent = 15\n").unwrap();
        assert_eq!(storage.load_settings().unwrap().margin_percent, 15.0);
    }

    #[test]
    fn test_export_and_import() {
        let (dir, _storage) = storage();
        let path = export_quote(&quote("REF-1"), dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), "quote-REF-1-2025-04-02.json");

        assert_eq!(import_quote(&path).unwrap(), quote("REF-1"));

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "[1, 2").unwrap();
        assert_eq!(import_quote(&broken).unwrap_err().error_code(), "PARSE_ERROR");
    }

    #[test]
    fn test_newer_registry_rejected() {
        let (_dir, storage) = storage();
        fs::write(storage.registry_path(), r#"{"version": "0.9.0", "quotes": []}"#).unwrap();
        let err = storage.load_registry().unwrap_err();
        assert!(matches!(err, QuoteError::VersionMismatch { .. }));
    }

    #[test]
    fn test_version_validation() {
        assert!(validate_version(SCHEMA_VERSION).is_ok());
        assert!(validate_version("0.1.7").is_ok());
        assert!(validate_version("0.0.1").is_ok());
        assert!(validate_version("1.0.0").is_err());
        assert!(validate_version("0.2.0").is_err());
        assert!(validate_version("garbage").is_err());
    }
}
