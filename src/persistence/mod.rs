//! Snapshot storage
//!
//! The simulation encodes snapshots synchronously and hands the JSON to a
//! [`SnapshotStore`]; how and where the bytes land is the store's concern.
//! [`FileStore`] writes on a background worker thread with at most one
//! outstanding write: a new write joins the previous one first, so the
//! simulation only ever blocks at that join point. Write failures are
//! logged and swallowed - play continues without persistence.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;

/// Durable storage for one game snapshot
pub trait SnapshotStore {
    /// Persist a snapshot; may return before the bytes are durable
    fn write(&mut self, snapshot: String);
    /// The last persisted snapshot, if any
    fn read(&mut self) -> Option<String>;
    /// Drop the persisted snapshot
    fn clear(&mut self);
    /// Wait for any in-flight write to finish
    fn flush(&mut self);
}

/// In-memory store for tests and the headless demo
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub saved: Option<String>,
    pub writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemoryStore {
    fn write(&mut self, snapshot: String) {
        self.saved = Some(snapshot);
        self.writes += 1;
    }

    fn read(&mut self) -> Option<String> {
        self.saved.clone()
    }

    fn clear(&mut self) {
        self.saved = None;
    }

    fn flush(&mut self) {}
}

/// File-backed store with atomic writes on a background worker
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    worker: Option<JoinHandle<()>>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            worker: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn join_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Save worker panicked");
            }
        }
    }
}

impl SnapshotStore for FileStore {
    fn write(&mut self, snapshot: String) {
        // Join-before-restart: never two concurrent writers
        self.join_worker();

        let path = self.path.clone();
        self.worker = Some(std::thread::spawn(move || {
            match write_text_atomic(&path, &snapshot) {
                Ok(()) => log::debug!("Saved game to {}", path.display()),
                Err(error) => log::error!("Failed to save game: {error}"),
            }
        }));
    }

    fn read(&mut self) -> Option<String> {
        self.flush();
        match fs::read_to_string(&self.path) {
            Ok(json) => Some(json),
            Err(error) if error.kind() == io::ErrorKind::NotFound => None,
            Err(error) => {
                log::error!("Failed to read save file: {error}");
                None
            }
        }
    }

    fn clear(&mut self) {
        self.flush();
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => log::error!("Failed to delete save file: {error}"),
        }
    }

    fn flush(&mut self) {
        self.join_worker();
    }
}

impl Drop for FileStore {
    fn drop(&mut self) {
        self.join_worker();
    }
}

/// Write via a temp file in the same directory, then rename over the
/// target, so a crash mid-write never leaves a torn snapshot
fn write_text_atomic(path: &Path, text: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = temp_path_for(path);
    fs::write(&tmp_path, text)?;
    replace_file(&tmp_path, path)
}

fn replace_file(tmp_path: &Path, final_path: &Path) -> io::Result<()> {
    match fs::remove_file(final_path) {
        Ok(_) => {}
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(error) => {
            let _ = fs::remove_file(tmp_path);
            return Err(error);
        }
    }

    if let Err(error) = fs::rename(tmp_path, final_path) {
        let _ = fs::remove_file(tmp_path);
        return Err(error);
    }
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("snapshot.tmp");
    let tmp_name = format!("{file_name}.tmp");
    match path.parent() {
        Some(parent) => parent.join(tmp_name),
        None => PathBuf::from(tmp_name),
    }
}
