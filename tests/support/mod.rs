#![allow(dead_code)]

use anyhow::{Context, Result};
use dtdl_modelrepo::{DocumentSource, RepositoryChanged, SourceEntry};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::Receiver;
use std::time::{Duration, SystemTime};

pub const CONTEXT: &str = "dtmi:dtdl:context;2";

/// Build an interface document with the given bases and contents.
pub fn interface(id: &str, extends: &[&str], contents: Value) -> Value {
    json!({
        "@context": CONTEXT,
        "@id": id,
        "@type": "Interface",
        "extends": extends,
        "contents": contents
    })
}

pub fn property(name: &str, schema: &str) -> Value {
    json!({"@type": "Property", "name": name, "schema": schema})
}

pub fn telemetry(name: &str, schema: &str) -> Value {
    json!({"@type": "Telemetry", "name": name, "schema": schema})
}

pub fn relationship(name: &str) -> Value {
    json!({"@type": "Relationship", "name": name})
}

pub fn write_json(root: &Path, relative: &str, value: &Value) -> Result<PathBuf> {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(&path, serde_json::to_vec_pretty(value)?)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

pub fn at(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}

/// Wait for a change notification, failing after `timeout`.
pub fn next_change(changes: &Receiver<RepositoryChanged>, timeout: Duration) -> RepositoryChanged {
    changes
        .recv_timeout(timeout)
        .expect("expected a repository change notification")
}

/// Pre-flattened in-memory document source with explicit timestamps.
///
/// Listing any location other than the configured root fails, as does every
/// call while `set_unavailable(true)` is in effect. `hold_reads` parks every
/// read until `release_reads`.
pub struct MemorySource {
    root: PathBuf,
    files: Mutex<BTreeMap<PathBuf, (SystemTime, Vec<u8>)>>,
    unavailable: AtomicBool,
    unreadable: AtomicBool,
    held: Mutex<bool>,
    released: Condvar,
    lists: AtomicUsize,
    reads: AtomicUsize,
}

impl MemorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            files: Mutex::new(BTreeMap::new()),
            unavailable: AtomicBool::new(false),
            unreadable: AtomicBool::new(false),
            held: Mutex::new(false),
            released: Condvar::new(),
            lists: AtomicUsize::new(0),
            reads: AtomicUsize::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn put(&self, relative: &str, modified: SystemTime, value: &Value) {
        let bytes = serde_json::to_vec(value).expect("serialize fixture");
        self.put_bytes(relative, modified, bytes);
    }

    pub fn put_bytes(&self, relative: &str, modified: SystemTime, bytes: Vec<u8>) {
        self.files
            .lock()
            .unwrap()
            .insert(PathBuf::from(relative), (modified, bytes));
    }

    pub fn touch(&self, relative: &str, modified: SystemTime) {
        let mut files = self.files.lock().unwrap();
        let entry = files
            .get_mut(Path::new(relative))
            .expect("touching a missing fixture");
        entry.0 = modified;
    }

    pub fn remove(&self, relative: &str) {
        self.files.lock().unwrap().remove(Path::new(relative));
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn set_unreadable(&self, unreadable: bool) {
        self.unreadable.store(unreadable, Ordering::SeqCst);
    }

    pub fn hold_reads(&self) {
        *self.held.lock().unwrap() = true;
    }

    pub fn release_reads(&self) {
        *self.held.lock().unwrap() = false;
        self.released.notify_all();
    }

    pub fn list_count(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl DocumentSource for MemorySource {
    fn list(&self, location: &Path) -> io::Result<Vec<SourceEntry>> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) || location != self.root {
            return Err(io::Error::new(io::ErrorKind::NotFound, "location unreachable"));
        }
        Ok(self
            .files
            .lock()
            .unwrap()
            .iter()
            .map(|(path, (modified, _))| SourceEntry {
                relative_path: path.clone(),
                modified: *modified,
                is_directory: false,
            })
            .collect())
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let held = self.held.lock().unwrap();
        drop(self.released.wait_while(held, |held| *held).unwrap());
        if self.unreadable.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read refused"));
        }
        let relative = path
            .strip_prefix(&self.root)
            .map_err(|_| io::Error::new(io::ErrorKind::NotFound, "outside root"))?;
        self.files
            .lock()
            .unwrap()
            .get(relative)
            .map(|(_, bytes)| bytes.clone())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such document"))
    }
}
