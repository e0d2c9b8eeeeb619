//! File-per-key record storage.
//!
//! Every record lives at `{root}/{key}` as a single line of JSON. Nothing is
//! cached: each call goes to the filesystem, which is the only shared state
//! between requests.

mod record;

pub use record::TiddlerRecord;

use crate::error::{Result, StoreError};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const TEMP_PREFIX: &str = ".";
const TEMP_SUFFIX: &str = ".tmp";

pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the root directory if it does not exist yet.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let store = Self::new(root);
        create_dirs(&store.root)?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    pub fn get(&self, key: &str) -> Result<TiddlerRecord> {
        let bytes = match fs::read(self.path_for(key)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    key: key.to_string(),
                })
            }
            Err(source) => {
                return Err(StoreError::Read {
                    key: key.to_string(),
                    source,
                })
            }
        };
        serde_json::from_slice(&bytes).map_err(|source| StoreError::CorruptRecord {
            key: key.to_string(),
            source,
        })
    }

    /// Write `record` under `key`.
    ///
    /// The record goes to a hidden temporary file next to its destination and
    /// is renamed into place once flushed, so a concurrent `get` sees either
    /// the previous record or this one.
    pub fn put(&self, key: &str, record: &TiddlerRecord) -> Result<()> {
        let path = self.path_for(key);
        let dir = path.parent().unwrap_or(&self.root).to_path_buf();
        create_dirs(&dir)?;

        let write_err = |source: std::io::Error| StoreError::Write {
            path: path.clone(),
            source,
        };
        let mut tmp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(TEMP_SUFFIX)
            .tempfile_in(&dir)
            .map_err(write_err)?;
        serde_json::to_writer(tmp.as_file_mut(), record)
            .map_err(|e| write_err(std::io::Error::from(e)))?;
        tmp.write_all(b"\n").map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&path).map_err(|e| write_err(e.error))?;
        Ok(())
    }

    /// Revision the next write to `key` should carry.
    ///
    /// Missing, unreadable and corrupt records all restart at 1. Two writers
    /// racing on the same key can both get the same number; whichever rename
    /// lands last wins.
    pub fn next_revision(&self, key: &str) -> u64 {
        match self.get(key) {
            Ok(existing) => existing.rev + 1,
            Err(_) => 1,
        }
    }

    /// Every stored key, in directory traversal order.
    ///
    /// Keys are paths relative to the root with `/` separators. Directories
    /// and hidden entries (in-flight temporary files) are skipped. A root
    /// that does not exist yet holds no keys.
    pub fn keys(&self) -> Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut keys = Vec::new();
        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .into_iter()
            .filter_entry(|e| !is_hidden(e.file_name()));
        for entry in walker {
            let entry = entry?;
            if entry.file_type().is_dir() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let key = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            keys.push(key);
        }
        Ok(keys)
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().map_or(false, |s| s.starts_with('.'))
}

fn create_dirs(dir: &Path) -> Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o770);
    }
    builder.create(dir).map_err(|source| StoreError::Write {
        path: dir.to_path_buf(),
        source,
    })
}
