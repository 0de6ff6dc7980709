//! JSON file store
//!
//! Each store is a directory; each file in it holds one serde value.
//! Writes go through a sibling temp file and a rename, so readers never
//! observe a half-written document.

use crate::{Error, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

const APP_DIR: &str = "tether";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonStore {
    root: PathBuf,
}

fn io_failure(action: &str, path: &Path, err: impl std::fmt::Display) -> Error {
    Error::Config(format!("Failed to {} {}: {}", action, path.display(), err))
}

impl JsonStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `<config dir>/tether/`
    pub fn global() -> Result<Self> {
        dirs::config_dir()
            .map(|dir| Self::new(dir.join(APP_DIR)))
            .ok_or_else(|| Error::Config("No user configuration directory on this host".into()))
    }

    /// `<root>/.tether/`
    pub fn project(root: impl AsRef<Path>) -> Self {
        Self::new(root.as_ref().join(format!(".{}", APP_DIR)))
    }

    pub fn current_project() -> Result<Self> {
        let cwd = std::env::current_dir().map_err(|e| io_failure("resolve", Path::new("."), e))?;
        Ok(Self::project(cwd))
    }

    pub fn base_dir(&self) -> &Path {
        &self.root
    }

    pub fn file_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.file_path(name).is_file()
    }

    /// Read `name`; `Ok(None)` when the file is absent
    pub fn load_optional<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        let path = self.file_path(name);
        let raw = match std::fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                trace!(path = %path.display(), "No JSON file");
                return Ok(None);
            }
            Err(e) => return Err(io_failure("read", &path, e)),
        };

        debug!(path = %path.display(), bytes = raw.len(), "Loaded JSON file");
        let value = serde_json::from_slice(&raw).map_err(|e| {
            warn!(path = %path.display(), "Malformed JSON file: {}", e);
            Error::from(e)
        })?;
        Ok(Some(value))
    }

    /// Read `name`; a missing file is an error
    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        self.load_optional(name)?
            .ok_or_else(|| io_failure("read", &self.file_path(name), "file not found"))
    }

    /// Read `name`, using `T::default()` when it is missing or unreadable
    pub fn load_or_default<T: DeserializeOwned + Default>(&self, name: &str) -> T {
        match self.load_optional(name) {
            Ok(value) => value.unwrap_or_default(),
            Err(e) => {
                debug!("{}; using defaults", e);
                T::default()
            }
        }
    }

    pub fn save<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.file_path(name);
        let body = serde_json::to_vec_pretty(value)?;

        std::fs::create_dir_all(&self.root).map_err(|e| io_failure("create", &self.root, e))?;
        let staging = path.with_extension("json.tmp");
        std::fs::write(&staging, body).map_err(|e| io_failure("write", &staging, e))?;
        std::fs::rename(&staging, &path).map_err(|e| io_failure("replace", &path, e))?;

        debug!(path = %path.display(), "Saved JSON file");
        Ok(())
    }

    /// Delete `name`; absent files are fine
    pub fn remove(&self, name: &str) -> Result<()> {
        let path = self.file_path(name);
        match std::fs::remove_file(&path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(io_failure("remove", &path, e)),
            _ => Ok(()),
        }
    }
}
