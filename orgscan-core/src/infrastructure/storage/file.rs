// orgscan-core/src/infrastructure/storage/file.rs

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::fs::atomic_write;
use crate::ports::storage::KeyValueStorage;

const RECORD_EXTENSION: &str = "rec";

/// One file per key under a directory. File names are the hex form of the
/// key so any key is a valid, reversible file name.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root
            .join(format!("{}.{}", hex::encode(key), RECORD_EXTENSION))
    }
}

impl KeyValueStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, InfrastructureError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), InfrastructureError> {
        fs::create_dir_all(&self.root)?;
        atomic_write(self.path_for(key), value)
    }

    fn remove_item(&self, key: &str) -> Result<(), InfrastructureError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> Result<Vec<String>, InfrastructureError> {
        if !self.root.exists() {
            return Ok(vec![]);
        }
        let mut keys = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| InfrastructureError::Io(e.into()))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match hex::decode(stem).ok().and_then(|raw| String::from_utf8(raw).ok()) {
                Some(key) => keys.push(key),
                None => debug!(path = ?path, "Skipping foreign file in cache directory"),
            }
        }
        keys.sort();
        Ok(keys)
    }
}
