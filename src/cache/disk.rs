//! Disk Store Module
//!
//! Reads and writes the two files kept per key: the JSON entry record under
//! `cache/<key>.cache` and the raw payload under `meta/<key>.meta`.
//!
//! Pure I/O. Callers must hold the key's lock.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;

use crate::cache::{EntryRecord, MAX_KEY_LENGTH};
use crate::error::{CacheError, Result};

const RECORD_DIR: &str = "cache";
const PAYLOAD_DIR: &str = "meta";
const RECORD_EXT: &str = "cache";
const PAYLOAD_EXT: &str = "meta";

// == Disk Store ==
#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
    records: PathBuf,
    payloads: PathBuf,
}

impl DiskStore {
    // == Constructor ==
    /// Opens the store under `root`, creating the directories as needed.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let records = root.join(RECORD_DIR);
        let payloads = root.join(PAYLOAD_DIR);

        for dir in [&root, &records, &payloads] {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| CacheError::io(format!("creating {}", dir.display()), e))?;
        }

        Ok(Self {
            root,
            records,
            payloads,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn record_path(&self, key: &str) -> PathBuf {
        self.records.join(format!("{key}.{RECORD_EXT}"))
    }

    pub fn payload_path(&self, key: &str) -> PathBuf {
        self.payloads.join(format!("{key}.{PAYLOAD_EXT}"))
    }

    // == Entry Records ==
    /// Reads the entry record, `None` if the key has none.
    pub async fn read_record(&self, key: &str) -> Result<Option<EntryRecord>> {
        let path = self.record_path(key);
        match read_optional(&path).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub async fn write_record(&self, key: &str, record: &EntryRecord) -> Result<()> {
        let path = self.record_path(key);
        let json = serde_json::to_vec(record)?;
        fs::write(&path, json)
            .await
            .map_err(|e| CacheError::io(format!("writing {}", path.display()), e))
    }

    // == Payloads ==
    /// Reads the payload bytes, `None` if the key has none.
    pub async fn read_payload(&self, key: &str) -> Result<Option<Vec<u8>>> {
        read_optional(&self.payload_path(key)).await
    }

    pub async fn write_payload(&self, key: &str, payload: &[u8]) -> Result<()> {
        let path = self.payload_path(key);
        fs::write(&path, payload)
            .await
            .map_err(|e| CacheError::io(format!("writing {}", path.display()), e))
    }

    // == Delete ==
    /// Deletes both files of a key. Missing files count as deleted.
    pub async fn delete(&self, key: &str) -> Result<()> {
        remove_optional(&self.record_path(key)).await?;
        remove_optional(&self.payload_path(key)).await
    }

    // == List Keys ==
    /// Returns every key that has an entry record on disk.
    pub async fn list_keys(&self) -> Result<Vec<String>> {
        let context = || format!("listing {}", self.records.display());
        let mut dir = fs::read_dir(&self.records)
            .await
            .map_err(|e| CacheError::io(context(), e))?;

        let mut keys = Vec::new();
        while let Some(entry) = dir.next_entry().await.map_err(|e| CacheError::io(context(), e))? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(RECORD_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                keys.push(stem.to_string());
            }
        }
        Ok(keys)
    }
}

// == Key Validation ==
/// Rejects keys that cannot be used verbatim as a file name stem.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidKey("key must not be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidKey(format!(
            "key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    if key == "." || key == ".." || key.contains(['/', '\\', '\0']) {
        return Err(CacheError::InvalidKey(format!("{key:?} is not a valid file name")));
    }
    Ok(())
}

async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(CacheError::io(format!("reading {}", path.display()), e)),
    }
}

async fn remove_optional(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CacheError::io(format!("deleting {}", path.display()), e)),
    }
}
