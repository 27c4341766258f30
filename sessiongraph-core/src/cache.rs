//! Content-addressed extraction cache.
//!
//! One JSON file per key under the cache directory. Entries are written once
//! on a miss and read many times afterwards; nothing here evicts, expires or
//! rewrites an entry. The store assumes a single owning process and takes no
//! locks.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::{Entity, Relationship};

/// Number of hex characters kept from the SHA-256 digest.
pub const KEY_LENGTH: usize = 16;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cache entry {key} is not valid JSON: {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Normalized extraction payload as persisted on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(skip)]
    pub key: String,
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub concepts: Vec<String>,
    #[serde(rename = "analysis_timestamp", default)]
    pub produced_at: String,
    #[serde(rename = "model_version", default)]
    pub extractor_version: String,
}

#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    /// Open (creating if needed) a cache rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| CacheError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    /// Derive the cache key for an extraction request.
    pub fn key(content: &str, context: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        hasher.update(context.as_bytes());
        let digest = hex::encode(hasher.finalize());
        digest[..KEY_LENGTH].to_string()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Look up an entry. Unreadable or undecodable files are reported and
    /// treated as a miss.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        let path = self.path_for(key);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(key = %key, path = %path.display(), error = %e, "Failed to read cache entry");
                return None;
            }
        };

        match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(mut entry) => {
                entry.key = key.to_string();
                Some(entry)
            }
            Err(source) => {
                let e = CacheError::Json {
                    key: key.to_string(),
                    source,
                };
                tracing::warn!(error = %e, "Ignoring corrupt cache entry");
                None
            }
        }
    }

    /// Write an entry. Overwriting an existing key is allowed.
    pub fn put(&self, key: &str, entry: &CacheEntry) -> Result<(), CacheError> {
        let path = self.path_for(key);
        let body = serde_json::to_string_pretty(entry).map_err(|source| CacheError::Json {
            key: key.to_string(),
            source,
        })?;
        fs::write(&path, body).map_err(|source| CacheError::Io { path, source })
    }

    /// Number of entries currently on disk.
    pub fn len(&self) -> usize {
        Self::count_entries(&self.dir)
    }

    /// Count entries under `dir` without opening a store. A missing
    /// directory counts as empty and is not created.
    pub fn count_entries(dir: &Path) -> usize {
        fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
                    .count()
            })
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
