//! Durable cache for raw holdings tables
//!
//! Stores the pre-normalization bytes of each fund's holdings file under
//! `data/cache/<key>.csv` with a `<key>.meta.json` sidecar carrying the
//! fetch timestamp. Caching raw bytes (not parsed constituents) means a
//! normalizer fix re-applies to cached data without re-fetching. Entries
//! are never evicted automatically; a portfolio's fund universe is small
//! and refresh is always caller-driven.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheMeta {
    /// Original fund reference the blob was fetched for.
    reference: String,
    fetched_at: DateTime<Utc>,
}

/// A cached raw table plus its fetch timestamp.
#[derive(Debug, Clone)]
pub struct CachedHoldings {
    pub raw: Vec<u8>,
    pub fetched_at: DateTime<Utc>,
}

/// One entry in a cache listing (for the `cache` command).
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub reference: String,
    pub fetched_at: DateTime<Utc>,
    pub size_bytes: u64,
}

pub struct HoldingCache {
    cache_dir: PathBuf,
}

impl HoldingCache {
    pub fn new(cache_dir: impl AsRef<Path>) -> Result<Self> {
        let cache_dir = cache_dir.as_ref().to_path_buf();
        fs::create_dir_all(&cache_dir)?;
        Ok(Self { cache_dir })
    }

    /// Derive a stable filesystem key from an opaque fund reference.
    /// URL references key on their path so the same product page always
    /// maps to the same blob regardless of query parameters.
    pub fn key_for(reference: &str) -> String {
        let base = match Url::parse(reference) {
            Ok(url) => url.path().trim_matches('/').to_string(),
            Err(_) => reference.to_string(),
        };

        let mut key = String::with_capacity(base.len());
        let mut last_was_sep = true;
        for ch in base.chars() {
            if ch.is_ascii_alphanumeric() {
                key.push(ch);
                last_was_sep = false;
            } else if !last_was_sep {
                key.push('_');
                last_was_sep = true;
            }
        }
        let key = key.trim_matches('_').to_string();
        if key.is_empty() {
            "fund".to_string()
        } else {
            key
        }
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.csv", key))
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.meta.json", key))
    }

    /// Load the cached raw table for a fund reference, if present.
    pub fn get(&self, reference: &str) -> Result<Option<CachedHoldings>> {
        let key = Self::key_for(reference);
        let blob_path = self.blob_path(&key);
        let meta_path = self.meta_path(&key);
        if !blob_path.exists() || !meta_path.exists() {
            return Ok(None);
        }

        let raw = fs::read(&blob_path)?;
        let meta: CacheMeta = serde_json::from_str(&fs::read_to_string(&meta_path)?)?;
        Ok(Some(CachedHoldings {
            raw,
            fetched_at: meta.fetched_at,
        }))
    }

    /// Persist a freshly fetched raw table, replacing any prior entry.
    pub fn put(&self, reference: &str, raw: &[u8]) -> Result<()> {
        let key = Self::key_for(reference);
        fs::write(self.blob_path(&key), raw)?;

        let meta = CacheMeta {
            reference: reference.to_string(),
            fetched_at: Utc::now(),
        };
        fs::write(self.meta_path(&key), serde_json::to_string_pretty(&meta)?)?;
        Ok(())
    }

    /// A missing entry counts as stale: both cases mean a fetch is due.
    pub fn is_stale(&self, reference: &str, max_age: Duration) -> bool {
        match self.get(reference) {
            Ok(Some(cached)) => Utc::now() - cached.fetched_at > max_age,
            _ => true,
        }
    }

    /// List all cached entries, newest first.
    pub fn entries(&self) -> Result<Vec<CacheEntry>> {
        let mut entries = Vec::new();
        for dir_entry in fs::read_dir(&self.cache_dir)? {
            let path = dir_entry?.path();
            let Some(filename) = path.file_name().and_then(|f| f.to_str()) else {
                continue;
            };
            let Some(key) = filename.strip_suffix(".meta.json") else {
                continue;
            };

            let meta: CacheMeta = serde_json::from_str(&fs::read_to_string(&path)?)?;
            let size_bytes = fs::metadata(self.blob_path(key))
                .map(|m| m.len())
                .unwrap_or(0);
            entries.push(CacheEntry {
                key: key.to_string(),
                reference: meta.reference,
                fetched_at: meta.fetched_at,
                size_bytes,
            });
        }
        entries.sort_by(|a, b| b.fetched_at.cmp(&a.fetched_at));
        Ok(entries)
    }

    /// Remove all cached blobs and metadata.
    pub fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        for dir_entry in fs::read_dir(&self.cache_dir)? {
            let path = dir_entry?.path();
            let Some(filename) = path.file_name().and_then(|f| f.to_str()) else {
                continue;
            };
            if filename.ends_with(".csv") || filename.ends_with(".meta.json") {
                fs::remove_file(&path)?;
                if filename.ends_with(".csv") {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }
}
