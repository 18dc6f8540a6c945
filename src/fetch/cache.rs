// src/fetch/cache.rs

use anyhow::{Context, Result};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use super::Fetch;
use crate::error::IngestError;

/// Persistent URL → body cache in front of a [`Fetch`] implementation.
///
/// Entries are never refreshed: once a URL is present every lookup is served
/// from memory. The whole map is rewritten to disk after every miss, under
/// the lock, so memory never holds an entry the file lacks.
pub struct FetchCache<F> {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
    fetcher: F,
}

impl<F: Fetch> FetchCache<F> {
    /// Load the cache file at `path`. A missing or unreadable file, or one
    /// that is not a JSON object of strings, yields an empty cache.
    pub fn open(path: impl Into<PathBuf>, fetcher: F) -> Self {
        let path = path.into();
        let entries = load_entries(&path);
        info!(path = %path.display(), entries = entries.len(), "opened fetch cache");
        Self {
            path,
            entries: Mutex::new(entries),
            fetcher,
        }
    }

    /// A network failure is [`IngestError::Fetch`]; failing to write the
    /// cache file is [`IngestError::Cache`] and leaves the entry out.
    pub async fn get_or_fetch(&self, url: &Url) -> Result<String, IngestError> {
        let key = url.as_str();
        if let Some(body) = self.entries.lock().await.get(key) {
            debug!(%url, "using cache");
            return Ok(body.clone());
        }

        debug!(%url, "fetching");
        let body = self
            .fetcher
            .fetch(url)
            .await
            .map_err(|e| IngestError::Fetch {
                url: url.to_string(),
                reason: format!("{:#}", e),
            })?;

        let mut entries = self.entries.lock().await;
        // A concurrent miss on the same URL may have landed first; keep it.
        if let Some(existing) = entries.get(key) {
            return Ok(existing.clone());
        }
        entries.insert(key.to_string(), body.clone());
        if let Err(e) = persist(&self.path, &entries).await {
            entries.remove(key);
            return Err(IngestError::Cache {
                path: self.path.display().to_string(),
                reason: format!("{:#}", e),
            });
        }
        Ok(body)
    }

    pub async fn contains(&self, url: &Url) -> bool {
        self.entries.lock().await.contains_key(url.as_str())
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn load_entries(path: &Path) -> BTreeMap<String, String> {
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "no readable cache file, starting empty");
            return BTreeMap::new();
        }
    };
    match serde_json::from_str(&text) {
        Ok(map) => map,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "corrupt cache file, starting empty");
            BTreeMap::new()
        }
    }
}

/// Write to a sibling temp file, then rename over the original.
async fn persist(path: &Path, entries: &BTreeMap<String, String>) -> Result<()> {
    let bytes = serde_json::to_vec(entries).context("serializing cache")?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("fetch_cache.json");
    let tmp_path = path.with_file_name(format!(".{}.tmp", file_name));

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    tokio::fs::write(&tmp_path, &bytes)
        .await
        .with_context(|| format!("writing {:?}", tmp_path))?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("renaming {:?} -> {:?}", tmp_path, path))?;
    Ok(())
}
