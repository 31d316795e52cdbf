//! Storage for proxy-granting tickets delivered through the callback.
//!
//! During ticket validation the SSO server calls the gateway's callback URL
//! with a `pgtIou`/`pgtId` pair, then answers the validation request with the
//! IOU alone. The callback and the validation usually run in different
//! requests (and, behind a load balancer, different processes), so the pair is
//! parked in a store until the validating request claims it.

use async_trait::async_trait;
use mailgate_core::{PgtIou, ProxyGrantingTicket};
use rootcause::Report;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::SsoError;

/// Trait for proxy-granting ticket storage.
///
/// Entries are single use: `take` removes what it returns.
#[async_trait]
pub trait PgtStore: Send + Sync {
    /// Stores the ticket delivered for an IOU, replacing any previous one.
    async fn put(&self, iou: &PgtIou, pgt: ProxyGrantingTicket) -> Result<(), Report<SsoError>>;

    /// Removes and returns the ticket delivered for an IOU.
    async fn take(&self, iou: &PgtIou) -> Result<Option<ProxyGrantingTicket>, Report<SsoError>>;
}

/// In-process store, suitable when callback and validation share a process.
#[derive(Debug, Clone, Default)]
pub struct MemoryPgtStore {
    entries: Arc<Mutex<HashMap<PgtIou, ProxyGrantingTicket>>>,
}

impl MemoryPgtStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PgtStore for MemoryPgtStore {
    async fn put(&self, iou: &PgtIou, pgt: ProxyGrantingTicket) -> Result<(), Report<SsoError>> {
        self.entries.lock().await.insert(iou.clone(), pgt);
        Ok(())
    }

    async fn take(&self, iou: &PgtIou) -> Result<Option<ProxyGrantingTicket>, Report<SsoError>> {
        Ok(self.entries.lock().await.remove(iou))
    }
}

/// Directory-backed store with one JSON file per IOU.
#[derive(Debug, Clone)]
pub struct FilePgtStore {
    dir: PathBuf,
}

#[derive(Serialize, Deserialize)]
struct StoredPgt {
    pgt: ProxyGrantingTicket,
}

impl FilePgtStore {
    /// Creates a store rooted at `dir`. The directory must already exist.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the storage directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, iou: &PgtIou) -> Result<PathBuf, Report<SsoError>> {
        let raw = iou.as_str();
        let safe = raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !raw.starts_with('.');
        if !safe {
            return Err(SsoError::PgtStorage {
                reason: format!("IOU '{raw}' is not usable as a file name"),
            }
            .into());
        }
        Ok(self.dir.join(format!("{raw}.json")))
    }
}

#[async_trait]
impl PgtStore for FilePgtStore {
    async fn put(&self, iou: &PgtIou, pgt: ProxyGrantingTicket) -> Result<(), Report<SsoError>> {
        let path = self.path_for(iou)?;
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_vec(&StoredPgt { pgt }).map_err(|e| SsoError::PgtStorage {
            reason: e.to_string(),
        })?;

        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| SsoError::PgtStorage {
                reason: format!("writing {}: {e}", tmp.display()),
            })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| SsoError::PgtStorage {
                reason: format!("renaming {}: {e}", tmp.display()),
            })?;

        debug!(iou = %iou, "stored proxy-granting ticket");
        Ok(())
    }

    async fn take(&self, iou: &PgtIou) -> Result<Option<ProxyGrantingTicket>, Report<SsoError>> {
        let path = self.path_for(iou)?;
        let body = match tokio::fs::read(&path).await {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SsoError::PgtStorage {
                    reason: format!("reading {}: {e}", path.display()),
                }
                .into());
            }
        };

        // A leftover file would let the IOU be claimed twice.
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| SsoError::PgtStorage {
                reason: format!("removing {}: {e}", path.display()),
            })?;

        let stored: StoredPgt = serde_json::from_slice(&body).map_err(|e| SsoError::PgtStorage {
            reason: format!("decoding {}: {e}", path.display()),
        })?;
        Ok(Some(stored.pgt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iou(raw: &str) -> PgtIou {
        PgtIou::new(raw).expect("valid")
    }

    fn pgt(raw: &str) -> ProxyGrantingTicket {
        ProxyGrantingTicket::new(raw).expect("valid")
    }

    #[tokio::test]
    async fn memory_store_is_single_use() {
        let store = MemoryPgtStore::new();
        store.put(&iou("PGTIOU-1"), pgt("PGT-1")).await.unwrap();

        let taken = store.take(&iou("PGTIOU-1")).await.unwrap();
        assert_eq!(taken, Some(pgt("PGT-1")));
        assert_eq!(store.take(&iou("PGTIOU-1")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn memory_store_clones_share_entries() {
        let store = MemoryPgtStore::new();
        let other = store.clone();
        store.put(&iou("PGTIOU-2"), pgt("PGT-2")).await.unwrap();
        assert_eq!(other.take(&iou("PGTIOU-2")).await.unwrap(), Some(pgt("PGT-2")));
    }

    #[tokio::test]
    async fn file_store_round_trips_and_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePgtStore::new(dir.path());

        store
            .put(&iou("PGTIOU-3-abc"), pgt("PGT-3-xyz"))
            .await
            .unwrap();
        assert!(dir.path().join("PGTIOU-3-abc.json").exists());

        let taken = store.take(&iou("PGTIOU-3-abc")).await.unwrap();
        assert_eq!(taken, Some(pgt("PGT-3-xyz")));
        assert!(!dir.path().join("PGTIOU-3-abc.json").exists());
    }

    #[tokio::test]
    async fn file_store_missing_entry_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePgtStore::new(dir.path());
        assert_eq!(store.take(&iou("PGTIOU-none")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn file_store_rejects_path_like_iou() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePgtStore::new(dir.path());

        assert!(store.put(&iou("../escape"), pgt("PGT-4")).await.is_err());
        assert!(store.take(&iou(".hidden")).await.is_err());
    }
}
