//! Height-keyed snapshot persistence, grounded on the teacher's
//! `chaindb.rs` (`open`/`append_block`/`load_state`/`rollback_to`).
//! Swaps the teacher's `serde_json` file format for `bincode` — a
//! deliberate deviation (see DESIGN.md) chosen for the more compact
//! on-disk encoding this spec's snapshot-per-height scheme benefits from.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::ids::Height;
use crate::observer::ScoreObserver;
use crate::registry::{DelegateRegistry, RevenueWindow};
use crate::vote_ledger::VoteLedger;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("io error accessing snapshot store: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("failed to decode snapshot: {0}")]
    Decode(#[from] bincode::error::DecodeError),
    #[error("no snapshot found at or before height {0}")]
    NotFound(Height),
}

/// Everything required to reproduce C1/C2/C3 exactly, per §6's replay
/// requirement ("replay from genesis must reproduce identical C1, C2,
/// C3 states"). C5 is deliberately excluded — it is local-only and may
/// diverge across nodes (§6), so persisting it would misrepresent it as
/// authoritative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub height: Height,
    pub ledger: VoteLedger,
    pub registry: DelegateRegistry,
    pub revenue: RevenueWindow,
}

/// On-disk store of one snapshot file per height, under `base_dir`.
pub struct SnapshotStore {
    base_dir: PathBuf,
}

impl SnapshotStore {
    /// Opens (creating if absent) the snapshot directory.
    pub async fn open(base_dir: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let base_dir = base_dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&base_dir).await?;
        Ok(Self { base_dir })
    }

    fn path_for(&self, height: Height) -> PathBuf {
        self.base_dir.join(format!("{height:020}.snapshot"))
    }

    pub async fn save(&self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        let bytes = bincode::serde::encode_to_vec(snapshot, bincode::config::standard())?;
        let path = self.path_for(snapshot.height);
        let tmp_path = path.with_extension("snapshot.tmp");
        let mut file = tokio::fs::File::create(&tmp_path).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        tokio::fs::rename(&tmp_path, &path).await?;
        Ok(())
    }

    pub async fn load(&self, height: Height) -> Result<Snapshot, PersistenceError> {
        let path = self.path_for(height);
        let mut file = tokio::fs::File::open(&path)
            .await
            .map_err(|_| PersistenceError::NotFound(height))?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).await?;
        let (snapshot, _) = bincode::serde::decode_from_slice(&bytes, bincode::config::standard())?;
        Ok(snapshot)
    }

    /// Returns every height with a persisted snapshot, ascending.
    pub async fn heights(&self) -> Result<Vec<Height>, PersistenceError> {
        let mut entries = tokio::fs::read_dir(&self.base_dir).await?;
        let mut heights = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(stem) = name.strip_suffix(".snapshot") {
                if let Ok(height) = stem.parse::<Height>() {
                    heights.push(height);
                }
            }
        }
        heights.sort_unstable();
        Ok(heights)
    }

    /// Loads the latest snapshot at or before `height`, or `None` if
    /// nothing has been persisted yet (fresh genesis start).
    pub async fn load_latest_at_or_before(&self, height: Height) -> Result<Option<Snapshot>, PersistenceError> {
        let mut candidates = self.heights().await?;
        candidates.retain(|h| *h <= height);
        match candidates.into_iter().max() {
            Some(h) => Ok(Some(self.load(h).await?)),
            None => Ok(None),
        }
    }

    /// Discards every snapshot after `height`, so a subsequent replay
    /// restarts from `height` instead of a later, now-invalid point.
    pub async fn rollback_to(&self, height: Height) -> Result<(), PersistenceError> {
        for h in self.heights().await? {
            if h > height {
                tokio::fs::remove_file(self.path_for(h)).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_a_snapshot() {
        let dir = tempdir();
        let store = SnapshotStore::open(&dir).await.unwrap();
        let snapshot = Snapshot {
            height: 42,
            ledger: VoteLedger::new(1_000_000, 200),
            registry: DelegateRegistry::new(),
            revenue: RevenueWindow::new(100),
        };
        store.save(&snapshot).await.unwrap();
        let loaded = store.load(42).await.unwrap();
        assert_eq!(loaded.height, 42);
        assert_eq!(loaded.ledger.total_supply(), 1_000_000);
    }

    #[tokio::test]
    async fn rollback_removes_later_snapshots() {
        let dir = tempdir();
        let store = SnapshotStore::open(&dir).await.unwrap();
        for h in [1, 2, 3] {
            store
                .save(&Snapshot {
                    height: h,
                    ledger: VoteLedger::new(1000, 200),
                    registry: DelegateRegistry::new(),
                    revenue: RevenueWindow::new(10),
                })
                .await
                .unwrap();
        }
        store.rollback_to(1).await.unwrap();
        assert_eq!(store.heights().await.unwrap(), vec![1]);
    }

    fn tempdir() -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("dpos-core-test-{}-{:?}", std::process::id(), std::thread::current().id()));
        dir
    }
}
