//! JSON-file bet store.
//!
//! Keeps the history in memory and rewrites the whole file after every
//! mutation. Fine for a personal tracker with a few hundred bets.

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use super::memory::{insert, patch, remove, settle};
use super::{load_records, save_records, BetStore};
use crate::types::{BetDraft, BetPatch, BetRecord, Settlement};

pub struct JsonFileStore {
    path: String,
    bets: RwLock<Vec<BetRecord>>,
}

impl JsonFileStore {
    /// Open (or start) the file at `path`. A missing file is an empty
    /// history; a corrupt one is an error.
    pub fn open(path: &str) -> Result<Self> {
        let bets = load_records(path)?;
        Ok(Self {
            path: path.to_string(),
            bets: RwLock::new(bets),
        })
    }
}

#[async_trait]
impl BetStore for JsonFileStore {
    async fn list_all(&self) -> Result<Vec<BetRecord>> {
        Ok(self.bets.read().await.clone())
    }

    async fn create(&self, draft: BetDraft) -> Result<BetRecord> {
        let mut bets = self.bets.write().await;
        let record = insert(&mut bets, draft)?;
        if let Err(e) = save_records(&bets, &self.path) {
            bets.pop();
            return Err(e);
        }
        Ok(record)
    }

    async fn update(&self, id: &str, bet_patch: BetPatch) -> Result<Option<BetRecord>> {
        let mut bets = self.bets.write().await;
        let snapshot = bets.clone();
        let updated = patch(&mut bets, id, bet_patch)?;
        if updated.is_some() {
            if let Err(e) = save_records(&bets, &self.path) {
                *bets = snapshot;
                return Err(e);
            }
        }
        Ok(updated)
    }

    async fn settle(&self, id: &str, settlement: Settlement) -> Result<Option<BetRecord>> {
        let mut bets = self.bets.write().await;
        let snapshot = bets.clone();
        let settled = settle(&mut bets, id, &settlement)?;
        if settled.is_some() {
            if let Err(e) = save_records(&bets, &self.path) {
                *bets = snapshot;
                return Err(e);
            }
        }
        Ok(settled)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut bets = self.bets.write().await;
        let snapshot = bets.clone();
        let removed = remove(&mut bets, id);
        if removed {
            if let Err(e) = save_records(&bets, &self.path) {
                *bets = snapshot;
                return Err(e);
            }
        }
        Ok(removed)
    }

    fn backend(&self) -> &'static str {
        "json"
    }
}
