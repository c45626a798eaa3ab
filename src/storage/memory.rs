//! In-memory bet store.

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{new_bet_id, BetStore};
use crate::types::{BetDraft, BetPatch, BetRecord, Settlement};

/// Process-local store; contents are lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    bets: RwLock<Vec<BetRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with existing records (kept in the given order).
    pub fn with_records(records: Vec<BetRecord>) -> Self {
        Self {
            bets: RwLock::new(records),
        }
    }
}

// Vec operations shared with the JSON file store.

pub(crate) fn insert(bets: &mut Vec<BetRecord>, draft: BetDraft) -> Result<BetRecord> {
    let record = draft.into_record(new_bet_id())?;
    bets.push(record.clone());
    Ok(record)
}

pub(crate) fn patch(
    bets: &mut [BetRecord],
    id: &str,
    patch: BetPatch,
) -> Result<Option<BetRecord>> {
    match bets.iter_mut().find(|b| b.id == id) {
        Some(bet) => {
            bet.apply_patch(patch)?;
            Ok(Some(bet.clone()))
        }
        None => Ok(None),
    }
}

pub(crate) fn settle(
    bets: &mut [BetRecord],
    id: &str,
    settlement: &Settlement,
) -> Result<Option<BetRecord>> {
    match bets.iter_mut().find(|b| b.id == id) {
        Some(bet) => {
            bet.settle(settlement)?;
            Ok(Some(bet.clone()))
        }
        None => Ok(None),
    }
}

pub(crate) fn remove(bets: &mut Vec<BetRecord>, id: &str) -> bool {
    let before = bets.len();
    bets.retain(|b| b.id != id);
    bets.len() != before
}

#[async_trait]
impl BetStore for MemoryStore {
    async fn list_all(&self) -> Result<Vec<BetRecord>> {
        Ok(self.bets.read().await.clone())
    }

    async fn create(&self, draft: BetDraft) -> Result<BetRecord> {
        insert(&mut *self.bets.write().await, draft)
    }

    async fn update(&self, id: &str, bet_patch: BetPatch) -> Result<Option<BetRecord>> {
        patch(&mut self.bets.write().await, id, bet_patch)
    }

    async fn settle(&self, id: &str, settlement: Settlement) -> Result<Option<BetRecord>> {
        settle(&mut self.bets.write().await, id, &settlement)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(remove(&mut *self.bets.write().await, id))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
