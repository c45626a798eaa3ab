//! Mock store for integration testing.
//!
//! A deterministic `BetStore` kept entirely in memory. Failures can be
//! forced from test code to exercise error paths above the store.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};

use ayaw::storage::BetStore;
use ayaw::types::*;

/// Build a stored straight bet without going through a store.
pub fn record(id: &str, date: &str, stake: Decimal, status: BetStatus) -> BetRecord {
    BetRecord {
        id: id.to_string(),
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        kind: BetKind::Straight,
        stake,
        potential_return: None,
        actual_return: None,
        odds: None,
        status,
        source: None,
        notes: None,
        legs: Vec::new(),
    }
}

/// A prop leg with just the searchable basics filled in.
pub fn leg(player: &str, prop: &str, result: BetStatus) -> PropLeg {
    PropLeg {
        player: player.to_string(),
        prop: prop.to_string(),
        result,
        ..Default::default()
    }
}

pub struct MockStore {
    bets: Arc<Mutex<Vec<BetRecord>>>,
    next_id: Arc<Mutex<u32>>,
    /// If set, all operations will return this error.
    force_error: Arc<Mutex<Option<String>>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::with_records(Vec::new())
    }

    pub fn with_records(records: Vec<BetRecord>) -> Self {
        Self {
            bets: Arc::new(Mutex::new(records)),
            next_id: Arc::new(Mutex::new(1)),
            force_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Force all subsequent operations to return an error.
    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    /// Clear any forced error.
    pub fn clear_error(&self) {
        *self.force_error.lock().unwrap() = None;
    }

    pub fn snapshot(&self) -> Vec<BetRecord> {
        self.bets.lock().unwrap().clone()
    }

    fn check(&self) -> Result<()> {
        match self.force_error.lock().unwrap().as_ref() {
            Some(err) => Err(anyhow!("{}", err)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl BetStore for MockStore {
    async fn list_all(&self) -> Result<Vec<BetRecord>> {
        self.check()?;
        Ok(self.snapshot())
    }

    async fn create(&self, draft: BetDraft) -> Result<BetRecord> {
        self.check()?;
        let id = {
            let mut next = self.next_id.lock().unwrap();
            let id = format!("MOCK-{:03}", *next);
            *next += 1;
            id
        };
        let record = draft.into_record(id)?;
        self.bets.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn update(&self, id: &str, patch: BetPatch) -> Result<Option<BetRecord>> {
        self.check()?;
        let mut bets = self.bets.lock().unwrap();
        let Some(bet) = bets.iter_mut().find(|b| b.id == id) else {
            return Ok(None);
        };
        bet.apply_patch(patch)?;
        Ok(Some(bet.clone()))
    }

    async fn settle(&self, id: &str, settlement: Settlement) -> Result<Option<BetRecord>> {
        self.check()?;
        let mut bets = self.bets.lock().unwrap();
        let Some(bet) = bets.iter_mut().find(|b| b.id == id) else {
            return Ok(None);
        };
        bet.settle(&settlement)?;
        Ok(Some(bet.clone()))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        self.check()?;
        let mut bets = self.bets.lock().unwrap();
        let before = bets.len();
        bets.retain(|b| b.id != id);
        Ok(bets.len() != before)
    }

    fn backend(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_sequential_ids() {
        let store = MockStore::new();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let a = store.create(BetDraft::new(date, dec!(1))).await.unwrap();
        let b = store.create(BetDraft::new(date, dec!(1))).await.unwrap();
        assert_eq!(a.id, "MOCK-001");
        assert_eq!(b.id, "MOCK-002");
    }

    #[tokio::test]
    async fn test_forced_error() {
        let store = MockStore::with_records(vec![record(
            "a",
            "2024-01-01",
            dec!(5),
            BetStatus::Pending,
        )]);
        store.set_error("disk full");
        let err = store.list_all().await.unwrap_err();
        assert_eq!(err.to_string(), "disk full");

        store.clear_error();
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }
}
