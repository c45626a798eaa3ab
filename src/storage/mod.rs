//! Persistence layer.
//!
//! Defines the `BetStore` trait and provides implementations for:
//! - Memory: process-local, used by tests and the `memory` backend
//! - JSON file: the whole history in one pretty-printed file
//! - SQLite: one row per bet via `sqlx`
//!
//! The store owns record identity. Drafts are normalized into canonical
//! records on the way in, so the engine only ever sees one shape.

pub mod json;
pub mod memory;
pub mod sqlite;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{StorageBackend, StorageConfig};
use crate::types::{BetDraft, BetKind, BetPatch, BetRecord, Settlement};

pub use json::JsonFileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Abstraction over bet record stores.
///
/// `list_all` returns records in insertion order; the filter engine relies
/// on it for tie-breaking.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BetStore: Send + Sync {
    /// Every stored bet, oldest insertion first.
    async fn list_all(&self) -> Result<Vec<BetRecord>>;

    /// Normalize and store a new bet, assigning its id.
    async fn create(&self, draft: BetDraft) -> Result<BetRecord>;

    /// Apply an edit. `None` if the id is unknown.
    async fn update(&self, id: &str, patch: BetPatch) -> Result<Option<BetRecord>>;

    /// Settle a pending bet. `None` if the id is unknown.
    async fn settle(&self, id: &str, settlement: Settlement) -> Result<Option<BetRecord>>;

    /// Remove a bet. `false` if the id is unknown.
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Backend name for logging.
    fn backend(&self) -> &'static str;
}

/// Fresh store id.
pub(crate) fn new_bet_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Build the configured store.
pub async fn open_store(cfg: &StorageConfig) -> Result<Arc<dyn BetStore>> {
    let store: Arc<dyn BetStore> = match cfg.backend {
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
        StorageBackend::Json => Arc::new(JsonFileStore::open(&cfg.path)?),
        StorageBackend::Sqlite => Arc::new(SqliteStore::connect(&cfg.path).await?),
    };
    info!(backend = store.backend(), path = %cfg.path, "Bet store opened");
    Ok(store)
}

// ---------------------------------------------------------------------------
// JSON snapshot helpers
// ---------------------------------------------------------------------------

/// Write records to a JSON file.
pub fn save_records(records: &[BetRecord], path: &str) -> Result<()> {
    let json = serde_json::to_string_pretty(records).context("Failed to serialise bet records")?;

    std::fs::write(path, &json).context(format!("Failed to write bets to {path}"))?;

    debug!(path, count = records.len(), "Bets saved");
    Ok(())
}

/// Read records from a JSON file. Returns an empty history if the file
/// doesn't exist.
pub fn load_records(path: &str) -> Result<Vec<BetRecord>> {
    if !Path::new(path).exists() {
        info!(path, "No saved bets found, starting empty");
        return Ok(Vec::new());
    }

    let json = std::fs::read_to_string(path).context(format!("Failed to read bets from {path}"))?;

    let raw: Vec<serde_json::Value> =
        serde_json::from_str(&json).context(format!("Failed to parse bets from {path}"))?;
    let records = raw
        .into_iter()
        .map(record_from_stored)
        .collect::<Result<Vec<_>>>()
        .context(format!("Failed to parse bets from {path}"))?;

    info!(path, count = records.len(), "Bets loaded from disk");
    Ok(records)
}

/// Decode a stored record, deriving `kind` from the leg count for records
/// written before the field existed.
pub(crate) fn record_from_stored(mut value: serde_json::Value) -> Result<BetRecord> {
    if let Some(obj) = value.as_object_mut() {
        if !obj.contains_key("kind") {
            let legs = obj
                .get("legs")
                .and_then(serde_json::Value::as_array)
                .map_or(0, Vec::len);
            let kind = BetKind::from_leg_count(legs);
            debug!(id = ?obj.get("id"), %kind, "Derived kind for legacy record");
            obj.insert("kind".to_string(), serde_json::json!(kind));
        }
    }
    Ok(serde_json::from_value(value)?)
}

// ---------------------------------------------------------------------------
// Import / export
// ---------------------------------------------------------------------------

/// Outcome of a lenient import.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

/// Create a bet for every element of `items` that parses and validates.
///
/// Bad elements are logged and counted, never fatal. Store failures are.
pub async fn import_records(
    store: &dyn BetStore,
    items: Vec<serde_json::Value>,
) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();

    for (index, item) in items.into_iter().enumerate() {
        let draft: BetDraft = match serde_json::from_value(item) {
            Ok(d) => d,
            Err(e) => {
                warn!(index, error = %e, "Skipping unparseable bet");
                summary.skipped += 1;
                continue;
            }
        };
        // Validate before touching the store so a bad element can't be
        // mistaken for a storage failure.
        if let Err(e) = draft.clone().into_record(String::new()) {
            warn!(index, error = %e, "Skipping invalid bet");
            summary.skipped += 1;
            continue;
        }
        store.create(draft).await?;
        summary.imported += 1;
    }

    info!(
        imported = summary.imported,
        skipped = summary.skipped,
        "Import finished"
    );
    Ok(summary)
}

/// All bets as a JSON array, insertion order.
pub async fn export_records(store: &dyn BetStore) -> Result<serde_json::Value> {
    let records = store.list_all().await?;
    serde_json::to_value(&records).context("Failed to serialise export")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
