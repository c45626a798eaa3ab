//! SQLite bet store using sqlx.
//!
//! Each bet is one row holding the record as a JSON payload. `seq` keeps
//! insertion order for `list_all`. Edits run read-modify-write inside one
//! transaction and only overwrite the payload they read.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::str::FromStr;
use tracing::{debug, warn};

use super::{new_bet_id, record_from_stored, BetStore};
use crate::types::{AyawError, BetDraft, BetPatch, BetRecord, Settlement};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS bets (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    payload TEXT NOT NULL
)";

#[derive(Debug, FromRow)]
struct BetRow {
    id: String,
    payload: String,
}

impl BetRow {
    fn to_record(&self) -> Result<BetRecord> {
        serde_json::from_str(&self.payload)
            .map_err(anyhow::Error::from)
            .and_then(record_from_stored)
            .with_context(|| format!("Corrupt payload for bet {}", self.id))
    }
}

fn storage_err(e: sqlx::Error) -> AyawError {
    AyawError::Storage(e.to_string())
}

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to `url` (a file path or `sqlite::memory:`) and ensure the
    /// schema exists.
    pub async fn connect(url: &str) -> Result<Self> {
        let location = if url.starts_with("sqlite:") {
            url.to_string()
        } else {
            format!("sqlite://{url}")
        };
        let options = SqliteConnectOptions::from_str(&location)
            .with_context(|| format!("Invalid SQLite location: {url}"))?
            .create_if_missing(true);

        // A single connection keeps `sqlite::memory:` one database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open SQLite database: {url}"))?;

        sqlx::query(SCHEMA)
            .execute(&pool)
            .await
            .context("Failed to create bets table")?;

        debug!(url, "SQLite store ready");
        Ok(Self { pool })
    }

    /// Apply `change` to the stored record in one transaction. `None` if
    /// the id is unknown; nothing is written if `change` fails.
    async fn modify<F>(&self, id: &str, change: F) -> Result<Option<BetRecord>>
    where
        F: FnOnce(&mut BetRecord) -> Result<(), AyawError> + Send,
    {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;

        let row: Option<BetRow> = sqlx::query_as("SELECT id, payload FROM bets WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(storage_err)?;
        let Some(row) = row else {
            return Ok(None);
        };

        let mut record = row.to_record()?;
        change(&mut record)?;
        let payload = serde_json::to_string(&record).context("Failed to serialise bet")?;

        let result = sqlx::query("UPDATE bets SET payload = ? WHERE id = ? AND payload = ?")
            .bind(payload)
            .bind(id)
            .bind(row.payload.as_str())
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;
        if result.rows_affected() == 0 {
            return Err(AyawError::Storage(format!("Bet {id} changed during update")).into());
        }

        tx.commit().await.map_err(storage_err)?;
        Ok(Some(record))
    }
}

#[async_trait]
impl BetStore for SqliteStore {
    async fn list_all(&self) -> Result<Vec<BetRecord>> {
        let rows: Vec<BetRow> = sqlx::query_as("SELECT id, payload FROM bets ORDER BY seq")
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            match row.to_record() {
                Ok(record) => records.push(record),
                Err(e) => warn!(id = %row.id, error = %e, "Skipping corrupt bet row"),
            }
        }
        Ok(records)
    }

    async fn create(&self, draft: BetDraft) -> Result<BetRecord> {
        let record = draft.into_record(new_bet_id())?;
        let payload = serde_json::to_string(&record).context("Failed to serialise bet")?;
        sqlx::query("INSERT INTO bets (id, payload) VALUES (?, ?)")
            .bind(record.id.as_str())
            .bind(payload)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(record)
    }

    async fn update(&self, id: &str, patch: BetPatch) -> Result<Option<BetRecord>> {
        self.modify(id, move |record| record.apply_patch(patch)).await
    }

    async fn settle(&self, id: &str, settlement: Settlement) -> Result<Option<BetRecord>> {
        self.modify(id, move |record| record.settle(&settlement)).await
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM bets WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(result.rows_affected() > 0)
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}
