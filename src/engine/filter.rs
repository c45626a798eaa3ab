//! Filter engine.
//!
//! Narrows a collection of bet records by date bounds, view mode and (in
//! the props view) a free-text search, then orders the survivors newest
//! first. Stages run in a fixed order, each on the output of the previous.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::types::{deserialize_opt_date, BetKind, BetRecord, PropLeg};

// ---------------------------------------------------------------------------
// Filter specification
// ---------------------------------------------------------------------------

/// Which slice of the history to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    All,
    Straight,
    Parlays,
    Props,
}

/// Filter criteria. Every field is optional; absence means no constraint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSpec {
    #[serde(default)]
    pub view_mode: ViewMode,
    #[serde(default, deserialize_with = "deserialize_opt_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_opt_date")]
    pub end_date: Option<NaiveDate>,
    /// Only consulted in the props view.
    #[serde(default)]
    pub search_term: Option<String>,
}

impl FilterSpec {
    pub fn view(view_mode: ViewMode) -> Self {
        Self {
            view_mode,
            ..Default::default()
        }
    }

    pub fn between(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    pub fn search(mut self, term: &str) -> Self {
        self.search_term = Some(term.to_string());
        self
    }

    /// Lowercased whitespace-separated query words; empty when the search
    /// stage does not apply.
    fn query_words(&self) -> Vec<String> {
        if self.view_mode != ViewMode::Props {
            return Vec::new();
        }
        self.search_term
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_lowercase)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// Inclusive bound check on the calendar date. An inverted range matches
/// nothing.
fn within_dates(record: &BetRecord, start: Option<NaiveDate>, end: Option<NaiveDate>) -> bool {
    start.map_or(true, |s| record.date >= s) && end.map_or(true, |e| record.date <= e)
}

/// Records are normalized at the store boundary, so `kind` is the single
/// source of truth here and `straight`/`parlays` partition the collection.
fn matches_view(record: &BetRecord, view: ViewMode) -> bool {
    match view {
        ViewMode::All => true,
        ViewMode::Straight => record.kind == BetKind::Straight,
        ViewMode::Parlays => record.kind == BetKind::Parlay,
        ViewMode::Props => !record.legs.is_empty(),
    }
}

/// Case-folded text a leg is searched against, including the parent bet's
/// notes and source.
fn searchable_text(leg: &PropLeg, record: &BetRecord) -> String {
    let result = leg.result.to_string();
    let fields = [
        Some(leg.player.as_str()),
        Some(leg.prop.as_str()),
        leg.sport.as_deref(),
        leg.league.as_deref(),
        leg.sportsbook.as_deref(),
        Some(result.as_str()),
        record.notes.as_deref(),
        record.source.as_deref(),
    ];
    fields
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// AND across words, OR across legs, substring containment.
fn matches_search(record: &BetRecord, words: &[String]) -> bool {
    record.legs.iter().any(|leg| {
        let text = searchable_text(leg, record);
        words.iter().all(|w| text.contains(w.as_str()))
    })
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Return the records matching every active criterion, newest first.
///
/// Records sharing a date keep their input order. The input is not
/// modified.
pub fn filter(records: &[BetRecord], spec: &FilterSpec) -> Vec<BetRecord> {
    let words = spec.query_words();

    let mut out: Vec<BetRecord> = records
        .iter()
        .filter(|r| within_dates(r, spec.start_date, spec.end_date))
        .filter(|r| matches_view(r, spec.view_mode))
        .filter(|r| words.is_empty() || matches_search(r, &words))
        .cloned()
        .collect();

    // `sort_by` is stable.
    out.sort_by(|a, b| b.date.cmp(&a.date));

    trace!(
        input = records.len(),
        output = out.len(),
        view = ?spec.view_mode,
        "Records filtered"
    );

    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
