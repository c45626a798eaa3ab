//! Statistics aggregator.
//!
//! Single-pass summaries over an already filtered set of bets: counts,
//! decimal-exact stake and profit totals, win rate and ROI. Also the
//! running profit timeline and the per-source breakdown shown next to the
//! bet list.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use super::filter::ViewMode;
use crate::types::{BetRecord, BetStatus};

// ---------------------------------------------------------------------------
// Modes & results
// ---------------------------------------------------------------------------

/// Unit of counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationMode {
    /// One unit per bet.
    Record,
    /// One unit per prop leg.
    Leg,
}

impl AggregationMode {
    pub fn for_view(view: ViewMode) -> Self {
        match view {
            ViewMode::Props => AggregationMode::Leg,
            ViewMode::All | ViewMode::Straight | ViewMode::Parlays => AggregationMode::Record,
        }
    }
}

/// Summary metrics. `win_rate` and `roi` are percentages and are exactly
/// zero when their denominator is zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_count: usize,
    pub total_staked: Decimal,
    pub total_profit: Decimal,
    pub wins: usize,
    pub losses: usize,
    pub pushes: usize,
    pub settled_count: usize,
    pub win_rate: Decimal,
    pub roi: Decimal,
}

impl Stats {
    fn tally(&mut self, status: BetStatus) {
        match status {
            BetStatus::Won => self.wins += 1,
            BetStatus::Lost => self.losses += 1,
            BetStatus::Push => self.pushes += 1,
            BetStatus::Pending => {}
        }
    }

    fn finish(mut self) -> Self {
        self.settled_count = self.wins + self.losses + self.pushes;
        self.win_rate = if self.settled_count == 0 {
            Decimal::ZERO
        } else {
            Decimal::from(self.wins) * Decimal::ONE_HUNDRED / Decimal::from(self.settled_count)
        };
        self.roi = if self.total_staked.is_zero() {
            Decimal::ZERO
        } else {
            self.total_profit * Decimal::ONE_HUNDRED / self.total_staked
        };
        self
    }
}

/// One point of the cumulative profit curve.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfitPoint {
    pub date: NaiveDate,
    pub profit: Decimal,
    pub cumulative: Decimal,
}

/// Record-level stats for one sportsbook/platform label.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceStats {
    pub source: String,
    pub stats: Stats,
}

const UNKNOWN_SOURCE: &str = "unknown";

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Summarize `records` in one pass. Never fails; empty input yields zeros.
///
/// In leg mode the unit is each prop leg. Legs carry no stake of their own,
/// so `total_staked`, `total_profit` and `roi` stay zero there: the props
/// view reports win/loss/push counts only.
pub fn aggregate(records: &[BetRecord], mode: AggregationMode) -> Stats {
    let mut skipped = 0usize;

    let stats = records
        .iter()
        .filter(|r| {
            let ok = r.is_well_formed();
            if !ok {
                skipped += 1;
            }
            ok
        })
        .fold(Stats::default(), |mut acc, record| {
            match mode {
                AggregationMode::Record => {
                    acc.total_count += 1;
                    acc.total_staked += record.stake;
                    acc.total_profit += record.profit();
                    acc.tally(record.status);
                }
                AggregationMode::Leg => {
                    for leg in &record.legs {
                        acc.total_count += 1;
                        acc.tally(leg.result);
                    }
                }
            }
            acc
        })
        .finish();

    if skipped > 0 {
        debug!(skipped, "Malformed records excluded from aggregation");
    }

    stats
}

/// Cumulative net profit by calendar date, oldest first.
pub fn profit_timeline(records: &[BetRecord]) -> Vec<ProfitPoint> {
    let mut by_day: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    for record in records.iter().filter(|r| r.is_well_formed()) {
        *by_day.entry(record.date).or_insert(Decimal::ZERO) += record.profit();
    }

    let mut cumulative = Decimal::ZERO;
    by_day
        .into_iter()
        .map(|(date, profit)| {
            cumulative += profit;
            ProfitPoint {
                date,
                profit,
                cumulative,
            }
        })
        .collect()
}

/// Record-level stats grouped by `source`, ordered by label.
pub fn breakdown_by_source(records: &[BetRecord]) -> Vec<SourceStats> {
    let mut groups: BTreeMap<String, Vec<BetRecord>> = BTreeMap::new();
    for record in records {
        let key = record
            .source
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_SOURCE)
            .to_string();
        groups.entry(key).or_default().push(record.clone());
    }

    groups
        .into_iter()
        .map(|(source, group)| SourceStats {
            source,
            stats: aggregate(&group, AggregationMode::Record),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
