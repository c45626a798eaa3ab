//! Shared types for AYAW.
//!
//! The bet record model used by the store, the filter engine, the
//! statistics aggregator and the HTTP layer. Records are normalized at the
//! store boundary (see [`BetDraft::into_record`]) so everything downstream
//! sees a single canonical shape.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Largest stake or return a record may carry. Keeps every sum and
/// percentage the aggregator computes far from `Decimal` overflow.
pub const MAX_AMOUNT: Decimal = dec!(1000000000);

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Straight (single outcome) or parlay (combined legs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetKind {
    Straight,
    Parlay,
}

impl BetKind {
    /// Legacy classification for records that predate the `kind` field.
    pub fn from_leg_count(legs: usize) -> Self {
        if legs <= 1 {
            BetKind::Straight
        } else {
            BetKind::Parlay
        }
    }
}

impl fmt::Display for BetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetKind::Straight => write!(f, "straight"),
            BetKind::Parlay => write!(f, "parlay"),
        }
    }
}

/// Outcome of a bet or of a single leg.
///
/// Serialized lowercase; deserialization also takes the aliases older
/// exports used (`open`, `win`, `loss`, `void`) in any case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BetStatus {
    #[default]
    Pending,
    Won,
    Lost,
    Push,
}

impl BetStatus {
    /// `won`, `lost` and `push` are terminal.
    pub fn is_settled(&self) -> bool {
        !matches!(self, BetStatus::Pending)
    }
}

impl fmt::Display for BetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetStatus::Pending => write!(f, "pending"),
            BetStatus::Won => write!(f, "won"),
            BetStatus::Lost => write!(f, "lost"),
            BetStatus::Push => write!(f, "push"),
        }
    }
}

impl FromStr for BetStatus {
    type Err = AyawError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" | "open" => Ok(BetStatus::Pending),
            "won" | "win" => Ok(BetStatus::Won),
            "lost" | "loss" => Ok(BetStatus::Lost),
            "push" | "void" => Ok(BetStatus::Push),
            _ => Err(AyawError::Validation(format!("Unknown bet status: {s}"))),
        }
    }
}

impl<'de> Deserialize<'de> for BetStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// American odds
// ---------------------------------------------------------------------------

/// Signed American odds (`+150`, `-110`).
///
/// Positive values are the profit on a 100 stake; negative values are the
/// stake needed to profit 100. The sign is mandatory when parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AmericanOdds(i32);

impl AmericanOdds {
    pub fn new(value: i32) -> Result<Self, AyawError> {
        if value.unsigned_abs() < 100 {
            return Err(AyawError::InvalidOdds(format!(
                "American odds must be at least 100 in magnitude, got {value}"
            )));
        }
        Ok(Self(value))
    }

    /// Profit returned per unit staked on a win.
    pub fn profit_per_unit(&self) -> Decimal {
        if self.0 > 0 {
            Decimal::from(self.0) / Decimal::ONE_HUNDRED
        } else {
            Decimal::ONE_HUNDRED / Decimal::from(self.0.unsigned_abs())
        }
    }

    /// Stake plus profit on a win, rounded to cents. `None` if the
    /// amount does not fit in a `Decimal`.
    pub fn total_return(&self, stake: Decimal) -> Option<Decimal> {
        stake
            .checked_mul(self.profit_per_unit())
            .and_then(|profit| profit.checked_add(stake))
            .map(|total| total.round_dp(2))
    }
}

impl fmt::Display for AmericanOdds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+}", self.0)
    }
}

impl FromStr for AmericanOdds {
    type Err = AyawError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if !(s.starts_with('+') || s.starts_with('-')) {
            return Err(AyawError::InvalidOdds(format!(
                "American odds need an explicit sign: {s}"
            )));
        }
        let value: i32 = s
            .parse()
            .map_err(|_| AyawError::InvalidOdds(format!("Not a number: {s}")))?;
        Self::new(value)
    }
}

impl Serialize for AmericanOdds {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AmericanOdds {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

/// Parse a bet date into a calendar date in the local time zone.
///
/// A bare `YYYY-MM-DD` is taken as-is (midnight local). A timestamp with an
/// offset is converted to the local calendar date; a naive timestamp keeps
/// its own date. Never shifts through UTC.
pub fn parse_bet_date(raw: &str) -> Option<NaiveDate> {
    parse_bet_date_in(raw, &Local)
}

/// [`parse_bet_date`] against an explicit time zone.
pub fn parse_bet_date_in<Tz: TimeZone>(raw: &str, tz: &Tz) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(tz).date_naive());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.date())
}

pub(crate) fn deserialize_bet_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_bet_date(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("Invalid bet date: {raw}")))
}

/// Optional date where an empty string (as sent by a cleared form field)
/// means "absent".
pub(crate) fn deserialize_opt_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse_bet_date(s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("Invalid date: {s}"))),
    }
}

// ---------------------------------------------------------------------------
// Bet record
// ---------------------------------------------------------------------------

/// One player/team proposition within a bet.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropLeg {
    #[serde(default)]
    pub player: String,
    #[serde(default)]
    pub prop: String,
    #[serde(default)]
    pub result: BetStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sport: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub league: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sportsbook: Option<String>,
    /// Free text; legs are not priced individually.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub odds: Option<String>,
}

/// One wagering event, as held by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetRecord {
    pub id: String,
    #[serde(deserialize_with = "deserialize_bet_date")]
    pub date: NaiveDate,
    pub kind: BetKind,
    pub stake: Decimal,
    #[serde(default)]
    pub potential_return: Option<Decimal>,
    #[serde(default)]
    pub actual_return: Option<Decimal>,
    #[serde(default)]
    pub odds: Option<AmericanOdds>,
    pub status: BetStatus,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub legs: Vec<PropLeg>,
}

impl fmt::Display for BetRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ${:.2}", self.date, self.kind, self.stake)?;
        if let Some(odds) = self.odds {
            write!(f, " @ {odds}")?;
        }
        write!(f, " {}", self.status.to_string().to_uppercase())?;
        if self.status.is_settled() {
            let profit = self.profit();
            let sign = if profit >= Decimal::ZERO { "+" } else { "" };
            write!(f, " ({sign}{profit:.2})")?;
        }
        if !self.legs.is_empty() {
            write!(f, " legs={}", self.legs.len())?;
        }
        Ok(())
    }
}

impl BetRecord {
    /// Net profit of this bet: `actualReturn - stake` when won (falling
    /// back to the potential return), `-stake` when lost, zero otherwise.
    pub fn profit(&self) -> Decimal {
        match self.status {
            BetStatus::Won => self
                .actual_return
                .or(self.potential_return)
                .map(|r| r - self.stake)
                .unwrap_or(Decimal::ZERO),
            BetStatus::Lost => -self.stake,
            BetStatus::Push | BetStatus::Pending => Decimal::ZERO,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.status.is_settled()
    }

    /// Records with a non-positive stake, or any amount above
    /// [`MAX_AMOUNT`], are excluded from aggregation.
    pub fn is_well_formed(&self) -> bool {
        self.stake > Decimal::ZERO
            && self.stake <= MAX_AMOUNT
            && [self.potential_return, self.actual_return]
                .iter()
                .flatten()
                .all(|v| *v <= MAX_AMOUNT)
    }

    /// Check the record invariants.
    pub fn validate(&self) -> Result<(), AyawError> {
        if self.stake <= Decimal::ZERO {
            return Err(AyawError::Validation(format!(
                "Stake must be positive, got {}",
                self.stake
            )));
        }
        if self.stake > MAX_AMOUNT {
            return Err(AyawError::Validation(format!(
                "Stake must not exceed {MAX_AMOUNT}, got {}",
                self.stake
            )));
        }
        if self.kind == BetKind::Straight && self.legs.len() > 1 {
            return Err(AyawError::Validation(format!(
                "A straight bet has at most one leg, got {}",
                self.legs.len()
            )));
        }
        for (name, value) in [
            ("potentialReturn", self.potential_return),
            ("actualReturn", self.actual_return),
        ] {
            match value {
                Some(v) if v < Decimal::ZERO => {
                    return Err(AyawError::Validation(format!("{name} cannot be negative")));
                }
                Some(v) if v > MAX_AMOUNT => {
                    return Err(AyawError::Validation(format!(
                        "{name} must not exceed {MAX_AMOUNT}"
                    )));
                }
                _ => {}
            }
        }
        if self.status == BetStatus::Pending && self.actual_return.is_some() {
            return Err(AyawError::Validation(
                "A pending bet cannot carry an actual return".to_string(),
            ));
        }
        Ok(())
    }

    /// The return recorded when settling without an explicit amount.
    fn default_return(&self, status: BetStatus) -> Option<Decimal> {
        match status {
            BetStatus::Won => self.potential_return,
            BetStatus::Lost => Some(Decimal::ZERO),
            BetStatus::Push => Some(self.stake),
            BetStatus::Pending => None,
        }
    }

    /// Move a pending bet to a terminal status.
    pub fn settle(&mut self, settlement: &Settlement) -> Result<(), AyawError> {
        if self.is_settled() || !settlement.status.is_settled() {
            return Err(AyawError::InvalidTransition {
                from: self.status,
                to: settlement.status,
            });
        }
        let mut next = self.clone();
        next.status = settlement.status;
        next.actual_return = settlement
            .actual_return
            .or_else(|| self.default_return(settlement.status));
        next.validate()?;
        *self = next;
        Ok(())
    }

    /// Apply an edit. The record is left untouched if the result is invalid.
    pub fn apply_patch(&mut self, patch: BetPatch) -> Result<(), AyawError> {
        let mut next = self.clone();

        if let Some(status) = patch.status {
            if self.is_settled() && status == BetStatus::Pending {
                return Err(AyawError::InvalidTransition {
                    from: self.status,
                    to: status,
                });
            }
            next.status = status;
        }
        if let Some(date) = patch.date {
            next.date = date;
        }
        if let Some(kind) = patch.kind {
            next.kind = kind;
        }
        if let Some(stake) = patch.stake {
            next.stake = stake;
        }
        if let Some(odds) = patch.odds {
            next.odds = Some(odds);
        }
        if patch.potential_return.is_some() {
            next.potential_return = patch.potential_return;
        } else if patch.odds.is_some() || patch.stake.is_some() {
            if let Some(odds) = next.odds {
                next.potential_return = odds.total_return(next.stake);
            }
        }
        if patch.actual_return.is_some() {
            next.actual_return = patch.actual_return;
        } else if next.status.is_settled() && next.status != self.status {
            // Settling, or correcting one outcome to another.
            next.actual_return = next.default_return(next.status);
        }
        if let Some(source) = patch.source {
            next.source = Some(source);
        }
        if let Some(notes) = patch.notes {
            next.notes = Some(notes);
        }
        if let Some(legs) = patch.legs {
            next.legs = legs;
        }

        next.validate()?;
        *self = next;
        Ok(())
    }

    /// Sample record for tests.
    #[cfg(test)]
    pub fn sample(id: &str, date: &str, stake: Decimal, status: BetStatus) -> Self {
        BetRecord {
            id: id.to_string(),
            date: parse_bet_date(date).unwrap(),
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
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// A bet as submitted by the user or read from an import, before the store
/// assigns an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetDraft {
    #[serde(deserialize_with = "deserialize_bet_date")]
    pub date: NaiveDate,
    #[serde(default)]
    pub kind: Option<BetKind>,
    pub stake: Decimal,
    #[serde(default)]
    pub potential_return: Option<Decimal>,
    #[serde(default)]
    pub actual_return: Option<Decimal>,
    #[serde(default)]
    pub odds: Option<AmericanOdds>,
    #[serde(default)]
    pub status: BetStatus,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub legs: Vec<PropLeg>,
}

impl BetDraft {
    /// Minimal pending straight bet.
    pub fn new(date: NaiveDate, stake: Decimal) -> Self {
        Self {
            date,
            kind: None,
            stake,
            potential_return: None,
            actual_return: None,
            odds: None,
            status: BetStatus::Pending,
            source: None,
            notes: None,
            legs: Vec::new(),
        }
    }

    /// Normalize into a canonical record.
    ///
    /// An explicit `kind` wins over the leg-count heuristic. A missing
    /// potential return is derived from the odds when they are known.
    pub fn into_record(self, id: String) -> Result<BetRecord, AyawError> {
        let kind = self
            .kind
            .unwrap_or_else(|| BetKind::from_leg_count(self.legs.len()));
        let potential_return = self
            .potential_return
            .or_else(|| self.odds.and_then(|o| o.total_return(self.stake)));

        let record = BetRecord {
            id,
            date: self.date,
            kind,
            stake: self.stake,
            potential_return,
            actual_return: self.actual_return,
            odds: self.odds,
            status: self.status,
            source: self.source.filter(|s| !s.trim().is_empty()),
            notes: self.notes.filter(|s| !s.trim().is_empty()),
            legs: self.legs,
        };
        record.validate()?;
        Ok(record)
    }
}

/// Partial edit of a stored bet. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetPatch {
    #[serde(default, deserialize_with = "deserialize_opt_date")]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub kind: Option<BetKind>,
    #[serde(default)]
    pub stake: Option<Decimal>,
    #[serde(default)]
    pub potential_return: Option<Decimal>,
    #[serde(default)]
    pub actual_return: Option<Decimal>,
    #[serde(default)]
    pub odds: Option<AmericanOdds>,
    #[serde(default)]
    pub status: Option<BetStatus>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub legs: Option<Vec<PropLeg>>,
}

/// Settlement action on a pending bet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    pub status: BetStatus,
    #[serde(default)]
    pub actual_return: Option<Decimal>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for AYAW.
#[derive(Debug, thiserror::Error)]
pub enum AyawError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid odds: {0}")]
    InvalidOdds(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: BetStatus, to: BetStatus },

    #[error("Bet not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
