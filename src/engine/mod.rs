//! Core engine: filtering and statistics over bet records.
//!
//! Both halves are pure functions over an in-memory snapshot; callers fetch
//! records from a [`crate::storage::BetStore`] first.

pub mod filter;
pub mod stats;

pub use filter::{filter, FilterSpec, ViewMode};
pub use stats::{aggregate, breakdown_by_source, profit_timeline, AggregationMode, Stats};
