//! Domain models for the covidash data pipeline.
//!
//! This module contains the core data structures used throughout the pipeline:
//!
//! - [`Metric`] - the tracked measures (Confirmed, Deaths, Recovered)
//! - [`RegionKey`] - the identifier tuple locating one time series
//! - [`MetricRow`] / [`MetricTable`] - single-metric long-format tables (loader output)
//! - [`TimeSeriesRow`] / [`UnifiedTable`] - merged multi-metric tables
//! - [`DerivedRow`] - a merged observation extended with day-over-day deltas
//! - [`Dataset`] - the process-wide immutable table set

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Sentinel subdivision value meaning "no finer subdivision selected/available".
pub const REGION_ALL: &str = "<all>";

// =============================================================================
// Metric
// =============================================================================

/// One of the tracked epidemiological measures.
///
/// Each metric owns a pair of column names: the cumulative running total
/// (`CumConfirmed`, ...) and the derived day-over-day increase
/// (`NewConfirmed`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    Confirmed,
    Deaths,
    Recovered,
}

impl Metric {
    /// Metrics available in the world/US-state scope.
    pub const WORLD: [Metric; 3] = [Metric::Confirmed, Metric::Deaths, Metric::Recovered];

    /// Metrics available in the US-county scope (no native recovered feed).
    pub const US_COUNTY: [Metric; 2] = [Metric::Confirmed, Metric::Deaths];

    /// Parse a metric from its user-facing label (case-insensitive).
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "confirmed" => Some(Self::Confirmed),
            "deaths" => Some(Self::Deaths),
            "recovered" => Some(Self::Recovered),
            _ => None,
        }
    }

    /// User-facing label, as shown in metric selectors.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Confirmed => "Confirmed",
            Self::Deaths => "Deaths",
            Self::Recovered => "Recovered",
        }
    }

    /// Column name of the cumulative running total.
    pub fn cum_column(&self) -> &'static str {
        match self {
            Self::Confirmed => "CumConfirmed",
            Self::Deaths => "CumDeaths",
            Self::Recovered => "CumRecovered",
        }
    }

    /// Column name of the derived day-over-day increase.
    pub fn new_column(&self) -> &'static str {
        match self {
            Self::Confirmed => "NewConfirmed",
            Self::Deaths => "NewDeaths",
            Self::Recovered => "NewRecovered",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Region Key
// =============================================================================

/// The identifier tuple that uniquely locates one time series.
///
/// `state` carries the [`REGION_ALL`] sentinel when no subdivision applies.
/// `county` is populated only in the US county-granularity table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegionKey {
    pub country: String,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub county: Option<String>,
}

impl RegionKey {
    /// Key for a country-level or state-level series.
    pub fn new(country: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            state: state.into(),
            county: None,
        }
    }

    /// Key for a county-level series.
    pub fn with_county(
        country: impl Into<String>,
        state: impl Into<String>,
        county: impl Into<String>,
    ) -> Self {
        Self {
            country: country.into(),
            state: state.into(),
            county: Some(county.into()),
        }
    }
}

// =============================================================================
// Single-Metric Tables (loader output)
// =============================================================================

/// One observation of a single metric.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRow {
    pub key: RegionKey,
    pub date: NaiveDate,
    pub value: i64,
}

/// A long-format table carrying one named metric.
///
/// Invariant: no duplicate `(key, date)` pair; rows are region-major with
/// dates ascending within each region.
#[derive(Debug, Clone)]
pub struct MetricTable {
    pub metric: Metric,
    pub rows: Vec<MetricRow>,
}

impl MetricTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// =============================================================================
// Merged Tables
// =============================================================================

/// One merged observation: all metrics for a region on a date.
///
/// `recovered` is `None` where neither native nor synthesized recovered
/// data exists (the US county scope); downstream derivation treats that
/// as a column of zeros.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesRow {
    #[serde(flatten)]
    pub key: RegionKey,
    pub date: NaiveDate,
    pub confirmed: i64,
    pub deaths: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovered: Option<i64>,
}

/// The full in-memory collection of merged observations for one scope.
///
/// Built once at startup, then read-only. Carries the same no-duplicate
/// `(key, date)` invariant as [`MetricTable`].
#[derive(Debug, Clone, Default)]
pub struct UnifiedTable {
    pub rows: Vec<TimeSeriesRow>,
}

impl UnifiedTable {
    pub fn new(rows: Vec<TimeSeriesRow>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sorted distinct country names, for the primary selector.
    pub fn countries(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self.rows.iter().map(|r| r.key.country.as_str()).collect();
        set.into_iter().map(String::from).collect()
    }

    /// Sorted distinct subdivisions of `country`, for the secondary selector.
    ///
    /// The [`REGION_ALL`] sentinel is always present so a country-level
    /// selection exists even for countries reported only per-subdivision.
    /// `"<all>"` sorts before any letter, so it is also the default option.
    pub fn states_of(&self, country: &str) -> Vec<String> {
        let mut set: BTreeSet<&str> = self
            .rows
            .iter()
            .filter(|r| r.key.country == country)
            .map(|r| r.key.state.as_str())
            .collect();
        set.insert(REGION_ALL);
        set.into_iter().map(String::from).collect()
    }

    /// Sorted distinct state names, for the US-county scope primary selector.
    pub fn states(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self.rows.iter().map(|r| r.key.state.as_str()).collect();
        set.into_iter().map(String::from).collect()
    }

    /// Sorted distinct counties of `state`, for the US-county scope
    /// secondary selector. First entry doubles as the default selection.
    pub fn counties_of(&self, state: &str) -> Vec<String> {
        let set: BTreeSet<&str> = self
            .rows
            .iter()
            .filter(|r| r.key.state == state)
            .filter_map(|r| r.key.county.as_deref())
            .collect();
        set.into_iter().map(String::from).collect()
    }
}

// =============================================================================
// Derived Rows
// =============================================================================

/// A merged observation extended with day-over-day deltas.
///
/// Derived rows are ephemeral: computed per selection from a single
/// date-sorted region slice, never cached, never crossing region
/// boundaries. Region keys are dropped here, mirroring how the chart
/// layer consumes one region at a time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedRow {
    pub date: NaiveDate,
    pub cum_confirmed: i64,
    pub cum_deaths: i64,
    pub cum_recovered: i64,
    pub new_confirmed: i64,
    pub new_deaths: i64,
    pub new_recovered: i64,
}

impl DerivedRow {
    /// Cumulative value of one metric.
    pub fn cumulative(&self, metric: Metric) -> i64 {
        match metric {
            Metric::Confirmed => self.cum_confirmed,
            Metric::Deaths => self.cum_deaths,
            Metric::Recovered => self.cum_recovered,
        }
    }

    /// Day-over-day value of one metric. Never negative.
    pub fn delta(&self, metric: Metric) -> i64 {
        match metric {
            Metric::Confirmed => self.new_confirmed,
            Metric::Deaths => self.new_deaths,
            Metric::Recovered => self.new_recovered,
        }
    }
}

// =============================================================================
// Dataset
// =============================================================================

/// The process-wide immutable table set.
///
/// `combined` holds the world table concatenated with the US state-level
/// rollup (US states appear under country `"US"`); `us_counties` holds
/// the county-granularity US table. Construct via
/// [`crate::transform::pipeline::load_dataset`], or directly from tables
/// in tests.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub combined: UnifiedTable,
    pub us_counties: UnifiedTable,
}

impl Dataset {
    /// Build a dataset from already-constructed tables.
    ///
    /// This is the injection seam: request handlers and tests receive a
    /// dataset as a read-only parameter, never through a mutable global.
    pub fn from_tables(combined: UnifiedTable, us_counties: UnifiedTable) -> Self {
        Self {
            combined,
            us_counties,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
