//! Wide-to-long reshape: the loader half of the pipeline.
//!
//! Upstream frames carry one row per region and one column per date. Melting
//! turns each date column into its own row, keyed by normalized region
//! identifiers, and tags the result with the feed's metric.
//!
//! # Header classification
//!
//! Columns are recognized by name: `Province/State`/`Province_State` as the
//! subdivision, `Country/Region`/`Country_Region` as the country, `Admin2`
//! as the county, and anything matching `m/d/yy` as a date. Everything else
//! (`Lat`, `Long`, `Long_`, `UID`, `iso2`, `iso3`, `code3`, `FIPS`,
//! `Combined_Key`, `Population`) is dropped.
//!
//! # Cleaning policy
//!
//! Source data is filled, never failed on: a blank subdivision becomes the
//! `"<all>"` sentinel, and a blank or unparseable count becomes 0 (integer
//! parse first, then float parse truncating toward zero). This is the only
//! place the policy is applied.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use crate::error::{ReshapeError, ReshapeResult};
use crate::models::{Metric, MetricRow, MetricTable, RegionKey, REGION_ALL};
use crate::parser::WideFrame;

/// Headers naming the subdivision column, global and US spellings.
const STATE_HEADERS: [&str; 2] = ["Province/State", "Province_State"];

/// Headers naming the country column, global and US spellings.
const COUNTRY_HEADERS: [&str; 2] = ["Country/Region", "Country_Region"];

/// Header naming the county column in US feeds.
const COUNTY_HEADER: &str = "Admin2";

static DATE_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,2}/\d{1,2}/\d{2,4}$").expect("valid date-header pattern"));

// =============================================================================
// Options
// =============================================================================

/// Output granularity of a melt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    /// Key on (country, subdivision). Rows sharing a key (US counties in a
    /// state, or duplicate source rows) are summed into one series.
    State,
    /// Key on (country, subdivision, county). Rows without a county value
    /// are dropped, matching how the source treats unattributed counts.
    County,
}

/// Loader options: granularity plus an optional early-date cutoff.
#[derive(Debug, Clone, Copy)]
pub struct MeltOptions {
    pub granularity: Granularity,
    /// Drop observations dated before this (sparse early county data).
    pub cutoff: Option<NaiveDate>,
}

impl Default for MeltOptions {
    fn default() -> Self {
        Self {
            granularity: Granularity::State,
            cutoff: None,
        }
    }
}

impl MeltOptions {
    /// State-level rollup, no cutoff: global feeds and the US state table.
    pub fn state() -> Self {
        Self::default()
    }

    /// County granularity with an early-date cutoff: the US county table.
    pub fn county(cutoff: NaiveDate) -> Self {
        Self {
            granularity: Granularity::County,
            cutoff: Some(cutoff),
        }
    }
}

// =============================================================================
// Header Classification
// =============================================================================

struct ColumnMap {
    country: usize,
    state: Option<usize>,
    county: Option<usize>,
    /// (column index, parsed date) for every date column, date-ascending.
    dates: Vec<(usize, NaiveDate)>,
}

fn parse_date_header(header: &str) -> Option<NaiveDate> {
    if !DATE_HEADER.is_match(header) {
        return None;
    }
    NaiveDate::parse_from_str(header, "%m/%d/%y")
        .or_else(|_| NaiveDate::parse_from_str(header, "%m/%d/%Y"))
        .ok()
}

fn classify_headers(frame: &WideFrame, granularity: Granularity) -> ReshapeResult<ColumnMap> {
    let find = |names: &[&str]| {
        frame
            .headers
            .iter()
            .position(|h| names.iter().any(|n| n == h))
    };

    let country = find(&COUNTRY_HEADERS).ok_or(ReshapeError::MissingCountryColumn)?;
    let state = find(&STATE_HEADERS);
    let county = frame.column_index(COUNTY_HEADER);

    if granularity == Granularity::County && county.is_none() {
        return Err(ReshapeError::MissingCountyColumn);
    }

    let mut dates: Vec<(usize, NaiveDate)> = frame
        .headers
        .iter()
        .enumerate()
        .filter_map(|(i, h)| parse_date_header(h).map(|d| (i, d)))
        .collect();

    if dates.is_empty() {
        return Err(ReshapeError::NoDateColumns);
    }
    dates.sort_by_key(|(_, d)| *d);

    Ok(ColumnMap {
        country,
        state,
        county,
        dates,
    })
}

// =============================================================================
// Melt
// =============================================================================

/// Reshape a wide frame into a long single-metric table.
///
/// Guarantees on the output: no duplicate `(key, date)` pair, row count =
/// distinct keys x distinct surviving dates, region-major order with dates
/// ascending within each region.
pub fn melt(frame: &WideFrame, metric: Metric, options: &MeltOptions) -> ReshapeResult<MetricTable> {
    let columns = classify_headers(frame, options.granularity)?;

    let dates: Vec<(usize, NaiveDate)> = columns
        .dates
        .iter()
        .copied()
        .filter(|(_, d)| options.cutoff.map_or(true, |cutoff| *d >= cutoff))
        .collect();

    // Accumulate sums per key, preserving first-seen key order.
    let mut order: Vec<RegionKey> = Vec::new();
    let mut index: HashMap<RegionKey, usize> = HashMap::new();
    let mut sums: Vec<Vec<i64>> = Vec::new();

    for row in &frame.rows {
        let Some(key) = region_key(row, &columns, options.granularity) else {
            continue;
        };

        let slot = match index.get(&key) {
            Some(&slot) => slot,
            None => {
                order.push(key.clone());
                sums.push(vec![0; dates.len()]);
                index.insert(key, sums.len() - 1);
                sums.len() - 1
            }
        };

        for (i, (col, _)) in dates.iter().enumerate() {
            sums[slot][i] += coerce_count(row.get(*col).map(String::as_str).unwrap_or(""));
        }
    }

    let mut rows = Vec::with_capacity(order.len() * dates.len());
    for (slot, key) in order.iter().enumerate() {
        for (i, (_, date)) in dates.iter().enumerate() {
            rows.push(MetricRow {
                key: key.clone(),
                date: *date,
                value: sums[slot][i],
            });
        }
    }

    Ok(MetricTable { metric, rows })
}

/// Parsed dates of every date column in a frame, ascending. Empty when the
/// frame carries no recognizable date columns. Used by the `inspect` debug
/// command.
pub fn date_headers(frame: &WideFrame) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = frame
        .headers
        .iter()
        .filter_map(|h| parse_date_header(h))
        .collect();
    dates.sort();
    dates
}

/// Build the region key for one source row, applying the sentinel fill.
/// Returns `None` for county-granularity rows without a county value.
fn region_key(row: &[String], columns: &ColumnMap, granularity: Granularity) -> Option<RegionKey> {
    let cell = |idx: usize| row.get(idx).map(|s| s.trim()).unwrap_or("");

    let country = cell(columns.country).to_string();
    let state_raw = columns.state.map(cell).unwrap_or("");
    let state = if state_raw.is_empty() {
        REGION_ALL.to_string()
    } else {
        state_raw.to_string()
    };

    match granularity {
        Granularity::State => Some(RegionKey::new(country, state)),
        Granularity::County => {
            let county = columns.county.map(cell).unwrap_or("");
            if county.is_empty() {
                return None;
            }
            Some(RegionKey::with_county(country, state, county))
        }
    }
}

/// Coerce one cell to a count. Blank and unparseable cells become 0;
/// float cells truncate toward zero.
fn coerce_count(raw: &str) -> i64 {
    let value = raw.trim();
    if value.is_empty() {
        return 0;
    }
    if let Ok(n) = value.parse::<i64>() {
        return n;
    }
    if let Ok(f) = value.parse::<f64>() {
        return f as i64;
    }
    0
}

// =============================================================================
// Tests
// =============================================================================
