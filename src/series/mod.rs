//! Per-request computation: selection filtering, daily derivation, and
//! chart-ready series assembly.
//!
//! Every user interaction is the same explicit composition over the
//! immutable dataset:
//!
//! ```text
//! select_*(table, keys)  ->  derive_daily(rows)  ->  ChartData::build(...)
//! ```
//!
//! All three are pure functions of their inputs; nothing here mutates or
//! caches. An empty selection flows through the whole chain and comes out
//! as an empty chart, never an error.

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{DerivedRow, Metric, TimeSeriesRow, UnifiedTable};

/// Axis label format: short human-readable dates ("Mar 01, 2020").
pub const DATE_LABEL_FORMAT: &str = "%b %d, %Y";

// =============================================================================
// Selection Filter
// =============================================================================

/// Slice the combined table to one (country, subdivision) pair, sorted by
/// ascending date.
///
/// A stale selection (subdivision left over from a previous country) simply
/// matches nothing and yields an empty slice.
pub fn select_world(table: &UnifiedTable, country: &str, state: &str) -> Vec<TimeSeriesRow> {
    sorted_by_date(
        table
            .rows
            .iter()
            .filter(|r| r.key.country == country && r.key.state == state)
            .cloned()
            .collect(),
    )
}

/// Slice the county table to one (state, county) pair, sorted by ascending
/// date.
pub fn select_county(table: &UnifiedTable, state: &str, county: &str) -> Vec<TimeSeriesRow> {
    sorted_by_date(
        table
            .rows
            .iter()
            .filter(|r| r.key.state == state && r.key.county.as_deref() == Some(county))
            .cloned()
            .collect(),
    )
}

fn sorted_by_date(mut rows: Vec<TimeSeriesRow>) -> Vec<TimeSeriesRow> {
    rows.sort_by_key(|r| r.date);
    rows
}

// =============================================================================
// Derived Metrics
// =============================================================================

/// Compute day-over-day deltas over one date-sorted region slice.
///
/// For each cumulative column C: `new[i] = max(0, C[i] - C[i-1])` for
/// `i > 0`, and 0 for the first observation. Negative deltas are upstream
/// corrections to the cumulative series; a negative "new cases" count is
/// nonsense, so they clamp to zero. Rows with `recovered = None` are
/// treated as a recovered column of all zeros.
///
/// Output length always equals input length.
pub fn derive_daily(rows: &[TimeSeriesRow]) -> Vec<DerivedRow> {
    let mut out = Vec::with_capacity(rows.len());
    let mut prev: Option<(i64, i64, i64)> = None;

    for row in rows {
        let recovered = row.recovered.unwrap_or(0);
        let (new_confirmed, new_deaths, new_recovered) = match prev {
            None => (0, 0, 0),
            Some((pc, pd, pr)) => (
                (row.confirmed - pc).max(0),
                (row.deaths - pd).max(0),
                (recovered - pr).max(0),
            ),
        };

        out.push(DerivedRow {
            date: row.date,
            cum_confirmed: row.confirmed,
            cum_deaths: row.deaths,
            cum_recovered: recovered,
            new_confirmed,
            new_deaths,
            new_recovered,
        });
        prev = Some((row.confirmed, row.deaths, recovered));
    }

    out
}

// =============================================================================
// Chart-Ready Series
// =============================================================================

/// One metric's values across the selected date range.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSeries {
    pub metric: Metric,
    /// Running totals, one per date.
    pub cumulative: Vec<i64>,
    /// Day-over-day increases, one per date. Never negative.
    pub new: Vec<i64>,
}

/// Everything a grouped bar chart needs: the date axis, display labels,
/// and one series per selected metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    pub dates: Vec<NaiveDate>,
    /// Axis labels in [`DATE_LABEL_FORMAT`].
    pub labels: Vec<String>,
    pub series: Vec<MetricSeries>,
}

impl ChartData {
    /// Assemble chart data from derived rows for the selected metrics.
    ///
    /// Metrics absent from the underlying data (Recovered on the county
    /// scope) come out as all-zero series rather than being dropped.
    pub fn build(rows: &[DerivedRow], metrics: &[Metric]) -> Self {
        let dates: Vec<NaiveDate> = rows.iter().map(|r| r.date).collect();
        let labels = dates
            .iter()
            .map(|d| d.format(DATE_LABEL_FORMAT).to_string())
            .collect();

        let series = metrics
            .iter()
            .map(|&metric| MetricSeries {
                metric,
                cumulative: rows.iter().map(|r| r.cumulative(metric)).collect(),
                new: rows.iter().map(|r| r.delta(metric)).collect(),
            })
            .collect();

        Self {
            dates,
            labels,
            series,
        }
    }

    /// True when the selection matched no rows.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RegionKey, REGION_ALL};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 3, d).unwrap()
    }

    fn world_rows(country: &str, state: &str, confirmed: &[i64]) -> Vec<TimeSeriesRow> {
        confirmed
            .iter()
            .enumerate()
            .map(|(i, &c)| TimeSeriesRow {
                key: RegionKey::new(country, state),
                date: date(i as u32 + 1),
                confirmed: c,
                deaths: c / 10,
                recovered: None,
            })
            .collect()
    }

    #[test]
    fn test_select_world_exact_match_sorted() {
        let mut rows = world_rows("Italy", REGION_ALL, &[10, 15, 20]);
        rows.reverse(); // insertion order deliberately backwards
        rows.extend(world_rows("France", REGION_ALL, &[1, 2, 3]));
        let table = UnifiedTable::new(rows);

        let selected = select_world(&table, "Italy", REGION_ALL);
        assert_eq!(selected.len(), 3);
        assert_eq!(selected[0].date, date(1));
        assert_eq!(selected[0].confirmed, 10);
        assert_eq!(selected[2].confirmed, 20);
    }

    #[test]
    fn test_select_world_stale_selection_is_empty() {
        let table = UnifiedTable::new(world_rows("Italy", REGION_ALL, &[10]));
        assert!(select_world(&table, "Italy", "Lombardy").is_empty());
        assert!(select_world(&table, "Atlantis", REGION_ALL).is_empty());
    }

    #[test]
    fn test_select_county() {
        let mut rows = Vec::new();
        for (county, base) in [("Cook", 100), ("Adams", 5)] {
            for day in 1..=2 {
                rows.push(TimeSeriesRow {
                    key: RegionKey::with_county("US", "Illinois", county),
                    date: date(day),
                    confirmed: base + day as i64,
                    deaths: 0,
                    recovered: None,
                });
            }
        }
        let table = UnifiedTable::new(rows);

        let cook = select_county(&table, "Illinois", "Cook");
        assert_eq!(cook.len(), 2);
        assert_eq!(cook[0].confirmed, 101);
        assert!(select_county(&table, "Illinois", "Will").is_empty());
    }

    #[test]
    fn test_derive_daily_clamps_corrections() {
        // cumulative [10, 15, 12, 20] must derive [0, 5, 0, 8]
        let rows = world_rows("Italy", REGION_ALL, &[10, 15, 12, 20]);
        let derived = derive_daily(&rows);

        let news: Vec<i64> = derived.iter().map(|r| r.new_confirmed).collect();
        assert_eq!(news, vec![0, 5, 0, 8]);
    }

    #[test]
    fn test_derive_daily_length_and_first_row() {
        let rows = world_rows("Italy", REGION_ALL, &[10, 15, 20]);
        let derived = derive_daily(&rows);

        assert_eq!(derived.len(), rows.len());
        assert_eq!(derived[0].new_confirmed, 0);
        assert_eq!(derived[0].new_deaths, 0);
        assert_eq!(derived[0].new_recovered, 0);
    }

    #[test]
    fn test_derive_daily_never_negative() {
        let rows = world_rows("Italy", REGION_ALL, &[100, 40, 90, 10]);
        for r in derive_daily(&rows) {
            assert!(r.new_confirmed >= 0);
            assert!(r.new_deaths >= 0);
            assert!(r.new_recovered >= 0);
        }
    }

    #[test]
    fn test_derive_daily_empty_input() {
        assert!(derive_daily(&[]).is_empty());
    }

    #[test]
    fn test_derive_daily_absent_recovered_is_zeros() {
        let rows = world_rows("Italy", REGION_ALL, &[10, 20]);
        let derived = derive_daily(&rows);

        assert!(derived.iter().all(|r| r.cum_recovered == 0));
        assert!(derived.iter().all(|r| r.new_recovered == 0));
    }

    #[test]
    fn test_derive_daily_monotonic_roundtrip() {
        // with no clamping, prefix sums of new values reconstruct cumulatives
        let rows = world_rows("Italy", REGION_ALL, &[3, 7, 7, 12, 30]);
        let derived = derive_daily(&rows);

        let mut reconstructed = derived[0].cum_confirmed;
        for (i, r) in derived.iter().enumerate().skip(1) {
            reconstructed += r.new_confirmed;
            assert_eq!(reconstructed, rows[i].confirmed);
        }
    }

    #[test]
    fn test_chart_data_build() {
        let rows = world_rows("Italy", REGION_ALL, &[10, 15]);
        let chart = ChartData::build(&derive_daily(&rows), &[Metric::Confirmed, Metric::Deaths]);

        assert_eq!(chart.dates.len(), 2);
        assert_eq!(chart.labels[0], "Mar 01, 2020");
        assert_eq!(chart.series.len(), 2);
        assert_eq!(chart.series[0].metric, Metric::Confirmed);
        assert_eq!(chart.series[0].cumulative, vec![10, 15]);
        assert_eq!(chart.series[0].new, vec![0, 5]);
    }

    #[test]
    fn test_chart_data_recovered_without_data_is_zero_series() {
        let rows = world_rows("Italy", REGION_ALL, &[10, 15]);
        let chart = ChartData::build(&derive_daily(&rows), &[Metric::Recovered]);

        assert_eq!(chart.series[0].cumulative, vec![0, 0]);
        assert_eq!(chart.series[0].new, vec![0, 0]);
    }

    #[test]
    fn test_chart_data_empty_selection() {
        let chart = ChartData::build(&[], &[Metric::Confirmed]);
        assert!(chart.is_empty());
        assert!(chart.series[0].cumulative.is_empty());
    }

    #[test]
    fn test_synthesized_recovered_flows_through_chart() {
        // US scope: recovered synthesized as 0.11 x confirmed
        let mut rows = world_rows("US", REGION_ALL, &[100, 200]);
        for r in &mut rows {
            r.recovered = Some((0.11 * r.confirmed as f64).round() as i64);
        }
        let chart = ChartData::build(&derive_daily(&rows), &[Metric::Recovered]);

        assert_eq!(chart.series[0].cumulative, vec![11, 22]);
        assert_eq!(chart.series[0].new, vec![0, 11]);
    }

    #[test]
    fn test_combined_table_us_selection_spans_full_range() {
        // world rows for the country-level US series, plus a concatenated
        // state rollup: selecting (US, "<all>") must hit the world series
        let mut rows = world_rows("US", REGION_ALL, &[1, 2, 3, 4]);
        rows.extend(world_rows("US", "Illinois", &[1, 1]));
        let table = UnifiedTable::new(rows);

        let selected = select_world(&table, "US", REGION_ALL);
        assert_eq!(selected.len(), 4);
        assert_eq!(selected.first().unwrap().date, date(1));
        assert_eq!(selected.last().unwrap().date, date(4));
    }
}
