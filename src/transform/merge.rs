//! Joining single-metric tables into unified tables.
//!
//! The three concerns of the aggregation stage:
//!
//! - [`merge`]: inner join of metric tables on (region key, date)
//! - [`synthesize_recovered`]: recovered counts for scopes without a
//!   native recovered feed, as a fixed fraction of confirmed
//! - [`concat`]: stacking schema-identical tables into one

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::error::{MergeError, MergeResult};
use crate::models::{Metric, MetricTable, RegionKey, TimeSeriesRow, UnifiedTable};

/// Join metric tables on (region key, date) into a unified table.
///
/// Inner-join semantics: a row survives only if present in every input.
/// The Confirmed table drives output order; Confirmed and Deaths are
/// required, Recovered is optional and its absence leaves
/// `recovered = None` on every row.
pub fn merge(tables: Vec<MetricTable>) -> MergeResult<UnifiedTable> {
    if tables.is_empty() {
        return Err(MergeError::NoInputs);
    }

    let mut confirmed = None;
    let mut deaths = None;
    let mut recovered = None;

    for table in tables {
        let slot = match table.metric {
            Metric::Confirmed => &mut confirmed,
            Metric::Deaths => &mut deaths,
            Metric::Recovered => &mut recovered,
        };
        if slot.is_some() {
            return Err(MergeError::DuplicateMetric(table.metric));
        }
        *slot = Some(table);
    }

    let confirmed = confirmed.ok_or(MergeError::MissingMetric(Metric::Confirmed))?;
    let deaths = deaths.ok_or(MergeError::MissingMetric(Metric::Deaths))?;

    let deaths_index = index_values(&deaths);
    let recovered_index = recovered.as_ref().map(index_values);

    let mut rows = Vec::with_capacity(confirmed.rows.len());
    for row in confirmed.rows {
        let lookup = (row.key.clone(), row.date);

        let Some(&deaths_value) = deaths_index.get(&lookup) else {
            continue;
        };
        let recovered_value = match &recovered_index {
            Some(index) => match index.get(&lookup) {
                Some(&v) => Some(v),
                None => continue,
            },
            None => None,
        };

        rows.push(TimeSeriesRow {
            key: row.key,
            date: row.date,
            confirmed: row.value,
            deaths: deaths_value,
            recovered: recovered_value,
        });
    }

    Ok(UnifiedTable::new(rows))
}

fn index_values(table: &MetricTable) -> HashMap<(RegionKey, NaiveDate), i64> {
    table
        .rows
        .iter()
        .map(|r| ((r.key.clone(), r.date), r.value))
        .collect()
}

/// Fill `recovered` on every row as `round(ratio x confirmed)`.
///
/// This is an explicit approximation, not measured data: scopes without a
/// native recovered feed (the US state rollup) get a policy-configured
/// fraction of the confirmed count.
pub fn synthesize_recovered(table: &mut UnifiedTable, ratio: f64) {
    for row in &mut table.rows {
        row.recovered = Some((ratio * row.confirmed as f64).round() as i64);
    }
}

/// Stack two schema-identical tables into one.
///
/// Key spaces are assumed disjoint (country names vs US state names do
/// not collide); no deduplication is performed.
pub fn concat(mut left: UnifiedTable, right: UnifiedTable) -> UnifiedTable {
    left.rows.extend(right.rows);
    left
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MetricRow, REGION_ALL};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 3, d).unwrap()
    }

    fn table(metric: Metric, rows: &[(&str, u32, i64)]) -> MetricTable {
        MetricTable {
            metric,
            rows: rows
                .iter()
                .map(|&(country, day, value)| MetricRow {
                    key: RegionKey::new(country, REGION_ALL),
                    date: date(day),
                    value,
                })
                .collect(),
        }
    }

    #[test]
    fn test_merge_three_metrics() {
        let merged = merge(vec![
            table(Metric::Confirmed, &[("Italy", 1, 10), ("Italy", 2, 15)]),
            table(Metric::Deaths, &[("Italy", 1, 1), ("Italy", 2, 2)]),
            table(Metric::Recovered, &[("Italy", 1, 0), ("Italy", 2, 3)]),
        ])
        .unwrap();

        assert_eq!(merged.len(), 2);
        assert_eq!(merged.rows[0].confirmed, 10);
        assert_eq!(merged.rows[0].deaths, 1);
        assert_eq!(merged.rows[0].recovered, Some(0));
        assert_eq!(merged.rows[1].recovered, Some(3));
    }

    #[test]
    fn test_merge_inner_join_drops_unmatched() {
        let merged = merge(vec![
            table(Metric::Confirmed, &[("Italy", 1, 10), ("Italy", 2, 15)]),
            table(Metric::Deaths, &[("Italy", 1, 1)]),
        ])
        .unwrap();

        // 3/2 has no deaths row, so it is dropped
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.rows[0].date, date(1));
    }

    #[test]
    fn test_merge_recovered_missing_key_drops_row() {
        let merged = merge(vec![
            table(Metric::Confirmed, &[("Italy", 1, 10), ("France", 1, 4)]),
            table(Metric::Deaths, &[("Italy", 1, 1), ("France", 1, 0)]),
            table(Metric::Recovered, &[("Italy", 1, 2)]),
        ])
        .unwrap();

        assert_eq!(merged.len(), 1);
        assert_eq!(merged.rows[0].key.country, "Italy");
    }

    #[test]
    fn test_merge_without_recovered_table() {
        let merged = merge(vec![
            table(Metric::Confirmed, &[("US", 1, 100)]),
            table(Metric::Deaths, &[("US", 1, 5)]),
        ])
        .unwrap();

        assert_eq!(merged.rows[0].recovered, None);
    }

    #[test]
    fn test_merge_order_driven_by_confirmed() {
        let merged = merge(vec![
            table(Metric::Confirmed, &[("Italy", 2, 15), ("Italy", 1, 10)]),
            table(Metric::Deaths, &[("Italy", 1, 1), ("Italy", 2, 2)]),
        ])
        .unwrap();

        assert_eq!(merged.rows[0].date, date(2));
        assert_eq!(merged.rows[1].date, date(1));
    }

    #[test]
    fn test_merge_errors() {
        assert!(matches!(merge(vec![]), Err(MergeError::NoInputs)));

        assert!(matches!(
            merge(vec![
                table(Metric::Confirmed, &[]),
                table(Metric::Confirmed, &[]),
            ]),
            Err(MergeError::DuplicateMetric(Metric::Confirmed))
        ));

        assert!(matches!(
            merge(vec![table(Metric::Deaths, &[])]),
            Err(MergeError::MissingMetric(Metric::Confirmed))
        ));

        assert!(matches!(
            merge(vec![table(Metric::Confirmed, &[])]),
            Err(MergeError::MissingMetric(Metric::Deaths))
        ));
    }

    #[test]
    fn test_synthesize_recovered_rounds() {
        let mut merged = merge(vec![
            table(Metric::Confirmed, &[("US", 1, 100), ("US", 2, 50)]),
            table(Metric::Deaths, &[("US", 1, 5), ("US", 2, 2)]),
        ])
        .unwrap();

        synthesize_recovered(&mut merged, 0.11);

        assert_eq!(merged.rows[0].recovered, Some(11));
        // 0.11 * 50 = 5.5, rounds away from zero
        assert_eq!(merged.rows[1].recovered, Some(6));
    }

    #[test]
    fn test_concat_unions_key_spaces() {
        let world = merge(vec![
            table(Metric::Confirmed, &[("Italy", 1, 10)]),
            table(Metric::Deaths, &[("Italy", 1, 1)]),
        ])
        .unwrap();
        let us = merge(vec![
            table(Metric::Confirmed, &[("US", 1, 100)]),
            table(Metric::Deaths, &[("US", 1, 5)]),
        ])
        .unwrap();

        let combined = concat(world, us);
        assert_eq!(combined.len(), 2);
        assert_eq!(combined.countries(), vec!["Italy", "US"]);
    }
}
