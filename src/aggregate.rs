//! Grouped status counts and per-group percentages.
//!
//! [`aggregate`] counts leads per (group, `StatusCheck`) and appends a
//! `Total` row per group. [`derive_percentages`] turns those counts into
//! `"<status> %"` rows relative to each group's total. [`rollup`] sums the
//! counts to a coarser grouping for subtotal and grand-total lines.

use crate::error::{ReportError, Result};
use crate::types::{AggregateRow, GroupKey, LeadRecord, RowValue, StatusLabel};
use crate::util::percent_of;
use std::collections::BTreeMap;

/// Count leads per distinct group and status, plus one `Total` row per group.
///
/// Records missing the status or any of the grouping values are not counted.
/// Rows come out sorted by group and then status, with each group's `Total`
/// after its status rows. A status spelled like a synthetic label (`Total`,
/// or ending in `" %"`) is rejected so every (group, label) pair stays unique.
pub fn aggregate(records: &[LeadRecord], keys: &[GroupKey]) -> Result<Vec<AggregateRow>> {
    let mut groups: BTreeMap<Vec<String>, BTreeMap<String, u64>> = BTreeMap::new();

    for r in records {
        let Some(status) = r.status_check.as_deref() else {
            continue;
        };
        let Some(group) = keys
            .iter()
            .map(|k| k.value(r).map(str::to_string))
            .collect::<Option<Vec<String>>>()
        else {
            continue;
        };
        if StatusLabel::is_reserved(status) {
            return Err(ReportError::ReservedStatus { status: status.to_string() });
        }
        *groups
            .entry(group)
            .or_default()
            .entry(status.to_string())
            .or_insert(0) += 1;
    }

    let mut rows = Vec::new();
    for (group, statuses) in groups {
        let total: u64 = statuses.values().sum();
        for (status, count) in statuses {
            rows.push(AggregateRow {
                group: group.clone(),
                status: StatusLabel::Status(status),
                value: RowValue::Count(count),
            });
        }
        rows.push(AggregateRow { group, status: StatusLabel::Total, value: RowValue::Count(total) });
    }
    Ok(rows)
}

/// Percentage rows for every status row of every group, relative to that
/// group's `Total` row. Only the new rows are returned.
///
/// `Total` and already-derived percentage rows are skipped by label, so
/// feeding the output of [`with_percentages`] back in yields the same rows.
pub fn derive_percentages(rows: &[AggregateRow], keys: &[GroupKey]) -> Result<Vec<AggregateRow>> {
    let mut totals: BTreeMap<&[String], f64> = BTreeMap::new();
    for row in rows {
        if row.group.len() != keys.len() {
            return Err(ReportError::GroupArity { expected: keys.len(), found: row.group.len() });
        }
        if row.status.is_total() {
            totals.insert(row.group.as_slice(), row.value.as_f64());
        }
    }

    let mut out = Vec::new();
    for row in rows {
        let StatusLabel::Status(status) = &row.status else {
            continue;
        };
        let total = *totals
            .get(row.group.as_slice())
            .ok_or_else(|| ReportError::MissingTotal { group: row.group.clone() })?;
        let pct = percent_of(row.value.as_f64(), total)
            .ok_or_else(|| ReportError::DivisionByZero { group: row.group.clone() })?;
        out.push(AggregateRow {
            group: row.group.clone(),
            status: StatusLabel::Percent(status.clone()),
            value: RowValue::Percent(pct),
        });
    }
    Ok(out)
}

/// Input rows followed by their derived percentage rows.
pub fn with_percentages(rows: Vec<AggregateRow>, keys: &[GroupKey]) -> Result<Vec<AggregateRow>> {
    let percentages = derive_percentages(&rows, keys)?;
    let mut combined = rows;
    combined.extend(percentages);
    Ok(combined)
}

/// Sum the count rows (statuses and `Total`) over the first `depth` keys and
/// derive fresh percentages from the summed counts. `depth == 0` gives the
/// grand total, with an empty group.
pub fn rollup(rows: &[AggregateRow], keys: &[GroupKey], depth: usize) -> Result<Vec<AggregateRow>> {
    if depth > keys.len() {
        return Err(ReportError::GroupArity { expected: keys.len(), found: depth });
    }
    let mut groups: BTreeMap<Vec<String>, BTreeMap<StatusLabel, u64>> = BTreeMap::new();
    for row in rows {
        if row.group.len() != keys.len() {
            return Err(ReportError::GroupArity { expected: keys.len(), found: row.group.len() });
        }
        let RowValue::Count(count) = row.value else {
            continue;
        };
        if matches!(row.status, StatusLabel::Percent(_)) {
            continue;
        }
        *groups
            .entry(row.group[..depth].to_vec())
            .or_default()
            .entry(row.status.clone())
            .or_insert(0) += count;
    }

    let rolled: Vec<AggregateRow> = groups
        .into_iter()
        .flat_map(|(group, statuses)| {
            statuses.into_iter().map(move |(status, count)| AggregateRow {
                group: group.clone(),
                status,
                value: RowValue::Count(count),
            })
        })
        .collect();
    with_percentages(rolled, &keys[..depth])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    fn lead(source: Option<&str>, brand: &str, status: Option<&str>) -> LeadRecord {
        LeadRecord {
            created_at: NaiveDate::from_ymd_opt(2024, 2, 1)
                .and_then(|d| d.and_hms_opt(10, 0, 0))
                .unwrap(),
            dealer: Some("North".to_string()),
            interest_make: Some(brand.to_string()),
            lead_source: source.map(str::to_string),
            status_check: status.map(str::to_string),
            lead_status: None,
            cancellation_reason: "Unknown".to_string(),
        }
    }

    fn row(group: &[&str], status: StatusLabel, value: RowValue) -> AggregateRow {
        AggregateRow { group: group.iter().map(|s| s.to_string()).collect(), status, value }
    }

    fn status(s: &str) -> StatusLabel {
        StatusLabel::Status(s.to_string())
    }

    fn web_scenario() -> Vec<LeadRecord> {
        vec![
            lead(Some("Web"), "Jeep", Some("Active")),
            lead(Some("Web"), "Jeep", Some("Lost")),
            lead(Some("Web"), "Jeep", Some("Active")),
        ]
    }

    #[test]
    fn counts_statuses_and_totals_per_source() {
        let rows = aggregate(&web_scenario(), &[GroupKey::LeadSource]).unwrap();
        assert_eq!(
            rows,
            vec![
                row(&["Web"], status("Active"), RowValue::Count(2)),
                row(&["Web"], status("Lost"), RowValue::Count(1)),
                row(&["Web"], StatusLabel::Total, RowValue::Count(3)),
            ]
        );
    }

    #[test]
    fn percentages_cover_every_status_but_total() {
        let keys = [GroupKey::LeadSource];
        let rows = aggregate(&web_scenario(), &keys).unwrap();
        let pct = derive_percentages(&rows, &keys).unwrap();
        assert_eq!(
            pct,
            vec![
                row(&["Web"], StatusLabel::Percent("Active".into()), RowValue::Percent(66.67)),
                row(&["Web"], StatusLabel::Percent("Lost".into()), RowValue::Percent(33.33)),
            ]
        );
    }

    #[test]
    fn statuses_sorting_after_total_still_get_percentages() {
        let keys = [GroupKey::LeadSource];
        let records = vec![
            lead(Some("Web"), "Jeep", Some("Won")),
            lead(Some("Web"), "Jeep", Some("Active")),
        ];
        let pct = derive_percentages(&aggregate(&records, &keys).unwrap(), &keys).unwrap();
        let labels: HashSet<String> = pct.iter().map(|r| r.status.to_string()).collect();
        assert_eq!(labels, HashSet::from(["Won %".to_string(), "Active %".to_string()]));
    }

    #[test]
    fn missing_status_or_group_value_is_not_counted() {
        let records = vec![
            lead(Some("Web"), "Jeep", Some("Active")),
            lead(Some("Web"), "Jeep", None),
            lead(None, "Jeep", Some("Active")),
        ];
        let rows = aggregate(&records, &[GroupKey::LeadSource]).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], row(&["Web"], StatusLabel::Total, RowValue::Count(1)));
    }

    #[test]
    fn totals_match_status_sums_for_two_level_groups() {
        let keys = [GroupKey::InterestMake, GroupKey::LeadSource];
        let records = vec![
            lead(Some("Web"), "Jeep", Some("Active Leads")),
            lead(Some("Web"), "Jeep", Some("Sold Leads")),
            lead(Some("Phone"), "Jeep", Some("Lost Leads")),
            lead(Some("Web"), "Fiat", Some("Lost Leads")),
            lead(Some("Web"), "Fiat", Some("Lost Leads")),
            lead(Some("Walk-in"), "Ram", Some("Sold Leads")),
        ];
        let rows = aggregate(&records, &keys).unwrap();

        let mut sums: BTreeMap<Vec<String>, (f64, f64)> = BTreeMap::new();
        for r in &rows {
            let e = sums.entry(r.group.clone()).or_default();
            if r.status.is_total() {
                e.1 += r.value.as_f64();
            } else {
                e.0 += r.value.as_f64();
            }
        }
        assert_eq!(sums.len(), 4);
        for (group, (parts, total)) in sums {
            assert_eq!(parts, total, "group {:?}", group);
        }

        let pairs: HashSet<(Vec<String>, String)> =
            rows.iter().map(|r| (r.group.clone(), r.status.to_string())).collect();
        assert_eq!(pairs.len(), rows.len());
    }

    #[test]
    fn percentages_sum_to_one_hundred_per_group() {
        let keys = [GroupKey::LeadSource];
        let mut records = Vec::new();
        for (s, n) in [("Active", 7), ("Lost", 5), ("Sold", 1)] {
            for _ in 0..n {
                records.push(lead(Some("Web"), "Jeep", Some(s)));
            }
        }
        let pct = derive_percentages(&aggregate(&records, &keys).unwrap(), &keys).unwrap();
        let sum: f64 = pct.iter().map(|r| r.value.as_f64()).sum();
        assert!((sum - 100.0).abs() <= 0.05, "sum was {}", sum);
    }

    #[test]
    fn aggregation_is_repeatable() {
        let keys = [GroupKey::InterestMake, GroupKey::LeadSource];
        let records = web_scenario();
        assert_eq!(aggregate(&records, &keys).unwrap(), aggregate(&records, &keys).unwrap());
    }

    #[test]
    fn empty_input_produces_nothing() {
        let keys = [GroupKey::LeadSource];
        let rows = aggregate(&[], &keys).unwrap();
        assert!(rows.is_empty());
        assert!(derive_percentages(&rows, &keys).unwrap().is_empty());
    }

    #[test]
    fn zero_total_is_a_contract_violation() {
        let keys = [GroupKey::LeadSource];
        let rows = vec![
            row(&["Web"], status("Active"), RowValue::Count(0)),
            row(&["Web"], StatusLabel::Total, RowValue::Count(0)),
        ];
        let err = derive_percentages(&rows, &keys).unwrap_err();
        assert!(matches!(err, ReportError::DivisionByZero { .. }));
    }

    #[test]
    fn status_rows_need_a_total_row() {
        let keys = [GroupKey::LeadSource];
        let rows = vec![row(&["Web"], status("Active"), RowValue::Count(2))];
        assert!(matches!(
            derive_percentages(&rows, &keys),
            Err(ReportError::MissingTotal { .. })
        ));
    }

    #[test]
    fn group_arity_must_match_keys() {
        let rows = vec![row(&["Jeep", "Web"], StatusLabel::Total, RowValue::Count(1))];
        assert!(matches!(
            derive_percentages(&rows, &[GroupKey::LeadSource]),
            Err(ReportError::GroupArity { expected: 1, found: 2 })
        ));
    }

    #[test]
    fn combined_rows_are_stable_under_rederivation() {
        let keys = [GroupKey::LeadSource];
        let combined = with_percentages(aggregate(&web_scenario(), &keys).unwrap(), &keys).unwrap();
        assert_eq!(combined.len(), 5);
        assert_eq!(derive_percentages(&combined, &keys).unwrap().len(), 2);
    }

    #[test]
    fn statuses_named_like_synthetic_labels_are_rejected() {
        let keys = [GroupKey::LeadSource];
        for clash in ["Total", "Active %"] {
            let records = vec![
                lead(Some("Web"), "Jeep", Some(clash)),
                lead(Some("Web"), "Jeep", Some("Active")),
            ];
            match aggregate(&records, &keys) {
                Err(ReportError::ReservedStatus { status }) => assert_eq!(status, clash),
                other => panic!("expected ReservedStatus for {:?}, got {:?}", clash, other),
            }
        }
    }

    fn brand_rows() -> Vec<AggregateRow> {
        let keys = [GroupKey::InterestMake, GroupKey::LeadSource];
        let records = vec![
            lead(Some("Web"), "Jeep", Some("Active")),
            lead(Some("Web"), "Jeep", Some("Lost")),
            lead(Some("Phone"), "Jeep", Some("Lost")),
            lead(Some("Web"), "Fiat", Some("Active")),
        ];
        with_percentages(aggregate(&records, &keys).unwrap(), &keys).unwrap()
    }

    #[test]
    fn rollup_to_first_key_gives_brand_subtotals() {
        let keys = [GroupKey::InterestMake, GroupKey::LeadSource];
        let subtotals = rollup(&brand_rows(), &keys, 1).unwrap();
        let jeep: Vec<(String, String)> = subtotals
            .iter()
            .filter(|r| r.group == ["Jeep"])
            .map(|r| (r.status.to_string(), r.value.to_string()))
            .collect();
        assert_eq!(
            jeep,
            vec![
                ("Active".to_string(), "1".to_string()),
                ("Lost".to_string(), "2".to_string()),
                ("Total".to_string(), "3".to_string()),
                ("Active %".to_string(), "33.33".to_string()),
                ("Lost %".to_string(), "66.67".to_string()),
            ]
        );
    }

    #[test]
    fn grand_total_recomputes_percentages_from_summed_counts() {
        let keys = [GroupKey::InterestMake, GroupKey::LeadSource];
        let grand = rollup(&brand_rows(), &keys, 0).unwrap();
        assert!(grand.iter().all(|r| r.group.is_empty()));
        assert_eq!(
            grand,
            vec![
                row(&[], status("Active"), RowValue::Count(2)),
                row(&[], status("Lost"), RowValue::Count(2)),
                row(&[], StatusLabel::Total, RowValue::Count(4)),
                row(&[], StatusLabel::Percent("Active".into()), RowValue::Percent(50.0)),
                row(&[], StatusLabel::Percent("Lost".into()), RowValue::Percent(50.0)),
            ]
        );
    }

    #[test]
    fn rollup_of_nothing_is_empty() {
        let keys = [GroupKey::LeadSource];
        assert!(rollup(&[], &keys, 0).unwrap().is_empty());
        assert!(matches!(rollup(&[], &keys, 2), Err(ReportError::GroupArity { .. })));
    }
}
