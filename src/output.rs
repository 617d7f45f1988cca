use crate::error::Result;
use crate::types::{AggregateRow, PivotReport, StatusLabel, GRAND_TOTAL_LABEL, SUBTOTAL_LABEL};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tabled::{builder::Builder, settings::Style, Table, Tabled};

pub const STATUS_COLUMN: &str = "StatusCheck";
pub const VALUE_COLUMN: &str = "Value";

pub fn write_csv<T: Serialize, P: AsRef<Path>>(path: P, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize, P: AsRef<Path>>(path: P, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Group cells for a rolled-up line: subtotals keep their leading keys and
/// mark the rest `Subtotal`, the grand total has an empty group.
fn summary_group(group: &[String], width: usize) -> Vec<String> {
    let mut cells = if group.is_empty() {
        vec![GRAND_TOTAL_LABEL.to_string()]
    } else {
        group.to_vec()
    };
    let fill = if group.is_empty() { "" } else { SUBTOTAL_LABEL };
    while cells.len() < width {
        cells.push(fill.to_string());
    }
    cells
}

/// Long-format export: one line per row with the group columns, the status
/// label and the value, followed by the subtotal and grand-total rows.
pub fn write_pivot_csv<P: AsRef<Path>>(path: P, report: &PivotReport) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    let width = report.keys.len();
    let mut header: Vec<&str> = report.keys.iter().map(|k| k.column_name()).collect();
    header.extend([STATUS_COLUMN, VALUE_COLUMN]);
    wtr.write_record(&header)?;
    let detail = report.rows.iter().map(|r| (r.group.clone(), r));
    let summary = report
        .subtotals
        .iter()
        .chain(&report.grand_total)
        .map(|r| (summary_group(&r.group, width), r));
    for (mut record, row) in detail.chain(summary) {
        record.push(row.status.to_string());
        record.push(row.value.plain());
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

type Cells<'a> = BTreeMap<&'a [String], BTreeMap<&'a StatusLabel, String>>;

fn cells_by_group(rows: &[AggregateRow]) -> Cells<'_> {
    let mut cells: Cells<'_> = BTreeMap::new();
    for row in rows {
        cells
            .entry(row.group.as_slice())
            .or_default()
            .insert(&row.status, row.value.to_string());
    }
    cells
}

/// Pivot the rows into one line per group and one column per status label
/// (raw statuses, then `Total`, then percentages). Absent cells stay blank.
/// Each first-key block closes with its subtotal line, and the grand total
/// comes last.
pub fn pivot_table(report: &PivotReport) -> String {
    if report.rows.is_empty() {
        return "(no rows)".to_string();
    }
    let width = report.keys.len();
    let labels: BTreeSet<&StatusLabel> = report.rows.iter().map(|r| &r.status).collect();
    let details = cells_by_group(&report.rows);
    let subtotals = cells_by_group(&report.subtotals);
    let grand = cells_by_group(&report.grand_total);

    let line = |group: Vec<String>, values: &BTreeMap<&StatusLabel, String>| {
        let mut line = group;
        line.extend(labels.iter().map(|l| values.get(*l).cloned().unwrap_or_default()));
        line
    };

    let mut builder = Builder::default();
    let mut header: Vec<String> = report.keys.iter().map(|k| k.header().to_string()).collect();
    header.extend(labels.iter().map(|l| l.to_string()));
    builder.push_record(header);

    let mut open_block: Option<&[String]> = None;
    for (group, values) in &details {
        let block = &group[..group.len().min(1)];
        if let Some(prev) = open_block.filter(|prev| *prev != block) {
            if let Some(sub) = subtotals.get(prev) {
                builder.push_record(line(summary_group(prev, width), sub));
            }
        }
        open_block = Some(block);
        builder.push_record(line(group.to_vec(), values));
    }
    if let Some(sub) = open_block.and_then(|prev| subtotals.get(prev).map(|sub| (prev, sub))) {
        builder.push_record(line(summary_group(sub.0, width), sub.1));
    }
    for (group, values) in &grand {
        builder.push_record(line(summary_group(group, width), values));
    }
    builder.build().with(Style::rounded()).to_string()
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}
