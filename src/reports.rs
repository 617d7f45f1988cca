use crate::aggregate::{aggregate, rollup, with_percentages};
use crate::error::Result;
use crate::types::{
    GroupKey, LeadMetrics, LeadRecord, PivotReport, ReasonCount, SliceCount, ACTIVE_LEADS,
    LOST_LEADS, SOLD_LEADS,
};
use crate::util::{percent_of, round_to};
use std::collections::HashMap;

pub const PER_SOURCE_KEYS: [GroupKey; 1] = [GroupKey::LeadSource];
pub const PER_BRAND_SOURCE_KEYS: [GroupKey; 2] = [GroupKey::InterestMake, GroupKey::LeadSource];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusField {
    StatusCheck,
    LeadStatus,
}

impl StatusField {
    fn value<'a>(&self, record: &'a LeadRecord) -> Option<&'a str> {
        match self {
            StatusField::StatusCheck => record.status_check.as_deref(),
            StatusField::LeadStatus => record.lead_status.as_deref(),
        }
    }
}

/// Headline counts: leads with a brand, and leads per status bucket.
pub fn lead_metrics(data: &[LeadRecord]) -> LeadMetrics {
    let bucket = |name: &str| {
        data.iter()
            .filter(|r| r.status_check.as_deref() == Some(name))
            .count()
    };
    LeadMetrics {
        total_leads: data.iter().filter(|r| r.interest_make.is_some()).count(),
        active_leads: bucket(ACTIVE_LEADS),
        lost_leads: bucket(LOST_LEADS),
        sold_leads: bucket(SOLD_LEADS),
    }
}

/// Leads per value of `field` with each value's share of the counted leads,
/// largest first.
pub fn status_breakdown(data: &[LeadRecord], field: StatusField) -> Vec<SliceCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for r in data {
        if let Some(v) = field.value(r) {
            *counts.entry(v).or_default() += 1;
        }
    }
    let whole: usize = counts.values().sum();
    let mut slices: Vec<SliceCount> = counts
        .into_iter()
        .map(|(label, count)| SliceCount {
            label: label.to_string(),
            count,
            share: percent_of(count as f64, whole as f64).unwrap_or(0.0),
        })
        .collect();
    slices.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    slices
}

pub fn leads_per_source(data: &[LeadRecord]) -> Result<PivotReport> {
    pivot(data, &PER_SOURCE_KEYS)
}

pub fn leads_per_source_per_brand(data: &[LeadRecord]) -> Result<PivotReport> {
    pivot(data, &PER_BRAND_SOURCE_KEYS)
}

fn pivot(data: &[LeadRecord], keys: &[GroupKey]) -> Result<PivotReport> {
    let rows = with_percentages(aggregate(data, keys)?, keys)?;
    let subtotals = if keys.len() > 1 { rollup(&rows, keys, 1)? } else { Vec::new() };
    let grand_total = rollup(&rows, keys, 0)?;
    Ok(PivotReport { keys: keys.to_vec(), rows, subtotals, grand_total })
}

/// Reasons recorded on leads whose `LeadStatus` is `lead_status`, most
/// common first.
pub fn cancellation_reasons(data: &[LeadRecord], lead_status: &str) -> Vec<ReasonCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for r in data.iter().filter(|r| r.lead_status.as_deref() == Some(lead_status)) {
        *counts.entry(r.cancellation_reason.as_str()).or_default() += 1;
    }
    let mut reasons: Vec<ReasonCount> = counts
        .into_iter()
        .map(|(reason, count)| ReasonCount { reason: reason.to_string(), count })
        .collect();
    reasons.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.reason.cmp(&b.reason)));
    reasons
}

pub fn top_reasons(data: &[LeadRecord], lead_status: &str, n: usize) -> Vec<SliceCount> {
    let reasons = cancellation_reasons(data, lead_status);
    let shown: Vec<&ReasonCount> = reasons.iter().take(n).collect();
    // Shares are relative to the shown slices, as the chart only plots those.
    let whole: usize = shown.iter().map(|r| r.count).sum();
    shown
        .into_iter()
        .map(|r| SliceCount {
            label: r.reason.clone(),
            count: r.count,
            share: round_to(r.count as f64 / whole.max(1) as f64 * 100.0, 2),
        })
        .collect()
}
