//! Date, dealer and brand selection over a lead dataset.
//!
//! The selection is an explicit immutable [`FilterConfig`]; the "All" entry
//! of a multi-select is represented by [`Selection::All`] rather than a
//! sentinel value mixed into the list.

use crate::error::{ReportError, Result};
use crate::types::{GroupKey, LeadRecord};
use chrono::NaiveDate;
use std::collections::BTreeSet;
use tracing::debug;

pub const ALL_SENTINEL: &str = "all";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    All,
    Only(BTreeSet<String>),
}

impl Selection {
    /// Build a selection from user-supplied values. No values, or any value
    /// equal to `all`, selects everything.
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = BTreeSet::new();
        for v in values {
            let v: String = v.into();
            let v = v.trim();
            if v.eq_ignore_ascii_case(ALL_SENTINEL) {
                return Selection::All;
            }
            if !v.is_empty() {
                set.insert(v.to_string());
            }
        }
        if set.is_empty() {
            Selection::All
        } else {
            Selection::Only(set)
        }
    }

    /// A missing value only passes an `All` selection.
    pub fn allows(&self, value: Option<&str>) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(set) => value.is_some_and(|v| set.contains(v)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterConfig {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub dealers: Selection,
    pub brands: Selection,
}

impl FilterConfig {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end, dealers: Selection::All, brands: Selection::All }
    }

    pub fn with_dealers(mut self, dealers: Selection) -> Self {
        self.dealers = dealers;
        self
    }

    pub fn with_brands(mut self, brands: Selection) -> Self {
        self.brands = brands;
        self
    }

    /// Pull both dates into `[min, max]`, the range a date picker offers.
    pub fn clamped_to(mut self, (min, max): (NaiveDate, NaiveDate)) -> Self {
        self.start = self.start.clamp(min, max);
        self.end = self.end.clamp(min, max);
        self
    }
}

/// Earliest and latest creation date in the dataset.
pub fn date_bounds(records: &[LeadRecord]) -> Option<(NaiveDate, NaiveDate)> {
    let mut dates = records.iter().map(|r| r.created_at.date());
    let first = dates.next()?;
    Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
}

/// Sorted distinct values of `key`, the options a multi-select would list.
pub fn available_options(records: &[LeadRecord], key: GroupKey) -> Vec<String> {
    records
        .iter()
        .filter_map(|r| key.value(r))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Keep the records created within `[start, end]` (whole days, inclusive)
/// whose dealer and brand pass the configured selections.
pub fn filter(records: &[LeadRecord], config: &FilterConfig) -> Result<Vec<LeadRecord>> {
    if config.start > config.end {
        return Err(ReportError::InvalidRange { start: config.start, end: config.end });
    }
    let selected: Vec<LeadRecord> = records
        .iter()
        .filter(|r| {
            let day = r.created_at.date();
            day >= config.start
                && day <= config.end
                && config.dealers.allows(r.dealer.as_deref())
                && config.brands.allows(r.interest_make.as_deref())
        })
        .cloned()
        .collect();
    debug!(before = records.len(), after = selected.len(), "applied lead filter");
    Ok(selected)
}
