use crate::util::{format_int, format_number};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use tabled::Tabled;

pub const UNKNOWN_REASON: &str = "Unknown";
pub const TOTAL_LABEL: &str = "Total";
pub const PERCENT_SUFFIX: &str = " %";
pub const SUBTOTAL_LABEL: &str = "Subtotal";
pub const GRAND_TOTAL_LABEL: &str = "Grand Total";

pub const ACTIVE_LEADS: &str = "Active Leads";
pub const LOST_LEADS: &str = "Lost Leads";
pub const SOLD_LEADS: &str = "Sold Leads";

#[derive(Debug, Deserialize)]
pub struct RawRow {
    #[serde(rename = "DTcreated")]
    pub created: Option<String>,
    #[serde(rename = "Dealer")]
    pub dealer: Option<String>,
    #[serde(rename = "InterestMake")]
    pub interest_make: Option<String>,
    #[serde(rename = "LeadSource")]
    pub lead_source: Option<String>,
    #[serde(rename = "StatusCheck")]
    pub status_check: Option<String>,
    #[serde(rename = "LeadStatus")]
    pub lead_status: Option<String>,
    #[serde(rename = "CancellationReason")]
    pub cancellation_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeadRecord {
    pub created_at: NaiveDateTime,
    pub dealer: Option<String>,
    pub interest_make: Option<String>,
    pub lead_source: Option<String>,
    pub status_check: Option<String>,
    pub lead_status: Option<String>,
    pub cancellation_reason: String,
}

/// Categorical fields a report can group leads by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupKey {
    LeadSource,
    InterestMake,
    Dealer,
}

impl GroupKey {
    pub fn value<'a>(&self, record: &'a LeadRecord) -> Option<&'a str> {
        match self {
            GroupKey::LeadSource => record.lead_source.as_deref(),
            GroupKey::InterestMake => record.interest_make.as_deref(),
            GroupKey::Dealer => record.dealer.as_deref(),
        }
    }

    /// Column name used in exported files.
    pub fn column_name(&self) -> &'static str {
        match self {
            GroupKey::LeadSource => "LeadSource",
            GroupKey::InterestMake => "InterestMake",
            GroupKey::Dealer => "Dealer",
        }
    }

    pub fn header(&self) -> &'static str {
        match self {
            GroupKey::LeadSource => "Lead Source",
            GroupKey::InterestMake => "Brand",
            GroupKey::Dealer => "Dealer",
        }
    }
}

/// Status column of an aggregate row.
///
/// Raw rows carry the lead's `StatusCheck` value, every group gets one
/// synthetic `Total`, and the percentage stage adds `"<status> %"` rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StatusLabel {
    Status(String),
    Total,
    Percent(String),
}

impl StatusLabel {
    pub fn is_total(&self) -> bool {
        matches!(self, StatusLabel::Total)
    }

    /// Whether a raw status would render the same as a synthetic label.
    pub fn is_reserved(status: &str) -> bool {
        status == TOTAL_LABEL || status.ends_with(PERCENT_SUFFIX)
    }
}

impl fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusLabel::Status(s) => write!(f, "{}", s),
            StatusLabel::Total => write!(f, "{}", TOTAL_LABEL),
            StatusLabel::Percent(s) => write!(f, "{}{}", s, PERCENT_SUFFIX),
        }
    }
}

impl Serialize for StatusLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RowValue {
    Count(u64),
    Percent(f64),
}

impl RowValue {
    pub fn as_f64(&self) -> f64 {
        match *self {
            RowValue::Count(c) => c as f64,
            RowValue::Percent(p) => p,
        }
    }

    /// Unformatted value for machine-readable exports.
    pub fn plain(&self) -> String {
        match *self {
            RowValue::Count(c) => c.to_string(),
            RowValue::Percent(p) => format!("{:.2}", p),
        }
    }
}

impl fmt::Display for RowValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowValue::Count(c) => write!(f, "{}", format_int(*c)),
            RowValue::Percent(p) => write!(f, "{:.2}", p),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    pub group: Vec<String>,
    pub status: StatusLabel,
    pub value: RowValue,
}

/// Aggregated rows together with the keys they were grouped by.
///
/// `subtotals` roll the rows up to the first key (one group per brand in
/// the brand view) and are empty for single-key reports. `grand_total`
/// rows have an empty group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotReport {
    #[serde(skip)]
    pub keys: Vec<GroupKey>,
    pub rows: Vec<AggregateRow>,
    pub subtotals: Vec<AggregateRow>,
    pub grand_total: Vec<AggregateRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LeadMetrics {
    pub total_leads: usize,
    pub active_leads: usize,
    pub lost_leads: usize,
    pub sold_leads: usize,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct SliceCount {
    #[serde(rename = "Label")]
    #[tabled(rename = "Label")]
    pub label: String,
    #[serde(rename = "Count")]
    #[tabled(rename = "Count")]
    pub count: usize,
    #[serde(rename = "Share")]
    #[tabled(rename = "Share %", display_with = "display_share")]
    pub share: f64,
}

fn display_share(share: &f64) -> String {
    format_number(*share, 2)
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq, Eq)]
pub struct ReasonCount {
    #[serde(rename = "CancellationReason")]
    #[tabled(rename = "Reason")]
    pub reason: String,
    #[serde(rename = "Count")]
    #[tabled(rename = "Count")]
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub start_date: String,
    pub end_date: String,
    pub metrics: LeadMetrics,
    pub per_source: PivotReport,
    pub per_brand_source: PivotReport,
    pub cancelled_reasons: Vec<ReasonCount>,
    pub lost_reasons: Vec<ReasonCount>,
}
