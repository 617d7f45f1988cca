use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("start date {start} is after end date {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("group [{}] has a zero total", .group.join(", "))]
    DivisionByZero { group: Vec<String> },

    #[error("group [{}] has no Total row", .group.join(", "))]
    MissingTotal { group: Vec<String> },

    #[error("row group has {found} values but {expected} grouping keys were given")]
    GroupArity { expected: usize, found: usize },

    #[error("status \"{status}\" clashes with a label the report adds itself")]
    ReservedStatus { status: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;
