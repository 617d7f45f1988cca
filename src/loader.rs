use crate::error::Result;
use crate::types::{LeadRecord, RawRow, UNKNOWN_REASON};
use crate::util::{clean_text, parse_datetime_safe};
use csv::ReaderBuilder;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub parse_errors: usize,
    pub unknown_reasons: usize,
}

#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub records: Vec<LeadRecord>,
    pub report: LoadReport,
}

pub fn load_and_clean<P: AsRef<Path>>(path: P) -> Result<LoadedDataset> {
    let path = path.as_ref();
    info!(path = %path.display(), "loading lead dataset");
    let file = std::fs::File::open(path)?;
    load_from_reader(file)
}

/// Read leads from any CSV source. Input that is not valid UTF-8 is decoded
/// as latin-1, which is how the dealer exports are encoded.
pub fn load_from_reader<R: Read>(mut reader: R) -> Result<LoadedDataset> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    let text = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            debug!("input is not UTF-8, decoding as latin-1");
            e.into_bytes().iter().map(|&b| b as char).collect()
        }
    };

    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut report = LoadReport::default();
    let mut records = Vec::new();

    for result in rdr.deserialize::<RawRow>() {
        report.total_rows += 1;
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                debug!(error = %e, "skipping malformed row");
                report.parse_errors += 1;
                continue;
            }
        };

        let Some(created_at) = parse_datetime_safe(row.created.as_deref()) else {
            report.parse_errors += 1;
            continue;
        };

        let cancellation_reason = match clean_text(row.cancellation_reason) {
            Some(reason) => reason,
            None => {
                report.unknown_reasons += 1;
                UNKNOWN_REASON.to_string()
            }
        };

        records.push(LeadRecord {
            created_at,
            dealer: clean_text(row.dealer),
            interest_make: clean_text(row.interest_make),
            lead_source: clean_text(row.lead_source),
            status_check: clean_text(row.status_check),
            lead_status: clean_text(row.lead_status),
            cancellation_reason,
        });
    }

    report.loaded_rows = records.len();
    info!(
        total = report.total_rows,
        loaded = report.loaded_rows,
        parse_errors = report.parse_errors,
        "lead dataset loaded"
    );
    Ok(LoadedDataset { records, report })
}
