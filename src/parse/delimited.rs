use csv::{ReaderBuilder, StringRecord};
use tracing::debug;

use super::AnalysisOptions;
use crate::error::{AnalysisError, Result};
use crate::record::{RawSample, Sample};

/// Column count of the basic headerless layout.
const BASIC_COLUMNS: usize = 10;
/// Basic layout plus `ng` and `na`.
const EXTENDED_COLUMNS: usize = 12;

/// Positions used when the file starts with a header row. Columns 8 and
/// 10–12 of that layout are not modelled and are ignored.
mod header_layout {
    pub const TIMESTAMP: usize = 0;
    pub const ELAPSED: usize = 1;
    pub const LABEL: usize = 2;
    pub const RESPONSE_CODE: usize = 3;
    pub const RESPONSE_MESSAGE: usize = 4;
    pub const THREAD_NAME: usize = 5;
    pub const DATA_TYPE: usize = 6;
    pub const STATUS: usize = 7;
    pub const BYTES: usize = 9;
    pub const LATENCY: usize = 13;
    pub const COLUMNS: usize = 14;
}

/// Parses comma separated log content into samples, in file order.
///
/// Rows that fit none of the known layouts, or whose numeric fields do
/// not parse, are skipped. Samples from this encoding never carry
/// assertions.
pub fn parse(content: &str, options: &AnalysisOptions) -> Result<Vec<Sample>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut samples = Vec::new();
    let mut header_found = false;
    let mut skipped = 0usize;

    for (index, result) in reader.records().enumerate() {
        options.checkpoint(index)?;

        let row = match result {
            Ok(row) => row,
            Err(err) => {
                debug!(row = index, error = %err, "skipping unreadable row");
                skipped += 1;
                continue;
            }
        };

        if index == 0 && is_header(&row) {
            header_found = true;
            continue;
        }

        let sample = if header_found {
            from_header_layout(&row)
        } else {
            from_positional_layout(&row)
        };

        match sample {
            Some(sample) => samples.push(sample),
            None => {
                debug!(row = index, columns = row.len(), "skipping invalid row");
                skipped += 1;
            }
        }
    }

    debug!(parsed = samples.len(), skipped, header_found, "delimited log scanned");

    if samples.is_empty() {
        return Err(AnalysisError::NoSamplesFound);
    }
    Ok(samples)
}

fn is_header(row: &StringRecord) -> bool {
    matches!(
        (row.get(0), row.get(1)),
        (Some(first), Some(second)) if first.trim_start_matches('\u{feff}').starts_with("timeStamp") && second.starts_with("elapsed")
    )
}

fn from_header_layout(row: &StringRecord) -> Option<Sample> {
    use header_layout::*;

    if row.len() < COLUMNS {
        return None;
    }
    RawSample {
        timestamp: &row[TIMESTAMP],
        elapsed: &row[ELAPSED],
        label: &row[LABEL],
        response_code: &row[RESPONSE_CODE],
        response_message: &row[RESPONSE_MESSAGE],
        thread_name: &row[THREAD_NAME],
        data_type: &row[DATA_TYPE],
        status: &row[STATUS],
        bytes: &row[BYTES],
        latency: &row[LATENCY],
        extended: None,
    }
    .validate()
}

fn from_positional_layout(row: &StringRecord) -> Option<Sample> {
    match row.len() {
        BASIC_COLUMNS => core_fields(row).validate(),
        EXTENDED_COLUMNS => core_fields(row).extended(&row[10], &row[11]).validate(),
        _ => None,
    }
}

fn core_fields(row: &StringRecord) -> RawSample<'_> {
    RawSample::from_core([
        &row[0], &row[1], &row[2], &row[3], &row[4], &row[5], &row[6], &row[7], &row[8], &row[9],
    ])
}
