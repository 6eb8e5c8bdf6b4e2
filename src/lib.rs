//! Load-test result log analysis.
//!
//! Reads JMeter result logs in either CSV or XML form, validates every
//! record, aggregates them per label in first-seen order and derives the
//! usual report statistics (percentiles, spread, throughput, success
//! rates). Exporters then turn the finished [`Report`] into JSON, HTML or
//! a SQLite store.

pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod metrics;
pub mod parse;
pub mod record;
pub mod report;
pub mod runner;

use std::path::Path;

use tracing::info;

pub use error::{AnalysisError, Result};
pub use metrics::Aggregator;
pub use parse::{AnalysisOptions, CancelFlag, LogFormat};
pub use record::{Assertion, ExtendedFields, Sample};
pub use report::{AggregatedGroup, AggregatedSummary, Report, RunMetadata};

/// A finished report together with the identity of the run that made it.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub meta: RunMetadata,
    pub report: Report,
}

/// Parses and aggregates log content held in memory.
///
/// Same content in, same report out: nothing is carried between calls.
pub fn analyze_str(content: &str, options: &AnalysisOptions) -> Result<Report> {
    let (format, samples) = parse::parse_log(content, options)?;

    info!("calculating statistical values");
    let mut aggregator = Aggregator::new();
    aggregator.record_all(&samples);
    let (summary, groups) = aggregator.finish();

    Ok(Report {
        format,
        summary,
        groups,
        samples,
    })
}

/// Reads a log file and analyses it on the blocking pool.
pub async fn analyze_file(path: impl AsRef<Path>, options: &AnalysisOptions) -> Result<Analysis> {
    let path = path.as_ref();
    info!(path = %path.display(), "opening log file");

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| AnalysisError::ReadFailure {
            path: path.to_path_buf(),
            source,
        })?;
    let content = String::from_utf8_lossy(&bytes).into_owned();

    let options = options.clone();
    let report = match tokio::task::spawn_blocking(move || analyze_str(&content, &options)).await {
        Ok(result) => result?,
        Err(join) => std::panic::resume_unwind(join.into_panic()),
    };

    Ok(Analysis {
        meta: RunMetadata::new(Some(path)),
        report,
    })
}
