//! Log format detection and parser dispatch.
//!
//! Raw log text goes through [`detect_format`] and then to exactly one of
//! the two parsers. Both return samples in file order and both fail with
//! [`AnalysisError::NoSamplesFound`] when nothing survives validation.

pub mod delimited;
pub mod xml;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Serialize;
use tracing::info;

use crate::error::{AnalysisError, Result};
use crate::record::Sample;

/// `<int>,<int>,` at the start of a line.
static LEADING_INTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+,\d+,").expect("static regex"));

const XML_DECLARATION: &str = "xml version";
const XML_ROOT_OPEN: &str = "<testResults";
const CSV_HEADER_PREFIX: &str = "timeStamp,elapsed,label";

/// How often parsers look at the cancellation flag, in records.
pub const DEFAULT_BATCH_SIZE: usize = 1_000;

/// The two log encodings the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Delimited,
    Xml,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delimited => f.write_str("csv"),
            Self::Xml => f.write_str("xml"),
        }
    }
}

/// Classifies a log by its first two lines. `None` means unrecognized.
pub fn detect_format(first: &str, second: Option<&str>) -> Option<LogFormat> {
    let first = first.trim_start_matches('\u{feff}');

    if let Some(second) = second {
        if first.contains(XML_DECLARATION) && second.contains(XML_ROOT_OPEN) {
            return Some(LogFormat::Xml);
        }
    }

    if LEADING_INTS.is_match(first) {
        return Some(LogFormat::Delimited);
    }

    match second {
        Some(second) if first.contains(CSV_HEADER_PREFIX) && LEADING_INTS.is_match(second) => {
            Some(LogFormat::Delimited)
        }
        _ => None,
    }
}

/// Detects the format of whole log content.
pub fn detect_content_format(content: &str) -> Result<LogFormat> {
    let mut lines = content.lines();
    let first = lines.next().ok_or(AnalysisError::UnrecognizedFormat)?;
    detect_format(first, lines.next()).ok_or(AnalysisError::UnrecognizedFormat)
}

// ─── Cancellation ────────────────────────────────────────────────

/// Shared stop flag checked by parsers between batches.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Knobs for one analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub batch_size: usize,
    pub cancel: Option<CancelFlag>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            cancel: None,
        }
    }
}

impl AnalysisOptions {
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Called by parsers once per record; errors out on a batch boundary
    /// if the flag has been raised.
    pub(crate) fn checkpoint(&self, processed: usize) -> Result<()> {
        let batch = self.batch_size.max(1);
        match &self.cancel {
            Some(flag) if processed % batch == 0 && flag.is_cancelled() => {
                Err(AnalysisError::Cancelled { processed })
            }
            _ => Ok(()),
        }
    }
}

/// Detects the encoding and runs the matching parser.
pub fn parse_log(content: &str, options: &AnalysisOptions) -> Result<(LogFormat, Vec<Sample>)> {
    let format = detect_content_format(content)?;
    info!(%format, "log file format detected");

    let samples = match format {
        LogFormat::Delimited => delimited::parse(content, options)?,
        LogFormat::Xml => xml::parse(content, options)?,
    };

    info!(samples = samples.len(), "extracted samples and assertions");
    Ok((format, samples))
}
