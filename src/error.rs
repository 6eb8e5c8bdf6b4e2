use std::path::PathBuf;
use std::process::ExitStatus;

// ─── Unified error type ──────────────────────────────────────────

/// Everything that can abort an analysis run or an export.
///
/// Per-record validation problems never show up here: invalid rows and
/// elements are skipped during parsing and only the whole-run outcomes
/// below are surfaced to callers.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("log file {} couldn't be opened", path.display())]
    ReadFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("incorrect log file format")]
    UnrecognizedFormat,

    #[error("problems while parsing xml: {0}")]
    MalformedDocument(#[from] roxmltree::Error),

    #[error("no samples were found in a log file")]
    NoSamplesFound,

    #[error("analysis cancelled after {processed} records")]
    Cancelled { processed: usize },

    #[error("{0}")]
    ProcessSpawn(String),

    #[error("value returned by JMeter: {status}")]
    ExternalProcessFailure { status: ExitStatus },

    #[error("{exporter} export to {} failed: {message}", path.display())]
    PersistenceFailure {
        exporter: &'static str,
        path: PathBuf,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

impl AnalysisError {
    pub(crate) fn persistence(
        exporter: &'static str,
        path: impl Into<PathBuf>,
        err: impl std::fmt::Display,
    ) -> Self {
        Self::PersistenceFailure {
            exporter,
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// `true` for failures that abort the analysis itself, as opposed to
    /// a failed export of an already computed report.
    pub fn is_fatal_to_analysis(&self) -> bool {
        !matches!(self, Self::PersistenceFailure { .. })
    }
}
