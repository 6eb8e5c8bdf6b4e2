//! Report exporters.
//!
//! Every exporter writes next to the analysed log, at a path derived by
//! [`derive_output_path`]. A failing exporter is reported on its own and
//! never invalidates the report or the other exporters.

pub mod html;
pub mod json;
pub mod sql;

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use crate::error::Result;
use crate::Analysis;

pub use html::HtmlExporter;
pub use json::JsonExporter;
pub use sql::SqlExporter;

#[async_trait]
pub trait Exporter: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Appended to the log path to form the output path.
    fn suffix(&self) -> &'static str;

    /// Writes `analysis` to `target`.
    async fn export(&self, analysis: &Analysis, target: &Path) -> Result<()>;
}

/// Outcome of one exporter.
#[derive(Debug)]
pub struct ExportOutcome {
    pub exporter: &'static str,
    pub result: Result<PathBuf>,
}

/// Runs each exporter in turn against the same analysis.
pub async fn export_all(
    analysis: &Analysis,
    base: &Path,
    exporters: &[Box<dyn Exporter>],
) -> Vec<ExportOutcome> {
    let mut outcomes = Vec::with_capacity(exporters.len());

    for exporter in exporters {
        let target = derive_output_path(base, exporter.suffix());
        info!(exporter = exporter.name(), path = %target.display(), "exporting report");

        let written = exporter.export(analysis, &target).await;
        if let Err(e) = &written {
            warn!(exporter = exporter.name(), error = %e, "export failed");
        }
        outcomes.push(ExportOutcome {
            exporter: exporter.name(),
            result: written.map(|()| target),
        });
    }

    outcomes
}

/// `<log><suffix>`, or `<log><UTC YYYYmmddHHMMSS><suffix>` when that file
/// already exists. A numeric tail is added if even that is taken.
pub fn derive_output_path(log_path: &Path, suffix: &str) -> PathBuf {
    let with = |middle: &str| {
        let mut name = OsString::from(log_path.as_os_str());
        name.push(middle);
        name.push(suffix);
        PathBuf::from(name)
    };

    let plain = with("");
    if !plain.exists() {
        return plain;
    }

    let stamp = Utc::now().format("%Y%m%d%H%M%S").to_string();
    let stamped = with(&stamp);
    if !stamped.exists() {
        return stamped;
    }

    (1u32..)
        .map(|n| with(&format!("{stamp}-{n}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or(stamped)
}

// ─── Section selection ───────────────────────────────────────────

/// Optional parts of the HTML report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Section {
    /// Aggregate report table and per-label statistics.
    AggregateReport = 0b0001,
    /// One sample table per label.
    LabelSamples = 0b0010,
    /// Response-time distribution and series per label.
    ResponseTimes = 0b0100,
    /// Every sample in one table.
    AllSamples = 0b1000,
}

/// Which optional sections to render. Built from a mask in which a set
/// bit turns that section off, so `0` renders everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportSections {
    disabled: u8,
}

impl ReportSections {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn from_disable_mask(mask: u8) -> Self {
        Self { disabled: mask }
    }

    pub fn disable(mut self, section: Section) -> Self {
        self.disabled |= section as u8;
        self
    }

    pub fn shows(&self, section: Section) -> bool {
        self.disabled & section as u8 == 0
    }

    pub fn disable_mask(&self) -> u8 {
        self.disabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_appends_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("run1.jtl");
        assert_eq!(derive_output_path(&log, ".html"), dir.path().join("run1.jtl.html"));
    }

    #[test]
    fn existing_output_gets_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("run1.jtl");
        std::fs::write(dir.path().join("run1.jtl.sql"), b"").unwrap();

        let derived = derive_output_path(&log, ".sql");
        let name = derived.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("run1.jtl"));
        assert!(name.ends_with(".sql"));
        assert_ne!(name, "run1.jtl.sql");
        assert!(!derived.exists());
    }

    #[test]
    fn repeated_collisions_still_find_a_free_name() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("r.jtl");
        let first = derive_output_path(&log, ".json");
        std::fs::write(&first, b"").unwrap();
        let second = derive_output_path(&log, ".json");
        std::fs::write(&second, b"").unwrap();
        let third = derive_output_path(&log, ".json");
        assert!(!third.exists());
        assert_ne!(second, third);
    }

    #[test]
    fn disable_mask_turns_sections_off() {
        let sections = ReportSections::from_disable_mask(0b0110);
        assert!(sections.shows(Section::AggregateReport));
        assert!(!sections.shows(Section::LabelSamples));
        assert!(!sections.shows(Section::ResponseTimes));
        assert!(sections.shows(Section::AllSamples));

        let all = ReportSections::all();
        assert!(all.shows(Section::AllSamples));
        assert_eq!(all.disable(Section::AllSamples).disable_mask(), 0b1000);
    }
}
