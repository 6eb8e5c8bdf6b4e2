use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;
use uuid::Uuid;

use crate::metrics::distribution::DistBucket;
use crate::metrics::percentiles::PercentileSet;
use crate::parse::LogFormat;
use crate::record::Sample;

/// Global statistics over every sample in a run.
///
/// Rates whose denominator is zero stay at 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedSummary {
    pub samples: u64,
    pub assertions: u64,
    /// Percent of samples whose own status is successful.
    #[serde(rename = "samplesSuccessRateNoAssert")]
    pub success_rate: f64,
    /// Percent of samples successful with every assertion passing.
    #[serde(rename = "samplesSuccessRateInclAssert")]
    pub success_rate_incl_assertions: f64,
    pub assertion_pass_rate: f64,
    #[serde(rename = "averageTime")]
    pub mean_time: f64,
    pub min_time: Option<u64>,
    pub max_time: u64,
}

/// Statistics for one label, or for the synthetic TOTAL group.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedGroup {
    #[serde(rename = "sampleName")]
    pub name: String,
    /// First-seen position; TOTAL comes after every label.
    pub index: usize,
    /// Anchor used by the HTML report.
    pub link: String,
    #[serde(flatten)]
    pub summary: AggregatedSummary,
    #[serde(rename = "samplesErrorNoAssert")]
    pub error_rate: f64,
    #[serde(rename = "samplesErrorInclAssert")]
    pub error_rate_incl_assertions: f64,
    /// Epoch ms of the group's first sample.
    #[serde(rename = "startTime")]
    pub start_time_ms: i64,
    /// Largest `start + elapsed` observed in the group, epoch ms.
    #[serde(rename = "endTime")]
    pub end_time_ms: i64,
    /// Span between start and end, seconds.
    #[serde(rename = "totalTime")]
    pub total_time_secs: f64,
    pub throughput: f64,
    #[serde(rename = "averageBytes")]
    pub mean_bytes: f64,
    pub bytes_per_sec: f64,
    #[serde(rename = "kBytesPerSec")]
    pub kb_per_sec: f64,
    #[serde(flatten)]
    pub percentiles: PercentileSet,
    /// Response times in the order they were read.
    #[serde(rename = "timeTable")]
    pub times: Vec<u64>,
    pub distribution: Vec<DistBucket>,
}

impl AggregatedGroup {
    pub fn is_total(&self) -> bool {
        self.link == total_link()
    }
}

pub(crate) fn group_link(index: usize, is_total: bool) -> String {
    if is_total {
        total_link()
    } else {
        format!("aggr{index}")
    }
}

fn total_link() -> String {
    "samples_".to_owned()
}

/// Finalized, read-only result of analysing one log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub format: LogFormat,
    pub summary: AggregatedSummary,
    /// Per-label groups in first-seen order, TOTAL last.
    pub groups: Vec<AggregatedGroup>,
    pub samples: Vec<Sample>,
}

impl Report {
    /// Groups for real labels, without TOTAL.
    pub fn label_groups(&self) -> &[AggregatedGroup] {
        match self.groups.last() {
            Some(last) if last.is_total() => &self.groups[..self.groups.len() - 1],
            _ => &self.groups,
        }
    }

    pub fn total(&self) -> Option<&AggregatedGroup> {
        self.groups.last().filter(|g| g.is_total())
    }

    pub fn group(&self, label: &str) -> Option<&AggregatedGroup> {
        self.label_groups().iter().find(|g| g.name == label)
    }

    /// Samples carrying `label`, in file order.
    pub fn samples_for<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a Sample> + 'a {
        self.samples.iter().filter(move |s| s.label == label)
    }

    pub fn assertion_count(&self) -> usize {
        self.samples.iter().map(|s| s.assertions.len()).sum()
    }

    /// The list-of-maps view handed back to callers: the summary first,
    /// then one map per group with TOTAL last.
    pub fn return_structure(&self) -> serde_json::Result<Vec<serde_json::Value>> {
        let mut out = Vec::with_capacity(self.groups.len() + 1);
        out.push(serde_json::to_value(&self.summary)?);
        for group in &self.groups {
            out.push(serde_json::to_value(group)?);
        }
        Ok(out)
    }
}

// ─── Run metadata ────────────────────────────────────────────────

/// Identity of one analysis run. Kept outside [`Report`] so that the
/// same log always yields the same report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetadata {
    pub run_id: Uuid,
    pub log_path: Option<PathBuf>,
    pub analysed_at: DateTime<Local>,
}

impl RunMetadata {
    pub fn new(log_path: Option<&Path>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            log_path: log_path.map(Path::to_path_buf),
            analysed_at: Local::now(),
        }
    }

    /// `YYYY-mm-dd HH:MM:SS`, local time.
    pub fn timestamp(&self) -> String {
        self.analysed_at.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    pub fn log_display(&self) -> String {
        self.log_path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<memory>".to_owned())
    }
}

/// Local date-time for an epoch-millisecond timestamp.
pub fn format_epoch_ms(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|t| {
            t.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S%.3f")
                .to_string()
        })
        .unwrap_or_else(|| ms.to_string())
}
