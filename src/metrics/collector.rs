use indexmap::IndexMap;
use tracing::debug;

use super::finalize;
use crate::record::Sample;
use crate::report::{AggregatedGroup, AggregatedSummary};

/// Name of the synthetic group spanning every sample.
pub const TOTAL_LABEL: &str = "TOTAL";

// ─── Running state ───────────────────────────────────────────────

/// Counters shared by the global summary and every group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryAccumulator {
    pub samples: u64,
    pub assertions: u64,
    pub successful_no_assert: u64,
    pub successful_incl_assert: u64,
    pub assertions_passed: u64,
    pub time_sum: u128,
    pub min_time: Option<u64>,
    pub max_time: u64,
}

impl SummaryAccumulator {
    fn record(&mut self, sample: &Sample) {
        let t = sample.elapsed_ms;

        self.samples += 1;
        self.time_sum += u128::from(t);
        self.min_time = Some(self.min_time.map_or(t, |min| min.min(t)));
        self.max_time = self.max_time.max(t);

        if sample.is_success() {
            self.successful_no_assert += 1;
        }
        for assertion in &sample.assertions {
            self.assertions += 1;
            if assertion.passed() {
                self.assertions_passed += 1;
            }
        }
        if sample.is_success_including_assertions() {
            self.successful_incl_assert += 1;
        }
    }
}

/// Running totals for one label (or for TOTAL).
#[derive(Debug, Clone, PartialEq)]
pub struct GroupAccumulator {
    pub name: String,
    pub counters: SummaryAccumulator,
    pub byte_sum: u128,
    /// Timestamp of the first sample seen for this group.
    pub start_ms: i64,
    /// Largest `start + elapsed` seen so far.
    pub end_ms: i64,
    /// Response times in arrival order.
    pub times: Vec<u64>,
}

impl GroupAccumulator {
    fn new(name: impl Into<String>, start_ms: i64) -> Self {
        Self {
            name: name.into(),
            counters: SummaryAccumulator::default(),
            byte_sum: 0,
            start_ms,
            end_ms: start_ms,
            times: Vec::new(),
        }
    }

    fn record(&mut self, sample: &Sample) {
        self.counters.record(sample);
        self.byte_sum += u128::from(sample.bytes);
        self.times.push(sample.elapsed_ms);
        self.end_ms = self.end_ms.max(sample.end_ms());
    }

    /// Wall-clock seconds between the group's first start and its
    /// furthest observed end.
    pub fn span_secs(&self) -> f64 {
        (i128::from(self.end_ms) - i128::from(self.start_ms)) as f64 / 1000.0
    }
}

// ─── Aggregator ──────────────────────────────────────────────────

/// Single-pass, order-preserving aggregation over parsed samples.
///
/// Groups get their index from the order labels are first seen; TOTAL is
/// kept apart and appended after every labelled group on [`finish`].
///
/// [`finish`]: Aggregator::finish
#[derive(Debug, Default)]
pub struct Aggregator {
    summary: SummaryAccumulator,
    groups: IndexMap<String, GroupAccumulator>,
    total: Option<GroupAccumulator>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one sample into the summary, its label's group and TOTAL.
    pub fn record(&mut self, sample: &Sample) {
        self.summary.record(sample);

        let group = self
            .groups
            .entry(sample.label.clone())
            .or_insert_with(|| GroupAccumulator::new(sample.label.as_str(), sample.timestamp_ms));
        group.record(sample);

        self.total
            .get_or_insert_with(|| GroupAccumulator::new(TOTAL_LABEL, sample.timestamp_ms))
            .record(sample);
    }

    pub fn record_all<'a>(&mut self, samples: impl IntoIterator<Item = &'a Sample>) {
        for sample in samples {
            self.record(sample);
        }
    }

    /// Number of distinct labels seen so far (TOTAL excluded).
    pub fn label_count(&self) -> usize {
        self.groups.len()
    }

    /// Running state of one label, if seen.
    pub fn group(&self, label: &str) -> Option<&GroupAccumulator> {
        self.groups.get(label)
    }

    /// Index a label was assigned when first seen.
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.groups.get_index_of(label)
    }

    /// Consumes the running state and computes every derived statistic.
    /// Groups come back in first-seen order with TOTAL last.
    pub fn finish(self) -> (AggregatedSummary, Vec<AggregatedGroup>) {
        let summary = finalize::summary(&self.summary);
        debug!(
            labels = self.groups.len(),
            samples = self.summary.samples,
            "finalizing aggregated groups"
        );

        let mut groups: Vec<AggregatedGroup> = self
            .groups
            .into_values()
            .enumerate()
            .map(|(index, acc)| finalize::group(acc, index, false))
            .collect();

        if let Some(total) = self.total {
            let index = groups.len();
            groups.push(finalize::group(total, index, true));
        }

        (summary, groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Assertion, RawSample};

    fn sample(label: &str, ts: i64, elapsed: u64, status: &str) -> Sample {
        let ts = ts.to_string();
        let elapsed = elapsed.to_string();
        RawSample::from_core([
            ts.as_str(),
            elapsed.as_str(),
            label,
            "200",
            "OK",
            "t",
            "text",
            status,
            "100",
            "5",
        ])
        .validate()
        .expect("valid sample")
    }

    #[test]
    fn labels_keep_first_seen_order() {
        let mut agg = Aggregator::new();
        agg.record(&sample("B", 1_000, 10, "true"));
        agg.record(&sample("A", 1_100, 10, "true"));
        agg.record(&sample("B", 1_200, 10, "true"));
        agg.record(&sample("C", 1_300, 10, "true"));

        assert_eq!(agg.index_of("B"), Some(0));
        assert_eq!(agg.index_of("A"), Some(1));
        assert_eq!(agg.index_of("C"), Some(2));
        assert_eq!(agg.label_count(), 3);
        assert_eq!(agg.group("B").map(|g| g.counters.samples), Some(2));
    }

    #[test]
    fn end_time_is_max_of_start_plus_duration() {
        let mut agg = Aggregator::new();
        agg.record(&sample("A", 1_000, 5_000, "true")); // ends 6000
        agg.record(&sample("A", 2_000, 1_000, "true")); // ends 3000
        let group = agg.group("A").unwrap();
        assert_eq!(group.start_ms, 1_000);
        assert_eq!(group.end_ms, 6_000);
        assert_eq!(group.span_secs(), 5.0);
    }

    #[test]
    fn later_sample_finishing_earlier_keeps_end() {
        let mut agg = Aggregator::new();
        agg.record(&sample("A", 5_000, 0, "true"));
        agg.record(&sample("A", 1_000, 100, "true"));
        let group = agg.group("A").unwrap();
        assert_eq!(group.end_ms, 5_000);
        assert_eq!(group.span_secs(), 0.0);
    }

    #[test]
    fn assertion_counters() {
        let mut agg = Aggregator::new();
        let passing = Assertion::from_text("ok", "false", "", "false");
        let failing = Assertion::from_text("bad", "true", "nope", "false");

        agg.record(&sample("A", 1_000, 10, "true").with_assertions(vec![passing.clone(), failing]));
        agg.record(&sample("A", 1_100, 10, "true").with_assertions(vec![passing.clone()]));
        agg.record(&sample("A", 1_200, 10, "false").with_assertions(vec![passing]));

        let counters = &agg.group("A").unwrap().counters;
        assert_eq!(counters.samples, 3);
        assert_eq!(counters.assertions, 4);
        assert_eq!(counters.assertions_passed, 3);
        assert_eq!(counters.successful_no_assert, 2);
        assert_eq!(counters.successful_incl_assert, 1);
        assert_eq!(counters.min_time, Some(10));
    }

    #[test]
    fn total_is_appended_last() {
        let mut agg = Aggregator::new();
        agg.record(&sample("A", 1_000, 10, "true"));
        agg.record(&sample("B", 1_100, 20, "true"));
        let (summary, groups) = agg.finish();

        let names: Vec<_> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, ["A", "B", TOTAL_LABEL]);
        assert_eq!(groups[2].index, 2);
        assert_eq!(groups[2].summary.samples, 2);
        assert_eq!(summary.samples, 2);
    }

    #[test]
    fn huge_durations_accumulate_without_overflow() {
        let huge = i64::MAX as u64;
        let mut agg = Aggregator::new();
        for ts in [1_000, 2_000, 3_000] {
            agg.record(&sample("A", ts, huge, "true"));
        }

        let group = agg.group("A").unwrap();
        assert_eq!(group.counters.time_sum, 3 * u128::from(huge));
        assert_eq!(group.byte_sum, 300);
        assert_eq!(group.end_ms, i64::MAX);
        assert!(group.span_secs() > 0.0);

        let (summary, groups) = agg.finish();
        assert_eq!(summary.max_time, huge);
        assert!(groups[0].total_time_secs > 0.0);
        assert_eq!(groups[0].percentiles.median, huge);
    }

    #[test]
    fn empty_aggregator_has_no_groups() {
        let (summary, groups) = Aggregator::new().finish();
        assert!(groups.is_empty());
        assert_eq!(summary.samples, 0);
        assert_eq!(summary.mean_time, 0.0);
    }
}
