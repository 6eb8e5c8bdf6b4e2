//! Post-scan derivation of every reported statistic.
//!
//! Runs strictly after aggregation, consuming the accumulators. The mean
//! response time is rounded before the standard deviation reads it.

use super::collector::{GroupAccumulator, SummaryAccumulator};
use super::distribution::compute_distribution;
use super::percentiles::{round_to, PercentileSet};
use crate::report::{group_link, AggregatedGroup, AggregatedSummary};

/// `count * 100 / denominator`, unrounded; `None` when the denominator is 0.
fn percent(count: u64, denominator: u64) -> Option<f64> {
    (denominator > 0).then(|| count as f64 * 100.0 / denominator as f64)
}

pub fn summary(acc: &SummaryAccumulator) -> AggregatedSummary {
    let rate = |count| percent(count, acc.samples).map_or(0.0, |r| round_to(r, 2));

    AggregatedSummary {
        samples: acc.samples,
        assertions: acc.assertions,
        success_rate: rate(acc.successful_no_assert),
        success_rate_incl_assertions: rate(acc.successful_incl_assert),
        assertion_pass_rate: percent(acc.assertions_passed, acc.assertions)
            .map_or(0.0, |r| round_to(r, 2)),
        mean_time: if acc.samples > 0 {
            round_to(acc.time_sum as f64 / acc.samples as f64, 2)
        } else {
            0.0
        },
        min_time: acc.min_time,
        max_time: acc.max_time,
    }
}

pub fn group(acc: GroupAccumulator, index: usize, is_total: bool) -> AggregatedGroup {
    let summary = summary(&acc.counters);
    let n = acc.counters.samples;
    let span = acc.span_secs();

    let error = |count| percent(count, n).map_or(0.0, |r| round_to(100.0 - r, 2));

    // Without a positive span nothing is divided: bytes/sec keeps the raw
    // byte total and the per-second figures stay at 0.
    let (throughput, bytes_per_sec, kb_per_sec) = if span > 0.0 {
        let bytes_per_sec = acc.byte_sum as f64 / span;
        (
            round_to(n as f64 / span, 2),
            bytes_per_sec,
            round_to(bytes_per_sec / 1000.0, 1),
        )
    } else {
        (0.0, acc.byte_sum as f64, 0.0)
    };

    let mean_bytes = if n > 0 {
        round_to(acc.byte_sum as f64 / n as f64, 1)
    } else {
        0.0
    };

    let percentiles = if acc.times.is_empty() {
        PercentileSet::empty()
    } else {
        PercentileSet::from_times(&acc.times, summary.mean_time)
    };

    AggregatedGroup {
        link: group_link(index, is_total),
        name: acc.name,
        index,
        error_rate: error(acc.counters.successful_no_assert),
        error_rate_incl_assertions: error(acc.counters.successful_incl_assert),
        start_time_ms: acc.start_ms,
        end_time_ms: acc.end_ms,
        total_time_secs: span,
        throughput,
        mean_bytes,
        bytes_per_sec,
        kb_per_sec,
        percentiles,
        distribution: compute_distribution(&acc.times),
        times: acc.times,
        summary,
    }
}
