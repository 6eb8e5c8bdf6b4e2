#![allow(dead_code)]

use std::fmt::Write;

use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ─── Pools ───────────────────────────────────────────────────────

static LABELS: &[&str] = &[
    "Login",
    "Browse catalogue",
    "Product details",
    "Add to cart",
    "Checkout",
    "Logout",
];

static THREAD_GROUPS: &[&str] = &["Shoppers", "Browsers", "Admins"];

static FAILURES: &[(&str, &str)] = &[
    ("500", "Internal Server Error"),
    ("503", "Service Unavailable"),
    ("404", "Not Found"),
];

const START_MS: i64 = 1_443_000_000_000;

/// One generated row, kept alongside the rendered log.
#[derive(Debug, Clone)]
pub struct GeneratedSample {
    pub timestamp_ms: i64,
    pub elapsed_ms: u64,
    pub label: &'static str,
    pub success: bool,
    pub bytes: u64,
    pub latency_ms: u64,
    pub thread: String,
    pub assertion_failed: Option<bool>,
}

/// Deterministic fake load-test run.
#[derive(Debug, Clone)]
pub struct GeneratedRun {
    pub samples: Vec<GeneratedSample>,
}

impl GeneratedRun {
    pub fn new(seed: u64, count: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut ts = START_MS;
        let samples = (0..count)
            .map(|_| {
                ts += rng.gen_range(0..250);
                let group = THREAD_GROUPS[rng.gen_range(0..THREAD_GROUPS.len())];
                let elapsed_ms = rng.gen_range(5..2_500);
                GeneratedSample {
                    timestamp_ms: ts,
                    elapsed_ms,
                    label: LABELS[rng.gen_range(0..LABELS.len())],
                    success: rng.gen_bool(0.9),
                    bytes: rng.gen_range(200..40_000),
                    latency_ms: rng.gen_range(1..=elapsed_ms),
                    thread: format!("{group} 1-{}", rng.gen_range(1..=20)),
                    assertion_failed: rng.gen_bool(0.5).then(|| rng.gen_bool(0.2)),
                }
            })
            .collect();
        Self { samples }
    }

    /// Per-label counts in first-seen order.
    pub fn label_counts(&self) -> IndexMap<&'static str, u64> {
        let mut counts = IndexMap::new();
        for s in &self.samples {
            *counts.entry(s.label).or_insert(0) += 1;
        }
        counts
    }

    /// Headerless ten-column CSV.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        for s in &self.samples {
            let (rc, rm) = status_line(s);
            writeln!(
                out,
                "{},{},{},{},{},{},text,{},{},{}",
                s.timestamp_ms, s.elapsed_ms, s.label, rc, rm, s.thread, s.success, s.bytes, s.latency_ms
            )
            .unwrap();
        }
        out
    }

    /// XML log with one assertion on roughly half of the samples.
    pub fn to_xml(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<testResults version=\"1.2\">\n");
        for s in &self.samples {
            let (rc, rm) = status_line(s);
            write!(
                out,
                "<httpSample t=\"{}\" lt=\"{}\" ts=\"{}\" s=\"{}\" lb=\"{}\" rc=\"{}\" rm=\"{}\" tn=\"{}\" dt=\"text\" by=\"{}\" ng=\"3\" na=\"9\">",
                s.elapsed_ms, s.latency_ms, s.timestamp_ms, s.success, s.label, rc, rm, s.thread, s.bytes
            )
            .unwrap();
            if let Some(failed) = s.assertion_failed {
                write!(
                    out,
                    "\n  <assertionResult><name>Response Assertion</name><failure>{failed}</failure><error>false</error><failureMessage>{}</failureMessage></assertionResult>\n",
                    if failed { "text not found" } else { "" }
                )
                .unwrap();
            }
            out.push_str("</httpSample>\n");
        }
        out.push_str("</testResults>\n");
        out
    }
}

fn status_line(s: &GeneratedSample) -> (&'static str, &'static str) {
    if s.success {
        ("200", "OK")
    } else {
        FAILURES[(s.elapsed_ms as usize) % FAILURES.len()]
    }
}
