use std::fmt::{self, Write};
use std::path::Path;

use async_trait::async_trait;

use super::{Exporter, ReportSections, Section};
use crate::error::{AnalysisError, Result};
use crate::record::Sample;
use crate::report::{format_epoch_ms, AggregatedGroup};
use crate::Analysis;

const STYLE: &str = r#"
body { font-family: Arial, sans-serif; margin: 0; }
#menu { position: fixed; top: 0; width: 100%; background: #00A3CC; padding: 6px 10px; }
#menu a { color: #fff; margin-right: 18px; text-decoration: none; font-weight: bold; }
#belowmenu { margin: 48px 12px 12px 12px; }
.navifont { font-size: 1.3em; font-weight: bold; color: #00A3CC; }
table.samples { width: 100%; border-collapse: collapse; margin-bottom: 16px; }
table.samples td, table.samples th { border: 1px solid #00A3CC; padding: 3px 7px 2px 7px; }
table.samples th { text-align: left; background: #00A3CC; color: #fff; }
table.samples tr.even td { background: #D1EEF6; }
table.assertions { width: 100%; border-collapse: collapse; font-size: 0.85em; }
table.assertions td, table.assertions th { border: 1px solid #AADAEB; padding: 2px 6px; }
table.assertions th { background: #AADAEB; color: #fff; text-align: left; }
.bar { background: #00A3CC; height: 14px; }
"#;

/// Renders a self-contained HTML document. No script, no external assets.
#[derive(Debug, Clone, Default)]
pub struct HtmlExporter {
    pub sections: ReportSections,
}

impl HtmlExporter {
    pub fn new(sections: ReportSections) -> Self {
        Self { sections }
    }

    pub fn render(&self, analysis: &Analysis) -> std::result::Result<String, fmt::Error> {
        let mut out = String::with_capacity(64 * 1024);
        let s = self.sections;

        out.push_str("<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\">");
        out.push_str("<title>JMeter log report</title><style>");
        out.push_str(STYLE);
        out.push_str("</style></head><body>\n");

        self.navigation(&mut out)?;
        out.push_str("<div id=\"belowmenu\">\n");
        run_info(&mut out, analysis)?;
        summary_report(&mut out, analysis)?;
        if s.shows(Section::AggregateReport) {
            aggregate_report(&mut out, analysis)?;
        }
        if s.shows(Section::LabelSamples) {
            label_samples(&mut out, analysis)?;
        }
        if s.shows(Section::ResponseTimes) {
            response_times(&mut out, analysis)?;
        }
        if s.shows(Section::AllSamples) {
            out.push_str("<a id=\"samples_\"><p class=\"navifont\">All samples</p></a>\n");
            samples_table(&mut out, analysis.report.samples.iter())?;
        }
        out.push_str("</div></body></html>\n");
        Ok(out)
    }

    fn navigation(&self, out: &mut String) -> fmt::Result {
        let s = self.sections;
        out.push_str("<div id=\"menu\"><a href=\"#sumrep\">Summary report</a>");
        for (section, anchor, title) in [
            (Section::AggregateReport, "aggrrep", "Aggregated report"),
            (Section::LabelSamples, "aggrsam", "Aggregated samples"),
            (Section::ResponseTimes, "respgr", "Response times"),
            (Section::AllSamples, "samples_", "All samples"),
        ] {
            if s.shows(section) {
                write!(out, "<a href=\"#{anchor}\">{title}</a>")?;
            }
        }
        out.push_str("</div>\n");
        Ok(())
    }
}

#[async_trait]
impl Exporter for HtmlExporter {
    fn name(&self) -> &'static str {
        "html"
    }

    fn suffix(&self) -> &'static str {
        ".html"
    }

    async fn export(&self, analysis: &Analysis, target: &Path) -> Result<()> {
        let html = self
            .render(analysis)
            .map_err(|e| AnalysisError::persistence(self.name(), target, e))?;
        tokio::fs::write(target, html)
            .await
            .map_err(|e| AnalysisError::persistence(self.name(), target, e))
    }
}

// ─── Sections ────────────────────────────────────────────────────

fn run_info(out: &mut String, analysis: &Analysis) -> fmt::Result {
    let sum = &analysis.report.summary;
    write!(
        out,
        "<p>File <i>{}</i> ({} format) parsed and converted on {}. Run id {}.</p>\n",
        escape(&analysis.meta.log_display()),
        analysis.report.format,
        analysis.meta.timestamp(),
        analysis.meta.run_id,
    )?;
    out.push_str(
        "<table class=\"samples\"><tr><th>Samples</th><th>Assertions</th>\
         <th>Success rate</th><th>Success rate incl. assertions</th>\
         <th>Assertion pass rate</th><th>Average</th><th>Min</th><th>Max</th></tr>\n",
    );
    write!(
        out,
        "<tr><td>{}</td><td>{}</td><td>{:.2} %</td><td>{:.2} %</td><td>{:.2} %</td>\
         <td>{:.2} ms</td><td>{} ms</td><td>{} ms</td></tr></table>\n",
        sum.samples,
        sum.assertions,
        sum.success_rate,
        sum.success_rate_incl_assertions,
        sum.assertion_pass_rate,
        sum.mean_time,
        opt(sum.min_time),
        sum.max_time,
    )
}

fn summary_report(out: &mut String, analysis: &Analysis) -> fmt::Result {
    out.push_str("<a id=\"sumrep\"><p class=\"navifont\">Summary report</p></a>\n");
    out.push_str(
        "<table class=\"samples\"><tr><th>Label</th><th>Samples</th><th>Average</th>\
         <th>Min</th><th>Max</th><th>Std. dev.</th><th>Error</th><th>Error incl. assertions</th>\
         <th>Throughput</th><th>KB/sec</th><th>Avg. bytes</th></tr>\n",
    );
    for g in &analysis.report.groups {
        write!(
            out,
            "<tr><td>{}</td><td>{}</td><td>{:.2} ms</td><td>{} ms</td><td>{} ms</td>\
             <td>{:.1}</td><td>{:.2} %</td><td>{:.2} %</td><td>{:.2}/sec</td>\
             <td>{:.1} KB/sec</td><td>{:.1}</td></tr>\n",
            label_link(g),
            g.summary.samples,
            g.summary.mean_time,
            opt(g.summary.min_time),
            g.summary.max_time,
            g.percentiles.std_dev,
            g.error_rate,
            g.error_rate_incl_assertions,
            g.throughput,
            g.kb_per_sec,
            g.mean_bytes,
        )?;
    }
    out.push_str("</table>\n");
    Ok(())
}

fn aggregate_report(out: &mut String, analysis: &Analysis) -> fmt::Result {
    out.push_str("<a id=\"aggrrep\"><p class=\"navifont\">Aggregated report</p></a>\n");
    out.push_str(
        "<table class=\"samples\"><tr><th>Label</th><th>Samples</th><th>Average</th>\
         <th>Median</th><th>90% line</th><th>Min</th><th>Max</th><th>Error</th>\
         <th>Error incl. assertions</th><th>Throughput</th><th>KB/sec</th></tr>\n",
    );
    for g in &analysis.report.groups {
        write!(
            out,
            "<tr><td>{}</td><td>{}</td><td>{:.2} ms</td><td>{} ms</td><td>{} ms</td>\
             <td>{} ms</td><td>{} ms</td><td>{:.2} %</td><td>{:.2} %</td>\
             <td>{:.2}/sec</td><td>{:.1} KB/sec</td></tr>\n",
            label_link(g),
            g.summary.samples,
            g.summary.mean_time,
            g.percentiles.median,
            g.percentiles.p90,
            opt(g.summary.min_time),
            g.summary.max_time,
            g.error_rate,
            g.error_rate_incl_assertions,
            g.throughput,
            g.kb_per_sec,
        )?;
    }
    out.push_str("</table>\n");

    // Bar rows for average, median, 90% line, min and max per group.
    for g in analysis.report.groups.iter().filter(|g| g.summary.samples > 1) {
        let max = g.summary.max_time.max(1) as f64;
        write!(out, "<p><b>{}</b></p><table>", escape(&g.name))?;
        for (name, value) in [
            ("Average", g.summary.mean_time),
            ("Median", g.percentiles.median as f64),
            ("90% line", g.percentiles.p90 as f64),
            ("Min", g.summary.min_time.unwrap_or(0) as f64),
            ("Max", g.summary.max_time as f64),
        ] {
            write!(
                out,
                "<tr><td>{name}</td><td style=\"width:400px\">\
                 <div class=\"bar\" style=\"width:{:.0}%\"></div></td><td>{value} ms</td></tr>",
                value / max * 100.0,
            )?;
        }
        out.push_str("</table>\n");
    }
    Ok(())
}

fn label_samples(out: &mut String, analysis: &Analysis) -> fmt::Result {
    let report = &analysis.report;
    out.push_str("<a id=\"aggrsam\"><p class=\"navifont\">Aggregated samples</p></a>\n");
    for g in report.label_groups() {
        write!(
            out,
            "<a id=\"{}\"><p class=\"navifont\">&nbsp;&nbsp;&nbsp;&nbsp;{}</p></a>\n",
            g.link,
            escape(&g.name)
        )?;
        samples_table(out, report.samples_for(&g.name))?;
    }
    Ok(())
}

fn response_times(out: &mut String, analysis: &Analysis) -> fmt::Result {
    out.push_str("<a id=\"respgr\"><p class=\"navifont\">Response times</p></a>\n");
    for g in analysis.report.groups.iter().filter(|g| g.summary.samples > 1) {
        write!(out, "<p><b>{}</b></p>\n", escape(&g.name))?;
        out.push_str("<table class=\"samples\"><tr><th>From (ms)</th><th>To (ms)</th><th>Count</th></tr>\n");
        for b in &g.distribution {
            write!(
                out,
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                b.range_start_ms, b.range_end_ms, b.count
            )?;
        }
        out.push_str("</table>\n<p class=\"series\">");
        for (i, t) in g.times.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            write!(out, "{t}")?;
        }
        out.push_str("</p>\n");
    }
    Ok(())
}

fn samples_table<'a>(out: &mut String, samples: impl Iterator<Item = &'a Sample>) -> fmt::Result {
    out.push_str(
        "<table class=\"samples\"><tr><th>Start time</th><th>Time</th><th>Label</th>\
         <th>Response code</th><th>Response message</th><th>Thread</th><th>Data type</th>\
         <th>Success</th><th>Bytes</th><th>Latency</th></tr>\n",
    );
    for (row, s) in samples.enumerate() {
        let class = if row % 2 == 1 { " class=\"even\"" } else { "" };
        write!(
            out,
            "<tr{class}><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>\
             <td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            format_epoch_ms(s.timestamp_ms),
            s.elapsed_ms,
            escape(&s.label),
            escape(&s.response_code),
            escape(&s.response_message),
            escape(&s.thread_name),
            escape(&s.data_type),
            escape(&s.status),
            s.bytes,
            s.latency_ms,
        )?;
        if !s.assertions.is_empty() {
            write!(
                out,
                "<tr{class}><td></td><td>Assertions:</td><td colspan=\"8\">\
                 <table class=\"assertions\"><tr><th>Name</th><th>Failure</th>\
                 <th>Failure message</th><th>Error</th></tr>"
            )?;
            for a in &s.assertions {
                write!(
                    out,
                    "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                    escape(&a.name),
                    a.failure,
                    escape(&a.failure_message),
                    a.error,
                )?;
            }
            out.push_str("</table></td></tr>\n");
        }
    }
    out.push_str("</table>\n");
    Ok(())
}

// ─── Helpers ─────────────────────────────────────────────────────

fn label_link(g: &AggregatedGroup) -> String {
    format!("<a href=\"#{}\">{}</a>", g.link, escape(&g.name))
}

fn opt(value: Option<u64>) -> String {
    value.map_or_else(|| "-".to_owned(), |v| v.to_string())
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
