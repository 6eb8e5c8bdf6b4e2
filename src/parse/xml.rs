use roxmltree::{Document, Node};
use tracing::debug;

use super::AnalysisOptions;
use crate::error::{AnalysisError, Result};
use crate::record::{Assertion, RawSample, Sample};

const CONTAINER: &str = "testResults";

/// Parses an XML result document into samples, in document order.
///
/// Every element child of the `testResults` container is a candidate
/// sample; children missing a required attribute or carrying a
/// non-integer numeric attribute are skipped. Every element child of a
/// sample becomes one [`Assertion`].
pub fn parse(content: &str, options: &AnalysisOptions) -> Result<Vec<Sample>> {
    let document = Document::parse(content)?;

    let Some(container) = document
        .descendants()
        .find(|node| node.has_tag_name(CONTAINER))
    else {
        debug!("no {CONTAINER} element in document");
        return Err(AnalysisError::NoSamplesFound);
    };

    let mut samples = Vec::new();
    let mut skipped = 0usize;

    for (index, node) in container.children().filter(Node::is_element).enumerate() {
        options.checkpoint(index)?;

        match sample_from_element(node) {
            Some(sample) => samples.push(sample),
            None => {
                debug!(
                    element = node.tag_name().name(),
                    position = index,
                    "skipping invalid sample element"
                );
                skipped += 1;
            }
        }
    }

    debug!(parsed = samples.len(), skipped, "xml log scanned");

    if samples.is_empty() {
        return Err(AnalysisError::NoSamplesFound);
    }
    Ok(samples)
}

fn sample_from_element(node: Node<'_, '_>) -> Option<Sample> {
    let attr = |name: &str| node.attribute(name);

    let mut raw = RawSample {
        timestamp: attr("ts")?,
        elapsed: attr("t")?,
        label: attr("lb")?,
        response_code: attr("rc")?,
        response_message: attr("rm")?,
        thread_name: attr("tn")?,
        data_type: attr("dt")?,
        status: attr("s")?,
        bytes: attr("by")?,
        latency: attr("lt")?,
        extended: None,
    };
    if let (Some(ng), Some(na)) = (attr("ng"), attr("na")) {
        raw = raw.extended(ng, na);
    }

    let assertions = node
        .children()
        .filter(Node::is_element)
        .map(|child| {
            Assertion::from_text(
                &field_text(child, "name"),
                &field_text(child, "failure"),
                &field_text(child, "failureMessage"),
                &field_text(child, "error"),
            )
        })
        .collect();

    raw.validate().map(|sample| sample.with_assertions(assertions))
}

/// Text of the first descendant named `tag`, or empty when absent.
fn field_text(node: Node<'_, '_>, tag: &str) -> String {
    node.descendants()
        .skip(1)
        .find(|n| n.has_tag_name(tag))
        .map(|n| {
            n.descendants()
                .filter(Node::is_text)
                .filter_map(|t| t.text())
                .collect()
        })
        .unwrap_or_default()
}
