use std::path::Path;

use async_trait::async_trait;
use serde::Serialize;

use super::Exporter;
use crate::error::{AnalysisError, Result};
use crate::report::{Report, RunMetadata};
use crate::Analysis;

/// Writes the whole report, run metadata included, as one JSON document.
#[derive(Debug, Clone, Default)]
pub struct JsonExporter {
    pub pretty: bool,
}

#[derive(Serialize)]
struct Document<'a> {
    run: &'a RunMetadata,
    report: &'a Report,
}

impl JsonExporter {
    pub fn render(&self, analysis: &Analysis) -> serde_json::Result<String> {
        let doc = Document {
            run: &analysis.meta,
            report: &analysis.report,
        };
        if self.pretty {
            serde_json::to_string_pretty(&doc)
        } else {
            serde_json::to_string(&doc)
        }
    }
}

#[async_trait]
impl Exporter for JsonExporter {
    fn name(&self) -> &'static str {
        "json"
    }

    fn suffix(&self) -> &'static str {
        ".json"
    }

    async fn export(&self, analysis: &Analysis, target: &Path) -> Result<()> {
        let json = self
            .render(analysis)
            .map_err(|e| AnalysisError::persistence(self.name(), target, e))?;
        tokio::fs::write(target, json)
            .await
            .map_err(|e| AnalysisError::persistence(self.name(), target, e))
    }
}
