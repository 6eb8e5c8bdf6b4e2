use std::path::Path;

use serde::Deserialize;

use crate::export::{Exporter, HtmlExporter, JsonExporter, ReportSections, SqlExporter};
use crate::parse::{AnalysisOptions, DEFAULT_BATCH_SIZE};

// ─── Settings file ───────────────────────────────────────────────

/// Settings read from an optional TOML file. Every field has a default,
/// so an empty file is valid.
///
/// ```toml
/// disable = 4        # no response-time section
/// html = true
/// sql = false
/// json = true
/// batch_size = 500
/// pretty_json = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// HTML sections to turn off, one bit per section.
    #[serde(default)]
    pub disable: u8,

    #[serde(default = "default_html")]
    pub html: bool,

    #[serde(default = "default_sql")]
    pub sql: bool,

    #[serde(default)]
    pub json: bool,

    /// Records between cancellation checks.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_pretty_json")]
    pub pretty_json: bool,
}

fn default_html() -> bool {
    true
}
fn default_sql() -> bool {
    true
}
fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}
fn default_pretty_json() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            disable: 0,
            html: default_html(),
            sql: default_sql(),
            json: false,
            batch_size: default_batch_size(),
            pretty_json: default_pretty_json(),
        }
    }
}

/// Values given on the command line. `None` keeps the file's value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub disable: Option<u8>,
    pub html: Option<bool>,
    pub sql: Option<bool>,
    pub json: Option<bool>,
    pub batch_size: Option<usize>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read settings file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{0}")]
    Invalid(String),
}

impl Settings {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Applies command-line values on top of these settings.
    pub fn merge(mut self, overrides: &Overrides) -> Result<Self, ConfigError> {
        if let Some(disable) = overrides.disable {
            self.disable = disable;
        }
        if let Some(html) = overrides.html {
            self.html = html;
        }
        if let Some(sql) = overrides.sql {
            self.sql = sql;
        }
        if let Some(json) = overrides.json {
            self.json = json;
        }
        if let Some(batch_size) = overrides.batch_size {
            self.batch_size = batch_size;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be at least 1".into()));
        }
        if self.disable > 0b1111 {
            return Err(ConfigError::Invalid("disable must be between 0 and 15".into()));
        }
        Ok(())
    }

    pub fn analysis_options(&self) -> AnalysisOptions {
        AnalysisOptions {
            batch_size: self.batch_size,
            cancel: None,
        }
    }

    /// Exporters to run, in HTML, SQL, JSON order.
    pub fn exporters(&self) -> Vec<Box<dyn Exporter>> {
        let mut out: Vec<Box<dyn Exporter>> = Vec::new();
        if self.html {
            out.push(Box::new(HtmlExporter::new(ReportSections::from_disable_mask(
                self.disable,
            ))));
        }
        if self.sql {
            out.push(Box::new(SqlExporter));
        }
        if self.json {
            out.push(Box::new(JsonExporter {
                pretty: self.pretty_json,
            }));
        }
        out
    }
}
