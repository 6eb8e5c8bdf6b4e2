use serde::Serialize;

/// One executed request, as recorded by the load-test tool.
///
/// Built only through [`RawSample::validate`], so every `Sample` in a
/// report carries all ten core fields with well-formed numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sample {
    /// Start of the request, epoch milliseconds.
    pub timestamp_ms: i64,
    /// Elapsed (response) time in milliseconds.
    pub elapsed_ms: u64,
    pub label: String,
    pub response_code: String,
    pub response_message: String,
    pub thread_name: String,
    pub data_type: String,
    /// Raw status text; `"true"` means the request itself succeeded.
    pub status: String,
    pub bytes: u64,
    pub latency_ms: u64,
    /// Thread counts, present only in the extended record layout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extended: Option<ExtendedFields>,
    pub assertions: Vec<Assertion>,
}

/// Active thread counts carried by the 12-column / `ng`+`na` layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtendedFields {
    /// Active threads in this sample's thread group (`ng`).
    pub group_threads: String,
    /// Active threads across all groups (`na`).
    pub all_threads: String,
}

/// One correctness check attached to a sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assertion {
    pub name: String,
    pub failure: bool,
    pub failure_message: String,
    pub error: bool,
}

impl Assertion {
    /// Builds an assertion from the text of its sub-elements. Only the
    /// exact text `true` sets a flag.
    pub fn from_text(name: &str, failure: &str, failure_message: &str, error: &str) -> Self {
        Self {
            name: name.to_owned(),
            failure: failure == "true",
            failure_message: failure_message.to_owned(),
            error: error == "true",
        }
    }

    pub fn passed(&self) -> bool {
        !self.failure && !self.error
    }
}

impl Sample {
    pub fn is_success(&self) -> bool {
        self.status == "true"
    }

    /// Own status is successful and no attached assertion failed or errored.
    pub fn is_success_including_assertions(&self) -> bool {
        self.is_success() && self.assertions.iter().all(Assertion::passed)
    }

    /// `start + elapsed`, epoch milliseconds.
    pub fn end_ms(&self) -> i64 {
        let elapsed = i64::try_from(self.elapsed_ms).unwrap_or(i64::MAX);
        self.timestamp_ms.saturating_add(elapsed)
    }

    pub fn with_assertions(mut self, assertions: Vec<Assertion>) -> Self {
        self.assertions = assertions;
        self
    }
}

// ─── Validation ──────────────────────────────────────────────────

/// The ten core fields of a record as raw text, before validation.
///
/// Both parsers fill this in from their own encoding (CSV columns or XML
/// attributes) and hand it to [`RawSample::validate`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RawSample<'a> {
    pub timestamp: &'a str,
    pub elapsed: &'a str,
    pub label: &'a str,
    pub response_code: &'a str,
    pub response_message: &'a str,
    pub thread_name: &'a str,
    pub data_type: &'a str,
    pub status: &'a str,
    pub bytes: &'a str,
    pub latency: &'a str,
    pub extended: Option<(&'a str, &'a str)>,
}

impl<'a> RawSample<'a> {
    /// Maps the ten core fields positionally, in the order the basic CSV
    /// layout writes them.
    pub fn from_core(fields: [&'a str; 10]) -> Self {
        let [timestamp, elapsed, label, response_code, response_message, thread_name, data_type, status, bytes, latency] =
            fields;
        Self {
            timestamp,
            elapsed,
            label,
            response_code,
            response_message,
            thread_name,
            data_type,
            status,
            bytes,
            latency,
            extended: None,
        }
    }

    pub fn extended(mut self, group_threads: &'a str, all_threads: &'a str) -> Self {
        self.extended = Some((group_threads, all_threads));
        self
    }

    /// Returns `None` unless the four numeric fields parse as integers.
    pub fn validate(self) -> Option<Sample> {
        let timestamp_ms = parse_int::<i64>(self.timestamp)?;
        let elapsed_ms = parse_non_negative(self.elapsed)?;
        let bytes = parse_non_negative(self.bytes)?;
        let latency_ms = parse_non_negative(self.latency)?;

        Some(Sample {
            timestamp_ms,
            elapsed_ms,
            label: self.label.to_owned(),
            response_code: self.response_code.to_owned(),
            response_message: self.response_message.to_owned(),
            thread_name: self.thread_name.to_owned(),
            data_type: self.data_type.to_owned(),
            status: self.status.to_owned(),
            bytes,
            latency_ms,
            extended: self.extended.map(|(ng, na)| ExtendedFields {
                group_threads: ng.to_owned(),
                all_threads: na.to_owned(),
            }),
            assertions: Vec::new(),
        })
    }
}

/// Integer parse tolerant of surrounding whitespace.
fn parse_int<T: std::str::FromStr>(raw: &str) -> Option<T> {
    raw.trim().parse().ok()
}

/// Non-negative count or duration that also fits an `i64`, so it can be
/// added to an epoch timestamp.
fn parse_non_negative(raw: &str) -> Option<u64> {
    parse_int::<i64>(raw).and_then(|v| u64::try_from(v).ok())
}
