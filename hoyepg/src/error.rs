use std::time::Duration;

use thiserror::Error;

/// Static page fetch failures. Recovered by the strategy that hit them.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to '{url}' failed: {message}")]
    Request { url: String, message: String },
    #[error("request to '{url}' returned status {status}")]
    Status { url: String, status: u16 },
    #[error("failed to read body from '{url}': {message}")]
    Body { url: String, message: String },
}

/// Headless browser failures.
///
/// `Unavailable` and `Launch` mean no rendered HTML exists for this run, so
/// every strategy that depends on it is skipped.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("headless rendering is disabled")]
    Unavailable,
    #[error("failed to launch browser: {0}")]
    Launch(String),
    #[error("navigation to '{url}' failed: {message}")]
    Navigation { url: String, message: String },
    #[error("navigation to '{url}' timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },
    #[error("failed to capture rendered document: {0}")]
    Capture(String),
}

impl RenderError {
    /// Whether the render environment itself is missing, as opposed to a
    /// single page load going wrong.
    pub fn is_environment(&self) -> bool {
        matches!(self, RenderError::Unavailable | RenderError::Launch(_))
    }
}

/// Pattern mismatches while looking for schedule data in a document.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no embedded guide JSON found in document")]
    NoEmbeddedJson,
    #[error(
        "embedded guide JSON contained no usable programmes \
         ({candidates} candidate(s), {dropped} item(s) dropped)"
    )]
    NoProgrammes { candidates: usize, dropped: usize },
    #[error("no guide table rows found in document")]
    NoTableRows,
}

/// Failure of a single strategy. Never fatal to the run.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Per-entry validation failure. The offending entry is dropped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EntryError {
    #[error("missing field '{0}'")]
    MissingField(&'static str),
    #[error("malformed timestamp '{0}'")]
    MalformedTimestamp(String),
    #[error("programme ends before it starts ({start} >= {stop})")]
    InvertedRange { start: String, stop: String },
    #[error("channel '{0}' is not in the registry")]
    UnknownChannel(String),
}

/// Registry construction failures. These are setup errors and abort the run.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("channel registry is empty")]
    Empty,
    #[error("duplicate channel id '{0}'")]
    DuplicateId(String),
    #[error("duplicate channel name '{0}'")]
    DuplicateName(String),
    #[error("channel entry has an empty {0}")]
    EmptyField(&'static str),
}
