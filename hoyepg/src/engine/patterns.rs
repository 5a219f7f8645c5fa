use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;

/// Keys whose presence marks a script body as guide data.
const GUIDE_MARKERS: &[&str] = &["\"programme\"", "\"program\"", "\"programGuide\""];

/// How many `{` that do not start valid JSON to tolerate while looking
/// outward for the object enclosing a bare `"programme"` key.
const MAX_BLOB_PARSE_FAILURES: usize = 64;

/// Where an embedded JSON document was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    /// `programGuide = {...};` and similar inline assignments.
    Assignment,
    /// A `<script>` element whose whole body is JSON.
    ScriptBlock,
    /// A bare object somewhere in the page containing `"programme": [`.
    Blob,
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternKind::Assignment => write!(f, "inline assignment"),
            PatternKind::ScriptBlock => write!(f, "script block"),
            PatternKind::Blob => write!(f, "programme blob"),
        }
    }
}

/// A parsed JSON document that may hold the guide.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub kind: PatternKind,
    pub doc: Value,
}

/// Search an HTML page for embedded guide JSON.
///
/// Candidates come back in priority order (assignments, then script blocks,
/// then bare blobs) and in document order within each kind. Text that looks
/// like a match but does not parse is skipped.
pub fn find_candidates(html: &str) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    for doc in find_assignments(html) {
        debug!("Found guide JSON via inline assignment");
        candidates.push(Candidate {
            kind: PatternKind::Assignment,
            doc,
        });
    }

    for doc in find_script_blocks(html) {
        debug!("Found guide JSON inside <script> block");
        candidates.push(Candidate {
            kind: PatternKind::ScriptBlock,
            doc,
        });
    }

    for doc in find_blobs(html) {
        debug!("Found JSON blob containing \"programme\"");
        candidates.push(Candidate {
            kind: PatternKind::Blob,
            doc,
        });
    }

    candidates
}

// ── Assignments ──────────────────────────────────────────────────────────────

fn assignment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?:\bprogramGuide|window\.__INITIAL_STATE__|window\.__PRELOADED_STATE__)\s*=\s*",
        )
        .expect("assignment pattern is valid")
    })
}

fn find_assignments(html: &str) -> Vec<Value> {
    assignment_regex()
        .find_iter(html)
        .filter_map(|m| parse_leading_json(&html[m.end()..]))
        .filter(|(value, _)| value.is_object() || value.is_array())
        .map(|(value, _)| value)
        .collect()
}

// ── Script blocks ────────────────────────────────────────────────────────────

fn find_script_blocks(html: &str) -> Vec<Value> {
    let Ok(selector) = Selector::parse("script") else {
        return Vec::new();
    };
    let document = Html::parse_document(html);

    document
        .select(&selector)
        .filter_map(|element| {
            let body = element.text().collect::<String>();
            let body = body.trim();

            if !(body.starts_with('{') || body.starts_with('[')) {
                return None;
            }
            if !GUIDE_MARKERS.iter().any(|marker| body.contains(marker)) {
                return None;
            }

            match serde_json::from_str::<Value>(body) {
                Ok(value) => Some(value),
                Err(e) => {
                    debug!("Script block looked like guide JSON but failed to parse: {}", e);
                    None
                }
            }
        })
        .collect()
}

// ── Blobs ────────────────────────────────────────────────────────────────────

fn blob_marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""programme"\s*:\s*\["#).expect("blob pattern is valid"))
}

/// Recover the outermost balanced JSON object around each `"programme": [`.
fn find_blobs(html: &str) -> Vec<Value> {
    let mut blobs = Vec::new();
    let mut covered_until = 0;

    for marker in blob_marker_regex().find_iter(html) {
        if marker.start() < covered_until {
            continue;
        }

        let mut best: Option<(Value, usize)> = None;
        let mut search_end = marker.start();
        let mut failures = 0;

        while failures < MAX_BLOB_PARSE_FAILURES {
            let Some(open) = html[..search_end].rfind('{') else {
                break;
            };
            search_end = open;

            match parse_leading_json(&html[open..]) {
                Some((value, len)) => {
                    // Siblings that close before the marker are skipped over.
                    if value.is_object() && open + len > marker.end() {
                        best = Some((value, open + len));
                    }
                }
                None => failures += 1,
            }
        }

        if let Some((value, end)) = best {
            covered_until = end;
            blobs.push(value);
        }
    }

    blobs
}

/// Parse the JSON value at the start of `s`, ignoring whatever follows it.
/// Returns the value and the number of bytes it spans.
fn parse_leading_json(s: &str) -> Option<(Value, usize)> {
    let mut stream = serde_json::Deserializer::from_str(s).into_iter::<Value>();
    match stream.next() {
        Some(Ok(value)) => Some((value, stream.byte_offset())),
        _ => None,
    }
}
