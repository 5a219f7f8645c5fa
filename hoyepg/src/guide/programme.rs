use std::collections::BTreeSet;

use chrono::FixedOffset;
use serde_json::Value;
use tracing::debug;

use crate::error::EntryError;
use crate::util::time;

use super::registry::ChannelRegistry;
use super::types::ProgrammeEntry;

const START_KEYS: &[&str] = &["start", "startTime", "start_time"];
const END_KEYS: &[&str] = &["end", "stop", "endTime", "end_time"];
const DESCRIPTION_KEYS: &[&str] = &["description", "desc", "subtitle"];

/// A programme item as found in the source JSON, paired with the name of
/// the channel object that contained it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawProgramme<'a> {
    pub channel_name: Option<&'a str>,
    pub item: &'a Value,
}

/// Counts from turning raw items into entries.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub accepted: usize,
    pub dropped: usize,
    /// Source channel names with no registry entry.
    pub unknown_channels: BTreeSet<String>,
}

impl ProgrammeEntry {
    /// Validate one raw item against the registry.
    pub fn from_raw(
        raw: &RawProgramme<'_>,
        registry: &ChannelRegistry,
        fallback_offset: FixedOffset,
    ) -> Result<Self, EntryError> {
        let channel_name = raw
            .channel_name
            .ok_or(EntryError::MissingField("channel"))?;
        let channel = registry
            .lookup(channel_name)
            .ok_or_else(|| EntryError::UnknownChannel(channel_name.to_string()))?;

        let title = field(raw.item, &["title"]).ok_or(EntryError::MissingField("title"))?;
        let start_raw = field(raw.item, START_KEYS).ok_or(EntryError::MissingField("start"))?;
        let stop_raw = field(raw.item, END_KEYS).ok_or(EntryError::MissingField("end"))?;

        let start = time::normalize(&start_raw, fallback_offset)
            .map_err(|e| EntryError::MalformedTimestamp(e.0))?;
        let stop = time::normalize(&stop_raw, fallback_offset)
            .map_err(|e| EntryError::MalformedTimestamp(e.0))?;

        if start >= stop {
            return Err(EntryError::InvertedRange {
                start: start_raw,
                stop: stop_raw,
            });
        }

        Ok(Self {
            channel_id: channel.id.clone(),
            start,
            stop,
            title,
            description: field(raw.item, DESCRIPTION_KEYS),
        })
    }
}

/// Turn raw items into validated entries, dropping the ones that fail.
///
/// Order is preserved. Nothing is sorted or deduplicated.
pub fn build_entries(
    raws: &[RawProgramme<'_>],
    registry: &ChannelRegistry,
    fallback_offset: FixedOffset,
) -> (Vec<ProgrammeEntry>, BuildReport) {
    let mut entries = Vec::with_capacity(raws.len());
    let mut report = BuildReport::default();

    for raw in raws {
        match ProgrammeEntry::from_raw(raw, registry, fallback_offset) {
            Ok(entry) => {
                report.accepted += 1;
                entries.push(entry);
            }
            Err(e) => {
                debug!("Dropping programme item: {}", e);
                report.dropped += 1;
                if let EntryError::UnknownChannel(name) = e {
                    report.unknown_channels.insert(name);
                }
            }
        }
    }

    (entries, report)
}

/// First non-empty string or number among `keys`.
fn field(item: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match item.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
