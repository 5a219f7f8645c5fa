use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

/// A channel from the static registry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Channel {
    /// Display name exactly as the source labels it.
    pub name: String,
    /// XMLTV channel identifier.
    pub id: String,
    #[serde(default)]
    pub number: Option<String>,
}

impl Channel {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            number: None,
        }
    }
}

/// A single validated programme entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgrammeEntry {
    pub channel_id: String,
    pub start: DateTime<FixedOffset>,
    pub stop: DateTime<FixedOffset>,
    pub title: String,
    pub description: Option<String>,
}

/// Everything one run serializes: the registry's channels plus whatever
/// programmes the winning strategy recovered, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    channels: Vec<Channel>,
    programmes: Vec<ProgrammeEntry>,
}

impl Schedule {
    pub fn new(channels: Vec<Channel>, programmes: Vec<ProgrammeEntry>) -> Self {
        Self {
            channels,
            programmes,
        }
    }

    /// Degraded schedule used when no strategy produced anything.
    pub fn channels_only(channels: Vec<Channel>) -> Self {
        Self::new(channels, Vec::new())
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn programmes(&self) -> &[ProgrammeEntry] {
        &self.programmes
    }

    pub fn is_channels_only(&self) -> bool {
        self.programmes.is_empty()
    }
}
