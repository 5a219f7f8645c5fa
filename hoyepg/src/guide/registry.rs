use std::collections::HashSet;

use crate::error::RegistryError;

use super::types::Channel;

/// Immutable mapping of source channel names to XMLTV channels.
///
/// Built once at startup and shared by reference. Order is significant: it
/// is the order channels are written in, and the order rows are dealt to
/// channels when the source markup carries no channel label.
#[derive(Debug, Clone)]
pub struct ChannelRegistry {
    channels: Vec<Channel>,
}

impl ChannelRegistry {
    pub fn new(channels: Vec<Channel>) -> Result<Self, RegistryError> {
        if channels.is_empty() {
            return Err(RegistryError::Empty);
        }

        let mut ids = HashSet::new();
        let mut names = HashSet::new();

        for channel in &channels {
            if channel.id.trim().is_empty() {
                return Err(RegistryError::EmptyField("id"));
            }
            if channel.name.trim().is_empty() {
                return Err(RegistryError::EmptyField("name"));
            }
            if !ids.insert(channel.id.as_str()) {
                return Err(RegistryError::DuplicateId(channel.id.clone()));
            }
            if !names.insert(channel.name.as_str()) {
                return Err(RegistryError::DuplicateName(channel.name.clone()));
            }
        }

        Ok(Self { channels })
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Look up a channel by the name the source uses.
    ///
    /// Exact match first, then a case-insensitive match on the trimmed name.
    /// Unknown names return `None`; channels are never invented.
    pub fn lookup(&self, name: &str) -> Option<&Channel> {
        if let Some(channel) = self.channels.iter().find(|c| c.name == name) {
            return Some(channel);
        }

        let name = name.trim();
        self.channels
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Channel for the `index`-th unlabeled row, dealt round-robin.
    pub fn round_robin(&self, index: usize) -> &Channel {
        &self.channels[index % self.channels.len()]
    }
}
