use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::FixedOffset;
use include_dir::{Dir, include_dir};
use serde::Deserialize;

use crate::guide::{Channel, ChannelRegistry};
use crate::util::time::parse_offset;

/// Embedded source manifests directory.
static SOURCES_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/sources");

/// A source manifest: where the guide lives and which channels to publish.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    pub source: Source,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub output: OutputConfig,
    pub channels: Vec<Channel>,
}

/// Source metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct Source {
    pub id: String,
    pub name: String,
    pub url: String,
    /// Offset applied to source timestamps that carry none.
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,
    #[serde(default)]
    pub proxy: Option<String>,
    #[serde(default)]
    pub headless: Option<bool>,
}

/// Static fetch settings.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: default_fetch_timeout(),
            user_agent: None,
        }
    }
}

/// Headless browser settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Seconds to wait after navigation before capturing the document.
    #[serde(default = "default_settle")]
    pub settle: f64,
    /// Navigation timeout in seconds.
    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            settle: default_settle(),
            navigation_timeout: default_navigation_timeout(),
        }
    }
}

impl RenderConfig {
    /// Settle delay. Anything that is not a representable non-negative
    /// number of seconds is a setup error.
    pub fn settle_duration(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.settle)
            .map_err(|e| anyhow!("Invalid render settle '{}': {}", self.settle, e))
    }

    pub fn navigation_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout)
    }
}

/// Output artifact locations.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub diagnostic: Option<PathBuf>,
}

impl OutputConfig {
    /// XMLTV path, defaulting to `<source id>.xml`.
    pub fn xmltv_path(&self, source_id: &str) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{source_id}.xml")))
    }

    /// Diagnostic dump path, defaulting to the given XMLTV path with a
    /// `.debug.html` extension.
    pub fn diagnostic_path(&self, xmltv: &Path) -> PathBuf {
        self.diagnostic
            .clone()
            .unwrap_or_else(|| xmltv.with_extension("debug.html"))
    }
}

fn default_utc_offset() -> String {
    "+08:00".to_string()
}

fn default_fetch_timeout() -> u64 {
    20
}

fn default_settle() -> f64 {
    5.0
}

fn default_navigation_timeout() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

impl Manifest {
    /// Build the channel registry. Invalid registries are setup errors.
    pub fn registry(&self) -> Result<ChannelRegistry> {
        ChannelRegistry::new(self.channels.clone())
            .with_context(|| format!("Invalid channel registry in source '{}'", self.source.id))
    }

    /// Fixed offset for timestamps without one.
    pub fn fallback_offset(&self) -> Result<FixedOffset> {
        parse_offset(&self.source.utc_offset).ok_or_else(|| {
            anyhow!(
                "Invalid utc_offset '{}' in source '{}'",
                self.source.utc_offset,
                self.source.id
            )
        })
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch.timeout)
    }
}

fn parse_manifest(content: &str, origin: &Path) -> Result<Manifest> {
    serde_yaml::from_str(content).map_err(|e| anyhow!("Failed to parse {:?}: {}", origin, e))
}

/// Load all embedded source manifests.
pub fn load_all() -> Result<Vec<Manifest>> {
    let mut manifests = Vec::new();

    for file in SOURCES_DIR.files() {
        let path = file.path();
        if path
            .extension()
            .map(|e| e == "yaml" || e == "yml")
            .unwrap_or(false)
        {
            let content = file
                .contents_utf8()
                .ok_or_else(|| anyhow!("Failed to read {:?} as UTF-8", path))?;

            manifests.push(parse_manifest(content, path)?);
        }
    }

    Ok(manifests)
}

/// Load a manifest from a YAML file on disk.
pub fn load_file(path: &Path) -> Result<Manifest> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    parse_manifest(&content, path)
}

/// Find an embedded source manifest by ID (case-insensitive, partial match).
pub fn find_by_id(id: &str) -> Result<Manifest> {
    let manifests = load_all()?;
    let id_lower = id.to_lowercase();

    if let Some(manifest) = manifests
        .iter()
        .find(|m| m.source.id.to_lowercase() == id_lower)
    {
        return Ok(manifest.clone());
    }

    if let Some(manifest) = manifests
        .iter()
        .find(|m| m.source.id.to_lowercase().contains(&id_lower))
    {
        return Ok(manifest.clone());
    }

    Err(anyhow!("Source '{}' not found", id))
}

/// List all embedded sources as `(id, name)`.
pub fn list_sources() -> Result<Vec<(String, String)>> {
    let manifests = load_all()?;
    Ok(manifests
        .into_iter()
        .map(|m| (m.source.id, m.source.name))
        .collect())
}
