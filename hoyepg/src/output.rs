use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::engine::{ChainOutcome, Strategy};
use crate::guide::{ChannelRegistry, Schedule};
use crate::xmltv;

/// Where a run writes its artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub xmltv: PathBuf,
    pub diagnostic: PathBuf,
}

/// Summary of what a run published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub channels: usize,
    pub programmes: usize,
    pub winner: Option<Strategy>,
    pub diagnostic: Option<PathBuf>,
}

impl RunReport {
    pub fn is_channels_only(&self) -> bool {
        self.programmes == 0
    }
}

/// Build the schedule for a chain outcome.
///
/// The channel list always comes from the registry. An empty outcome yields a
/// channels-only schedule, which is a normal result rather than a failure.
pub fn build_schedule(registry: &ChannelRegistry, outcome: &ChainOutcome) -> Schedule {
    let channels = registry.channels().to_vec();
    if outcome.is_empty() {
        Schedule::channels_only(channels)
    } else {
        Schedule::new(channels, outcome.entries.clone())
    }
}

/// Serialize and write the XMLTV artifact, plus the diagnostic HTML dump when
/// nothing was extracted.
///
/// Only failing to write the XMLTV file is an error.
pub async fn publish(
    registry: &ChannelRegistry,
    outcome: &ChainOutcome,
    paths: &ArtifactPaths,
) -> Result<RunReport> {
    let schedule = build_schedule(registry, outcome);
    let document = xmltv::serialize(&schedule);

    write_artifact(&paths.xmltv, &document)
        .await
        .with_context(|| format!("Failed to write XMLTV output to {:?}", paths.xmltv))?;

    let mut diagnostic = None;

    if schedule.is_channels_only() {
        warn!(
            "No programmes extracted; wrote channels-only XMLTV ({} channels) to {}",
            schedule.channels().len(),
            paths.xmltv.display()
        );

        match &outcome.last_html {
            Some(html) => match write_artifact(&paths.diagnostic, html).await {
                Ok(()) => {
                    info!("Saved page HTML for inspection to {}", paths.diagnostic.display());
                    diagnostic = Some(paths.diagnostic.clone());
                }
                Err(e) => warn!(
                    "Failed to write diagnostic HTML to {}: {}",
                    paths.diagnostic.display(),
                    e
                ),
            },
            None => info!("No page HTML was retrieved, skipping diagnostic dump"),
        }
    } else {
        info!(
            "Wrote {} programmes across {} channels to {}",
            schedule.programmes().len(),
            schedule.channels().len(),
            paths.xmltv.display()
        );
    }

    Ok(RunReport {
        channels: schedule.channels().len(),
        programmes: schedule.programmes().len(),
        winner: outcome.winner,
        diagnostic,
    })
}

async fn write_artifact(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, contents).await
}
