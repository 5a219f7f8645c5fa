use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use crate::output::{self, ArtifactPaths};

use super::SourceArgs;

#[derive(Parser, Debug, Default)]
pub struct RunCommand {
    #[command(flatten)]
    pub source: SourceArgs,

    /// XMLTV output path (overrides the manifest)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Where to dump page HTML when nothing could be extracted
    #[arg(long, value_name = "PATH")]
    pub diagnostic: Option<PathBuf>,
}

impl RunCommand {
    /// Extraction problems never fail the run; a channels-only document is
    /// written instead. Only setup errors and an unwritable output path
    /// produce an error.
    pub async fn run(self) -> Result<()> {
        let prepared = self.source.prepare()?;
        let source_id = prepared.manifest.source.id.as_str();

        let xmltv = self
            .output
            .unwrap_or_else(|| prepared.manifest.output.xmltv_path(source_id));
        let diagnostic = self
            .diagnostic
            .unwrap_or_else(|| prepared.manifest.output.diagnostic_path(&xmltv));
        let paths = ArtifactPaths { xmltv, diagnostic };

        let outcome = prepared.run_chain().await;
        let report = output::publish(&prepared.registry, &outcome, &paths).await?;

        match report.winner {
            Some(strategy) => info!(
                "Done: {} programmes via strategy {}",
                report.programmes, strategy
            ),
            None => info!("Done: channels-only output ({} channels)", report.channels),
        }

        Ok(())
    }
}
