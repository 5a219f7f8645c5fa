use std::path::PathBuf;

use anyhow::Result;
use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing::info;

use crate::engine::{
    ChainOutcome, ChainSettings, ChromeRenderer, HttpFetcher, Renderer, StrategyChain,
};
use crate::guide::ChannelRegistry;
use crate::source::{self, Manifest};
use crate::util::time;

mod list_sources;
mod run;
mod test_source;

pub use list_sources::ListSourcesCommand;
pub use run::RunCommand;
pub use test_source::TestSourceCommand;

#[derive(Parser, Debug)]
#[command(name = "hoyepg")]
#[command(about = "Scrape the HOY TV programme guide into an XMLTV file")]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Extract the guide and write the XMLTV file (default)
    Run(RunCommand),
    /// List available sources and exit
    ListSources(ListSourcesCommand),
    /// Run the extraction chain and print what it found, without writing files
    TestSource(TestSourceCommand),
}

impl Args {
    pub async fn run(self) -> Result<()> {
        let command = self.command.unwrap_or(Command::Run(RunCommand::default()));

        match command {
            Command::Run(cmd) => cmd.run().await,
            Command::ListSources(cmd) => cmd.run().await,
            Command::TestSource(cmd) => cmd.run().await,
        }
    }
}

/// Source selection shared by commands that run the extraction chain.
#[derive(ClapArgs, Debug, Clone)]
pub struct SourceArgs {
    /// Source ID (or partial match)
    #[arg(default_value = "hoy")]
    pub source: String,

    /// Load the source manifest from a YAML file instead of the built-in ones
    #[arg(long, value_name = "PATH")]
    pub manifest: Option<PathBuf>,

    /// Skip the headless browser strategies
    #[arg(long)]
    pub no_browser: bool,

    /// Show the browser window instead of running headless
    #[arg(long)]
    pub headed: bool,
}

impl Default for SourceArgs {
    fn default() -> Self {
        Self {
            source: "hoy".to_string(),
            manifest: None,
            no_browser: false,
            headed: false,
        }
    }
}

/// Everything needed to run the chain for one source, built once.
pub struct Prepared {
    pub manifest: Manifest,
    pub registry: ChannelRegistry,
    pub settings: ChainSettings,
    pub fetcher: HttpFetcher,
    pub renderer: Renderer,
}

impl SourceArgs {
    /// Load and validate configuration. Errors here are setup errors.
    pub fn prepare(&self) -> Result<Prepared> {
        let manifest = match &self.manifest {
            Some(path) => source::load_file(path)?,
            None => source::find_by_id(&self.source)?,
        };

        let registry = manifest.registry()?;
        let fallback_offset = manifest.fallback_offset()?;
        let proxy = manifest.source.proxy.as_deref();

        let fetcher = HttpFetcher::new(
            manifest.fetch_timeout(),
            manifest.fetch.user_agent.as_deref(),
            proxy,
        )?;

        let renderer = if self.no_browser || !manifest.render.enabled {
            info!("Headless browser disabled");
            Renderer::Disabled
        } else {
            Renderer::Chrome(ChromeRenderer {
                headless: !self.headed && manifest.source.headless.unwrap_or(true),
                proxy: manifest.source.proxy.clone(),
                navigation_timeout: manifest.render.navigation_timeout_duration(),
            })
        };

        let settings = ChainSettings {
            url: manifest.source.url.clone(),
            settle: manifest.render.settle_duration()?,
            fallback_offset,
            anchor_date: time::today(fallback_offset),
        };

        Ok(Prepared {
            manifest,
            registry,
            settings,
            fetcher,
            renderer,
        })
    }
}

impl Prepared {
    pub async fn run_chain(&self) -> ChainOutcome {
        info!(
            "Extracting guide for {} ({}) from {}",
            self.manifest.source.name, self.manifest.source.id, self.settings.url
        );
        StrategyChain::new(&self.fetcher, &self.renderer, &self.registry, &self.settings)
            .run()
            .await
    }
}
