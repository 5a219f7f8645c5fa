use std::collections::BTreeMap;

use anyhow::Result;
use clap::Parser;

use crate::engine::{Strategy, StrategyState};
use crate::util::time::format_xmltv;

use super::SourceArgs;

#[derive(Parser, Debug)]
pub struct TestSourceCommand {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Programmes to show per channel
    #[arg(long, default_value = "3")]
    pub sample: usize,
}

impl TestSourceCommand {
    pub async fn run(self) -> Result<()> {
        let prepared = self.source.prepare()?;
        let manifest = &prepared.manifest;

        println!(
            "Testing source: {} ({})",
            manifest.source.name, manifest.source.id
        );
        println!("  URL: {}", prepared.settings.url);
        println!();

        let outcome = prepared.run_chain().await;

        println!("=== Strategies ===");
        for strategy in Strategy::ORDER {
            let state = match outcome.state(strategy) {
                StrategyState::NotTried => "not tried".to_string(),
                StrategyState::Empty(reason) => format!("empty ({})", reason),
                StrategyState::Succeeded(n) => format!("succeeded, {} entries", n),
            };
            println!("  {:<20} {}", strategy.to_string(), state);
        }

        println!();
        println!("=== Channels ===");

        let mut by_channel: BTreeMap<&str, Vec<_>> = BTreeMap::new();
        for entry in &outcome.entries {
            by_channel.entry(entry.channel_id.as_str()).or_default().push(entry);
        }

        for channel in prepared.registry.channels() {
            let programmes = by_channel.get(channel.id.as_str()).map(Vec::as_slice).unwrap_or_default();
            println!(
                "  {} (id: {}): {} programme(s)",
                channel.name,
                channel.id,
                programmes.len()
            );
            for entry in programmes.iter().take(self.sample) {
                println!(
                    "    - {} ({} -> {})",
                    entry.title,
                    format_xmltv(&entry.start),
                    format_xmltv(&entry.stop)
                );
            }
            if programmes.len() > self.sample {
                println!("    ... and {} more", programmes.len() - self.sample);
            }
        }

        println!();
        println!("=== Summary ===");
        match outcome.winner {
            Some(strategy) => println!(
                "  {} programme(s) via strategy {}",
                outcome.entries.len(),
                strategy
            ),
            None => println!("  No programmes found; a run would write channels-only output"),
        }

        Ok(())
    }
}
