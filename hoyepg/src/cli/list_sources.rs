use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
pub struct ListSourcesCommand;

impl ListSourcesCommand {
    pub async fn run(self) -> Result<()> {
        println!("Available sources:");
        for (id, name) in crate::source::list_sources()? {
            println!("  - {} ({})", id, name);
        }
        Ok(())
    }
}
