use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod engine;
mod error;
mod guide;
mod output;
mod source;
mod util;
mod xmltv;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hoyepg=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    cli::Args::parse().run().await
}
