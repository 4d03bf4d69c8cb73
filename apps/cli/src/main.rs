//! footprint CLI: resume audit of a candidate's public web presence.
//!
//! Crawls a portfolio site (and the code it links to), asks an LLM oracle
//! what each page is worth, and writes one deduplicated JSON profile.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
