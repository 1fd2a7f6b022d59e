//! markstream CLI: incremental Markdown-to-HTML rendering from a stream.
//!
//! Feeds a document through the renderer in small chunks, the way a live
//! token generator would, and prints HTML fragments as they are produced.

mod commands;
mod stream;

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
