//! IntakeForge CLI — household intake to account-opening documents.
//!
//! Reads a household intake workbook, renders the requested documents
//! (filled templates or generated data sheets) and keeps a local registry
//! of registered households.

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
