//! ---
//! pct_section: "05-operator-interfaces"
//! pct_subsection: "binary"
//! pct_type: "source"
//! pct_scope: "code"
//! pct_description: "Operator CLI for running protection coordination studies."
//! pct_version: "v0.0.0-prealpha"
//! pct_owner: "tbd"
//! ---
use anyhow::Result;
use clap::{Parser, Subcommand};
use r_pct_common::config::AppConfig;
use r_pct_common::logging::init_tracing;

mod faults;
mod study;

const CONFIG_CANDIDATES: [&str; 2] = ["r-pct.toml", "configs/r-pct.toml"];

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "R-PCT protection coordination study utility",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(subcommand, about = "Run a coordination study from an input file")]
    Study(study::StudyCommand),
    #[command(about = "Derive transformer fault levels from nameplate data")]
    FaultLevels(faults::FaultLevelsArgs),
}

fn main() -> Result<()> {
    let config = AppConfig::load_or_default(&CONFIG_CANDIDATES)?;
    init_tracing("r-pctctl", &config.logging)?;

    let cli = Cli::parse();
    match cli.command {
        Commands::Study(cmd) => study::run(cmd, &config)?,
        Commands::FaultLevels(cmd) => faults::run(cmd)?,
    }
    Ok(())
}
