//! ---
//! pct_section: "05-operator-interfaces"
//! pct_subsection: "binary"
//! pct_type: "source"
//! pct_scope: "code"
//! pct_description: "Operator CLI for running protection coordination studies."
//! pct_version: "v0.0.0-prealpha"
//! pct_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand, ValueEnum};
use r_pct_calc_engine::{
    grading::FaultKind,
    io::{load_grading_study_from_file, load_tcc_study_from_file},
    model::{GradingStudy, TccStudy},
    reports::{grading_csv, grading_text, relay_settings_csv, tcc_text},
    run_grading_study, run_tcc_study, StudySummary,
};
use r_pct_common::config::AppConfig;
use tracing::info;

/// Dispatch entry point for study subcommands.
pub fn run(command: StudyCommand, config: &AppConfig) -> Result<()> {
    match command {
        StudyCommand::Grading(cmd) => cmd.execute(config),
        StudyCommand::Tcc(cmd) => cmd.execute(config),
    }
}

#[derive(Debug, Subcommand)]
pub enum StudyCommand {
    /// Run the overcurrent / earth-fault grading study.
    #[command(name = "grading")]
    Grading(GradingStudyCommand),
    /// Run the time-current characteristic coordination study.
    #[command(name = "tcc")]
    Tcc(TccStudyCommand),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

#[derive(Debug, Args)]
pub struct GradingStudyCommand {
    /// Study input file (JSON or YAML). Omit to run the built-in demo study.
    #[arg(long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Directory for exported reports (defaults to the configured reports directory).
    #[arg(long = "output-dir", value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Output printed to stdout.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Skip writing report files.
    #[arg(long = "no-export", action = clap::ArgAction::SetTrue)]
    no_export: bool,
}

impl GradingStudyCommand {
    pub fn execute(self, config: &AppConfig) -> Result<()> {
        let study = match &self.input {
            Some(path) => load_grading_study_from_file(path)
                .with_context(|| format!("failed to load study from {}", path.display()))?,
            None => {
                info!("no input file given; using the built-in demo study");
                GradingStudy::preload_default()
            }
        };

        let summary = run_grading_study(&study)?;
        let report = summary
            .grading
            .as_ref()
            .expect("grading study always produces a grading report");

        match self.format {
            OutputFormat::Text => {
                println!("{}", grading_text(report, FaultKind::Phase));
                println!("{}", grading_text(report, FaultKind::Earth));
                println!("Total Connected Load: {} A", report.total_load_a);
            }
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
            OutputFormat::Csv => print!("{}", grading_csv(report)?),
        }

        if !self.no_export {
            export(&summary, self.output_dir.as_ref(), config)?;
        }
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct TccStudyCommand {
    /// Study input file (JSON or YAML). Omit to run the built-in demo study.
    #[arg(long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Directory for exported reports (defaults to the configured reports directory).
    #[arg(long = "output-dir", value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Output printed to stdout.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Skip writing report files.
    #[arg(long = "no-export", action = clap::ArgAction::SetTrue)]
    no_export: bool,
}

impl TccStudyCommand {
    pub fn execute(self, config: &AppConfig) -> Result<()> {
        let study = match &self.input {
            Some(path) => load_tcc_study_from_file(path)
                .with_context(|| format!("failed to load study from {}", path.display()))?,
            None => {
                info!("no input file given; using the built-in demo study");
                TccStudy::preload_default()
            }
        };

        let summary = run_tcc_study(&study)?;
        let report = summary
            .tcc
            .as_ref()
            .expect("TCC study always produces a TCC report");

        match self.format {
            OutputFormat::Text => println!("{}", tcc_text(report)),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
            OutputFormat::Csv => print!("{}", relay_settings_csv(&study.relays)?),
        }

        if !self.no_export {
            export(&summary, self.output_dir.as_ref(), config)?;
        }
        Ok(())
    }
}

fn export(summary: &StudySummary, output_dir: Option<&PathBuf>, config: &AppConfig) -> Result<()> {
    let dir = output_dir
        .cloned()
        .unwrap_or_else(|| config.reports.directory.clone());
    summary
        .exporter()
        .export_all(&dir)
        .with_context(|| format!("failed to export reports to {}", dir.display()))?;
    Ok(())
}
