//! ---
//! pct_section: "08-protection-studies"
//! pct_subsection: "module"
//! pct_type: "source"
//! pct_scope: "code"
//! pct_description: "Protection coordination study routines for substation grading."
//! pct_version: "v0.0.0-prealpha"
//! pct_owner: "tbd"
//! ---
pub mod api;
pub mod errors;
pub mod fault_levels;
pub mod grading;
pub mod idmt;
pub mod io;
pub mod model;
pub mod reports;
pub mod tcc;

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::{
    grading::{run_grading, GradingReport},
    model::{GradingStudy, TccStudy},
    reports::ReportExporter,
    tcc::{run_tcc, TccReport},
};

pub use errors::{CalcEngineError, Result};

/// The outcome of one "run calculation" action: a timestamped, immutable
/// snapshot of whichever studies ran. Replaced wholesale on the next run.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StudySummary {
    pub timestamp: DateTime<Utc>,
    pub study_id: Uuid,
    pub grading: Option<GradingReport>,
    pub tcc: Option<TccReport>,
}

impl StudySummary {
    pub fn exporter(&self) -> ReportExporter<'_> {
        ReportExporter::new(self)
    }

    fn new(grading: Option<GradingReport>, tcc: Option<TccReport>) -> Self {
        Self {
            timestamp: Utc::now(),
            study_id: Uuid::new_v4(),
            grading,
            tcc,
        }
    }
}

/// Run the OC/EF grading study on its own.
pub fn run_grading_study(study: &GradingStudy) -> Result<StudySummary> {
    info!("Running OC/EF grading analysis...");
    let report = run_grading(study)?;
    Ok(StudySummary::new(Some(report), None))
}

/// Run the TCC curve study on its own.
pub fn run_tcc_study(study: &TccStudy) -> Result<StudySummary> {
    info!("Running TCC coordination analysis...");
    let report = run_tcc(study)?;
    Ok(StudySummary::new(None, Some(report)))
}

/// Run both studies against the same transformer in one summary.
pub fn run_full_study(grading: &GradingStudy, tcc: &TccStudy) -> Result<StudySummary> {
    info!("Running OC/EF grading analysis...");
    let grading_report = run_grading(grading)?;
    info!("Running TCC coordination analysis...");
    let tcc_report = run_tcc(tcc)?;
    Ok(StudySummary::new(Some(grading_report), Some(tcc_report)))
}
