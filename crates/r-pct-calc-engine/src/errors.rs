//! ---
//! pct_section: "08-protection-studies"
//! pct_subsection: "module"
//! pct_type: "source"
//! pct_scope: "code"
//! pct_description: "Protection coordination study routines for substation grading."
//! pct_version: "v0.0.0-prealpha"
//! pct_owner: "tbd"
//! ---
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CalcEngineError>;

#[derive(Debug, Error)]
pub enum CalcEngineError {
    #[error("coordination time interval {cti_ms} ms is below the {minimum_ms} ms minimum")]
    CtiTooLow { cti_ms: f64, minimum_ms: f64 },
    #[error("field '{field}' is not a finite number ({value})")]
    NonFiniteField { field: String, value: f64 },
    #[error("field '{field}' must be strictly positive ({value})")]
    NonPositiveField { field: String, value: f64 },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    SerializationFailed(#[from] serde_json::Error),
    #[error("yaml serialization error: {0}")]
    YamlSerializationFailed(#[from] serde_yaml::Error),
    #[error("csv serialization error: {0}")]
    CsvSerializationFailed(#[from] csv::Error),
}

impl CalcEngineError {
    /// Validation errors reject the study before any calculation runs;
    /// the remaining variants surface export failures.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CalcEngineError::CtiTooLow { .. }
                | CalcEngineError::NonFiniteField { .. }
                | CalcEngineError::NonPositiveField { .. }
        )
    }
}
