//! ---
//! pct_section: "08-protection-studies"
//! pct_subsection: "module"
//! pct_type: "source"
//! pct_scope: "code"
//! pct_description: "Protection coordination study routines for substation grading."
//! pct_version: "v0.0.0-prealpha"
//! pct_owner: "tbd"
//! ---
use std::{fs, path::Path};

use crate::{
    errors::{CalcEngineError, Result},
    model::{GradingStudy, TccStudy},
};

pub fn load_grading_study_from_file(path: impl AsRef<Path>) -> Result<GradingStudy> {
    let data = fs::read_to_string(path)?;
    parse_document(&data)
}

pub fn load_tcc_study_from_file(path: impl AsRef<Path>) -> Result<TccStudy> {
    let data = fs::read_to_string(path)?;
    parse_document(&data)
}

fn parse_document<T: serde::de::DeserializeOwned>(data: &str) -> Result<T> {
    let value = if data.trim_start().starts_with('{') {
        serde_json::from_str(data)?
    } else {
        serde_yaml::from_str(data).map_err(CalcEngineError::YamlSerializationFailed)?
    };
    Ok(value)
}
