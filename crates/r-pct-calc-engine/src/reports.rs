//! ---
//! pct_section: "08-protection-studies"
//! pct_subsection: "module"
//! pct_type: "source"
//! pct_scope: "code"
//! pct_description: "Protection coordination study routines for substation grading."
//! pct_version: "v0.0.0-prealpha"
//! pct_owner: "tbd"
//! ---
//! Rendering and export of study results.
//!
//! Text, CSV and JSON are each rendered independently from the typed stage
//! records; generated prose is never parsed back.

use std::{fs, path::Path};

use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::{
    errors::{CalcEngineError, Result},
    fault_levels::FaultLevels,
    grading::{FaultKind, GradingReport, StageKind},
    model::RelayConfig,
    tcc::{TccReport, RELAY_DESIGNATORS},
    StudySummary,
};

/// Legacy number formatting: whole amps and seconds keep a trailing `.0`,
/// everything else prints at its natural precision.
pub(crate) fn fmt_num(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1.0e15 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

fn fmt_ratio(ratio: Option<f64>) -> String {
    match ratio {
        Some(value) => fmt_num(value),
        None => "inf".to_owned(),
    }
}

fn header_line(levels: &FaultLevels) -> String {
    format!(
        "FLC LV: {}A | FLC HV: {}A | Short Circuit: {}A\n{}\n",
        fmt_num(levels.flc_lv_a),
        fmt_num(levels.flc_hv_a),
        fmt_num(levels.isc_lv_a),
        "=".repeat(60)
    )
}

/// Render one fault type's setting report in the legacy text layout
/// (alerts, fault-level header, then one block per equipment unit).
pub fn grading_text(report: &GradingReport, kind: FaultKind) -> String {
    let mut out = String::new();
    for alert in &report.alerts {
        out.push_str(&alert.to_string());
        out.push('\n');
    }
    out.push_str(&header_line(&report.fault_levels));
    for equipment in report.settings_for(kind) {
        out.push_str(&format!(
            "{}: Load={}A, CT={}\n",
            equipment.equipment,
            fmt_num(equipment.load_a),
            fmt_num(equipment.ct_a)
        ));
        for stage in &equipment.stages {
            match stage.kind {
                StageKind::Idmt => out.push_str(&format!(
                    " - {} (IDMT): Pickup={}A ({}*In), TMS={}, Time={}s\n",
                    stage.stage,
                    fmt_num(stage.pickup_a),
                    fmt_ratio(stage.ratio),
                    stage.tms.map(fmt_num).unwrap_or_else(|| "n/a".to_owned()),
                    fmt_num(stage.time_s)
                )),
                StageKind::DefiniteTime => out.push_str(&format!(
                    " - {} (DT):   Pickup={}A ({}*In), Time={}s\n",
                    stage.stage,
                    fmt_num(stage.pickup_a),
                    fmt_ratio(stage.ratio),
                    fmt_num(stage.time_s)
                )),
            }
        }
        out.push('\n');
    }
    out
}

#[derive(Debug, Serialize)]
struct SettingRow<'a> {
    #[serde(rename = "EQUIPMENT")]
    equipment: &'a str,
    #[serde(rename = "FAULT TYPE")]
    fault_type: &'a str,
    #[serde(rename = "STAGE")]
    stage: &'a str,
    #[serde(rename = "PICKUP (A)")]
    pickup_a: f64,
    #[serde(rename = "RATIO (*In)")]
    ratio: String,
    #[serde(rename = "TMS/DELAY")]
    tms_or_delay: String,
    #[serde(rename = "TIME (s)")]
    time_s: f64,
}

/// The tabulated settings CSV consumed by commissioning spreadsheets.
pub fn grading_csv(report: &GradingReport) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for kind in [FaultKind::Phase, FaultKind::Earth] {
        for equipment in report.settings_for(kind) {
            for stage in &equipment.stages {
                let tms_or_delay = match stage.kind {
                    StageKind::Idmt => {
                        stage.tms.map(fmt_num).unwrap_or_else(|| "n/a".to_owned())
                    }
                    StageKind::DefiniteTime => fmt_num(stage.time_s),
                };
                writer.serialize(SettingRow {
                    equipment: &equipment.equipment,
                    fault_type: kind.label(),
                    stage: &stage.stage,
                    pickup_a: stage.pickup_a,
                    ratio: fmt_ratio(stage.ratio),
                    tms_or_delay,
                    time_s: stage.time_s,
                })?;
            }
        }
    }
    finish_csv(writer)
}

#[derive(Debug, Serialize)]
struct RelayRow<'a> {
    #[serde(rename = "Relay")]
    relay: &'a str,
    #[serde(rename = "IDMT")]
    idmt: u8,
    #[serde(rename = "Pickup")]
    pickup_a: f64,
    #[serde(rename = "TMS")]
    tms: f64,
    #[serde(rename = "DT1")]
    dt1: u8,
    #[serde(rename = "P1")]
    dt1_pickup_a: f64,
    #[serde(rename = "T1")]
    dt1_delay_s: f64,
    #[serde(rename = "DT2")]
    dt2: u8,
    #[serde(rename = "P2")]
    dt2_pickup_a: f64,
    #[serde(rename = "T2")]
    dt2_delay_s: f64,
    #[serde(rename = "Curve")]
    curve: String,
}

/// Relay settings table for a TCC study, one row per relay.
pub fn relay_settings_csv(relays: &[RelayConfig; 5]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for (index, relay) in relays.iter().enumerate() {
        writer.serialize(RelayRow {
            relay: RELAY_DESIGNATORS[index],
            idmt: relay.idmt_enabled as u8,
            pickup_a: relay.pickup_a,
            tms: relay.tms,
            dt1: relay.dt1.enabled as u8,
            dt1_pickup_a: relay.dt1.pickup_a,
            dt1_delay_s: relay.dt1.delay_s,
            dt2: relay.dt2.enabled as u8,
            dt2_pickup_a: relay.dt2.pickup_a,
            dt2_delay_s: relay.dt2.delay_s,
            curve: relay.curve.to_string(),
        })?;
    }
    finish_csv(writer)
}

fn finish_csv(mut writer: csv::Writer<Vec<u8>>) -> Result<String> {
    writer.flush()?;
    let data = writer
        .into_inner()
        .map_err(|err| CalcEngineError::Io(err.into_error()))?;
    Ok(String::from_utf8_lossy(&data).into_owned())
}

/// Coordination summary text for a TCC study.
pub fn tcc_text(report: &TccReport) -> String {
    let mut out = String::new();
    for alert in &report.alerts {
        out.push_str(&alert.to_string());
        out.push('\n');
    }
    match report.effective_fault_a {
        Some(fault_a) => {
            out.push_str(&format!("Trip times at {}A:\n", fmt_num(fault_a)));
            for (designator, time_s) in &report.trip_times {
                out.push_str(&format!(" - {}: {}s\n", designator, fmt_num(*time_s)));
            }
            let silent: Vec<&str> = RELAY_DESIGNATORS
                .iter()
                .copied()
                .filter(|d| !report.trip_times.contains_key(*d))
                .collect();
            if !silent.is_empty() {
                out.push_str(&format!(" - no operation: {}\n", silent.join(", ")));
            }
        }
        None => out.push_str("No fault current supplied; trip times not evaluated.\n"),
    }
    if !report.coordination.is_empty() {
        out.push_str("Coordination checks:\n");
        for check in &report.coordination {
            out.push_str(&format!(
                " - {} -> {}: margin={}s (required {}s) {}\n",
                check.downstream,
                check.upstream,
                fmt_num(check.margin_s),
                fmt_num(check.required_cti_s),
                check.status
            ));
        }
    }
    out
}

/// Writes every rendering of a study summary into an output directory.
#[derive(Debug)]
pub struct ReportExporter<'a> {
    summary: &'a StudySummary,
}

impl<'a> ReportExporter<'a> {
    pub fn new(summary: &'a StudySummary) -> Self {
        Self { summary }
    }

    pub fn export_all(&self, output_dir: &Path) -> Result<()> {
        if !output_dir.exists() {
            fs::create_dir_all(output_dir)?;
        }

        let timestamp = self.summary.timestamp.to_rfc3339();

        if let Some(grading) = &self.summary.grading {
            let envelope = ReportEnvelope::new(
                &timestamp,
                self.summary.study_id,
                grading_schema(),
                grading,
            );
            write_json(output_dir.join("grading_report.json"), &envelope)?;
            fs::write(
                output_dir.join("oc_report.txt"),
                grading_text(grading, FaultKind::Phase),
            )?;
            fs::write(
                output_dir.join("ef_report.txt"),
                grading_text(grading, FaultKind::Earth),
            )?;
            fs::write(output_dir.join("settings.csv"), grading_csv(grading)?)?;
        }

        if let Some(tcc) = &self.summary.tcc {
            let envelope =
                ReportEnvelope::new(&timestamp, self.summary.study_id, tcc_schema(), tcc);
            write_json(output_dir.join("tcc_report.json"), &envelope)?;
            fs::write(output_dir.join("tcc_report.txt"), tcc_text(tcc))?;
        }

        info!("Reports exported to {}", output_dir.display());
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct ReportEnvelope<'a, T: Serialize> {
    timestamp: &'a str,
    study_id: uuid::Uuid,
    schema: serde_json::Value,
    data: &'a T,
}

impl<'a, T: Serialize> ReportEnvelope<'a, T> {
    fn new(timestamp: &'a str, study_id: uuid::Uuid, schema: serde_json::Value, data: &'a T) -> Self {
        Self {
            timestamp,
            study_id,
            schema,
            data,
        }
    }
}

fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let serialized = serde_json::to_string_pretty(value)?;
    fs::write(path, serialized)?;
    Ok(())
}

fn grading_schema() -> serde_json::Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "GradingReport",
        "type": "object",
        "properties": {
            "fault_levels": {"type": "object"},
            "total_load_a": {"type": "number"},
            "hv_load_a": {"type": "number"},
            "oc": {"type": "array"},
            "ef": {"type": "array"},
            "alerts": {"type": "array"}
        },
        "required": ["fault_levels", "total_load_a", "oc", "ef", "alerts"],
    })
}

fn tcc_schema() -> serde_json::Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "TccReport",
        "type": "object",
        "properties": {
            "fault_levels": {"type": "object"},
            "currents_a": {"type": "array", "items": {"type": "number"}},
            "curves": {"type": "array"},
            "trip_times": {"type": "object"},
            "coordination": {"type": "array"},
            "effective_fault_a": {"type": ["number", "null"]},
            "alerts": {"type": "array"}
        },
        "required": ["fault_levels", "currents_a", "curves", "trip_times", "coordination"],
    })
}
