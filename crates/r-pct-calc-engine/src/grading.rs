//! ---
//! pct_section: "08-protection-studies"
//! pct_subsection: "module"
//! pct_type: "source"
//! pct_scope: "code"
//! pct_description: "Protection coordination study routines for substation grading."
//! pct_version: "v0.0.0-prealpha"
//! pct_owner: "tbd"
//! ---
//! Overcurrent / earth-fault grading engine.
//!
//! Sizes pickup currents and trip times for every feeder, then back-solves
//! the TMS of the LV incomer (Q4) and the HV-side relay (Q5) so that each
//! cascade level clears one coordination interval after the level below it.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    errors::Result,
    fault_levels::{round2, round3, FaultLevels},
    idmt::{operating_time, solve_tms, CurveKind},
    model::{FeederSpec, GradingStudy},
    reports::fmt_num,
};

/// NEA policy floor for the coordination time interval.
pub const MIN_CTI_MS: f64 = 120.0;

/// Feeder IDMT stages always run at the minimum TMS; only the upstream
/// relays are back-solved.
pub const FEEDER_TMS: f64 = 0.025;

pub const OC_PICKUP_FACTOR: f64 = 1.1;
pub const OC_HIGHSET_FACTOR: f64 = 3.0;
pub const EF_PICKUP_FACTOR: f64 = 0.15;
pub const EF_HIGHSET_FACTOR: f64 = 1.0;

/// Which fault loop a setting group protects against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    Phase,
    Earth,
}

impl FaultKind {
    pub fn label(&self) -> &'static str {
        match self {
            FaultKind::Phase => "Overcurrent",
            FaultKind::Earth => "Earth Fault",
        }
    }

    fn pickup_factor(&self) -> f64 {
        match self {
            FaultKind::Phase => OC_PICKUP_FACTOR,
            FaultKind::Earth => EF_PICKUP_FACTOR,
        }
    }

    fn highset_factor(&self) -> f64 {
        match self {
            FaultKind::Phase => OC_HIGHSET_FACTOR,
            FaultKind::Earth => EF_HIGHSET_FACTOR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Idmt,
    DefiniteTime,
}

impl StageKind {
    pub fn label(&self) -> &'static str {
        match self {
            StageKind::Idmt => "IDMT",
            StageKind::DefiniteTime => "DT",
        }
    }
}

/// One protection stage of one equipment unit, fully resolved.
///
/// `ratio` is `None` when the CT rating is zero (the legacy reports print
/// this as an infinite multiple); `tms` is `None` for definite-time stages
/// and for an IDMT stage whose pickup degenerated to zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageSetting {
    pub stage: String,
    pub kind: StageKind,
    pub pickup_a: f64,
    pub ratio: Option<f64>,
    pub tms: Option<f64>,
    pub time_s: f64,
}

/// All resolved stages for one equipment unit (feeder, incomer, or HV side).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquipmentSettings {
    pub equipment: String,
    pub load_a: f64,
    pub ct_a: f64,
    pub stages: Vec<StageSetting>,
}

/// Operational findings surfaced alongside a valid grading result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GradingAlert {
    TransformerOverload { total_load_a: f64, flc_lv_a: f64 },
    FeederCtUndersized { feeder: String, ct_a: f64, load_a: f64 },
    IncomerCtUndersized { ct_a: f64, total_load_a: f64 },
    HvCtUndersized { ct_a: f64, hv_load_a: f64 },
}

impl std::fmt::Display for GradingAlert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GradingAlert::TransformerOverload {
                total_load_a,
                flc_lv_a,
            } => write!(
                f,
                "CRITICAL ALERT: TRANSFORMER OVERLOAD ({}A > {}A)",
                fmt_num(*total_load_a),
                fmt_num(*flc_lv_a)
            ),
            GradingAlert::FeederCtUndersized {
                feeder,
                ct_a,
                load_a,
            } => write!(
                f,
                "ALERT: Feeder {} CT ({}A) is less than Load ({}A)",
                feeder,
                fmt_num(*ct_a),
                fmt_num(*load_a)
            ),
            GradingAlert::IncomerCtUndersized { ct_a, total_load_a } => write!(
                f,
                "ALERT: Q4 Incomer CT ({}A) is less than Total Load ({}A)",
                fmt_num(*ct_a),
                fmt_num(*total_load_a)
            ),
            GradingAlert::HvCtUndersized { ct_a, hv_load_a } => write!(
                f,
                "ALERT: Q5 HV CT ({}A) is less than HV Load ({}A)",
                fmt_num(*ct_a),
                fmt_num(*hv_load_a)
            ),
        }
    }
}

/// Complete result of one grading run. Immutable; replaced wholesale on the
/// next run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingReport {
    pub fault_levels: FaultLevels,
    pub total_load_a: f64,
    pub hv_load_a: f64,
    pub oc: Vec<EquipmentSettings>,
    pub ef: Vec<EquipmentSettings>,
    pub alerts: Vec<GradingAlert>,
}

impl GradingReport {
    pub fn settings_for(&self, kind: FaultKind) -> &[EquipmentSettings] {
        match kind {
            FaultKind::Phase => &self.oc,
            FaultKind::Earth => &self.ef,
        }
    }
}

struct UpstreamSpec {
    equipment: &'static str,
    ct_a: f64,
    fault_a: f64,
    scale: f64,
    near_fault_pickup_a: f64,
    dt_delay_s: f64,
    t_prev_oc_s: f64,
    t_prev_ef_s: f64,
}

pub fn run_grading(study: &GradingStudy) -> Result<GradingReport> {
    study.validate()?;

    let cti_s = study.cti_ms / 1000.0;
    let levels = FaultLevels::for_transformer(&study.transformer)?;
    info!(
        feeders = study.feeders.len(),
        cti_ms = study.cti_ms,
        if_lv_a = levels.if_lv_a,
        "running OC/EF grading study"
    );

    let mut oc = Vec::new();
    let mut ef = Vec::new();
    let mut ct_alerts = Vec::new();
    let mut total_load_a = 0.0;
    let mut max_t_oc_s = 0.0_f64;
    let mut max_t_ef_s = 0.0_f64;

    for (index, feeder) in study.feeders.iter().enumerate() {
        let designator = format!("Q{}", index + 1);
        total_load_a += feeder.load_a;

        if feeder.ct_a < feeder.load_a {
            ct_alerts.push(GradingAlert::FeederCtUndersized {
                feeder: designator.clone(),
                ct_a: feeder.ct_a,
                load_a: feeder.load_a,
            });
        }

        let (settings, t_oc_s) =
            feeder_settings(FaultKind::Phase, &designator, feeder, levels.if_lv_a);
        max_t_oc_s = max_t_oc_s.max(t_oc_s);
        oc.push(settings);

        let (settings, t_ef_s) =
            feeder_settings(FaultKind::Earth, &designator, feeder, levels.if_lv_a);
        max_t_ef_s = max_t_ef_s.max(t_ef_s);
        ef.push(settings);
    }

    let turns_ratio = study.transformer.turns_ratio();
    let hv_load_a = total_load_a / turns_ratio;

    if study.q4_ct_a < total_load_a {
        ct_alerts.push(GradingAlert::IncomerCtUndersized {
            ct_a: study.q4_ct_a,
            total_load_a,
        });
    }
    if study.q5_ct_a < hv_load_a {
        ct_alerts.push(GradingAlert::HvCtUndersized {
            ct_a: study.q5_ct_a,
            hv_load_a: round2(hv_load_a),
        });
    }

    // The incomer grades off the slowest feeder; the HV side grades off the
    // incomer's already-advanced clearing time, one CTI per cascade level.
    let upstream = [
        UpstreamSpec {
            equipment: "INCOMER Q4 (LV)",
            ct_a: study.q4_ct_a,
            fault_a: levels.if_lv_a,
            scale: 1.0,
            near_fault_pickup_a: levels.if_lv_a,
            dt_delay_s: study.cti_ms / 1000.0,
            t_prev_oc_s: max_t_oc_s,
            t_prev_ef_s: max_t_ef_s,
        },
        UpstreamSpec {
            equipment: "HV SIDE Q5 (HV)",
            ct_a: study.q5_ct_a,
            fault_a: levels.if_hv_a,
            scale: turns_ratio,
            near_fault_pickup_a: levels.if_hv_a,
            dt_delay_s: 2.0 * study.cti_ms / 1000.0,
            t_prev_oc_s: max_t_oc_s + cti_s,
            t_prev_ef_s: max_t_ef_s + cti_s,
        },
    ];

    for spec in &upstream {
        oc.push(upstream_settings(
            FaultKind::Phase,
            spec,
            total_load_a,
            cti_s,
            spec.t_prev_oc_s,
        ));
        ef.push(upstream_settings(
            FaultKind::Earth,
            spec,
            total_load_a,
            cti_s,
            spec.t_prev_ef_s,
        ));
    }

    let mut alerts = Vec::new();
    if total_load_a > levels.flc_lv_a {
        warn!(
            total_load_a,
            flc_lv_a = levels.flc_lv_a,
            "total connected load exceeds transformer full load current"
        );
        alerts.push(GradingAlert::TransformerOverload {
            total_load_a,
            flc_lv_a: levels.flc_lv_a,
        });
    }
    alerts.extend(ct_alerts);

    Ok(GradingReport {
        fault_levels: levels,
        total_load_a,
        hv_load_a: round2(hv_load_a),
        oc,
        ef,
        alerts,
    })
}

fn feeder_settings(
    kind: FaultKind,
    designator: &str,
    feeder: &FeederSpec,
    if_lv_a: f64,
) -> (EquipmentSettings, f64) {
    let pickup_a = round2(kind.pickup_factor() * feeder.load_a);
    let time_s = match operating_time(if_lv_a, pickup_a, FEEDER_TMS, CurveKind::StandardInverse) {
        Some(t) => round3(t),
        None => {
            warn!(
                equipment = %designator,
                pickup_a,
                if_lv_a,
                "fault level does not exceed pickup; feeder stage treated as non-operating"
            );
            0.0
        }
    };
    let highset_a = round2(kind.highset_factor() * feeder.load_a);

    let settings = EquipmentSettings {
        equipment: format!("FEEDER {designator}"),
        load_a: feeder.load_a,
        ct_a: feeder.ct_a,
        stages: vec![
            StageSetting {
                stage: "S1".to_owned(),
                kind: StageKind::Idmt,
                pickup_a,
                ratio: pickup_ratio(pickup_a, feeder.ct_a),
                tms: Some(FEEDER_TMS),
                time_s,
            },
            StageSetting {
                stage: "S2".to_owned(),
                kind: StageKind::DefiniteTime,
                pickup_a: highset_a,
                ratio: pickup_ratio(highset_a, feeder.ct_a),
                tms: None,
                time_s: 0.0,
            },
        ],
    };
    (settings, time_s)
}

fn upstream_settings(
    kind: FaultKind,
    spec: &UpstreamSpec,
    total_load_a: f64,
    cti_s: f64,
    t_prev_s: f64,
) -> EquipmentSettings {
    let load_here_a = total_load_a / spec.scale;
    let t_req_s = round3(t_prev_s + cti_s);
    let pickup_a = round2(kind.pickup_factor() * load_here_a);
    let tms = match solve_tms(pickup_a, spec.fault_a, t_req_s, CurveKind::StandardInverse) {
        Some(v) => Some(round3(v)),
        None => {
            warn!(
                equipment = spec.equipment,
                pickup_a, "pickup degenerated to zero; TMS back-solve skipped"
            );
            None
        }
    };
    let highset_a = round2(kind.highset_factor() * load_here_a);

    EquipmentSettings {
        equipment: spec.equipment.to_owned(),
        load_a: round2(load_here_a),
        ct_a: spec.ct_a,
        stages: vec![
            StageSetting {
                stage: "S1".to_owned(),
                kind: StageKind::Idmt,
                pickup_a,
                ratio: pickup_ratio(pickup_a, spec.ct_a),
                tms,
                time_s: t_req_s,
            },
            StageSetting {
                stage: "S2".to_owned(),
                kind: StageKind::DefiniteTime,
                pickup_a: highset_a,
                ratio: pickup_ratio(highset_a, spec.ct_a),
                tms: None,
                time_s: spec.dt_delay_s,
            },
            StageSetting {
                stage: "S3".to_owned(),
                kind: StageKind::DefiniteTime,
                pickup_a: spec.near_fault_pickup_a,
                ratio: pickup_ratio(spec.near_fault_pickup_a, spec.ct_a),
                tms: None,
                time_s: 0.0,
            },
        ],
    }
}

fn pickup_ratio(pickup_a: f64, ct_a: f64) -> Option<f64> {
    if ct_a <= 0.0 {
        warn!(pickup_a, ct_a, "CT rating is zero; pickup ratio is undefined");
        None
    } else {
        Some(round2(pickup_a / ct_a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TransformerRating;

    fn default_report() -> GradingReport {
        run_grading(&GradingStudy::preload_default()).unwrap()
    }

    #[test]
    fn default_scenario_feeder_q1_settings() {
        let report = default_report();
        assert_eq!(report.oc.len(), 5);
        assert_eq!(report.ef.len(), 5);

        let q1 = &report.oc[0];
        assert_eq!(q1.equipment, "FEEDER Q1");
        let s1 = &q1.stages[0];
        assert_eq!(s1.pickup_a, 220.0);
        assert_eq!(s1.ratio, Some(0.55));
        assert_eq!(s1.tms, Some(FEEDER_TMS));
        assert_eq!(s1.time_s, 0.047);
        let s2 = &q1.stages[1];
        assert_eq!(s2.pickup_a, 600.0);
        assert_eq!(s2.time_s, 0.0);
    }

    #[test]
    fn incomer_grades_one_cti_above_slowest_feeder() {
        let report = default_report();
        let max_feeder_t = report.oc[..3]
            .iter()
            .map(|eq| eq.stages[0].time_s)
            .fold(0.0_f64, f64::max);
        let q4 = &report.oc[3];
        assert_eq!(q4.equipment, "INCOMER Q4 (LV)");
        assert_eq!(q4.stages[0].time_s, round3(max_feeder_t + 0.150));

        // HV side grades one further level up, off the incomer's time.
        let q5 = &report.oc[4];
        assert_eq!(q5.equipment, "HV SIDE Q5 (HV)");
        assert_eq!(q5.stages[0].time_s, round3(max_feeder_t + 0.150 + 0.150));
    }

    #[test]
    fn default_scenario_back_solved_tms() {
        let report = default_report();
        let q4 = &report.oc[3];
        assert_eq!(q4.load_a, 750.0);
        assert_eq!(q4.stages[0].pickup_a, 825.0);
        assert_eq!(q4.stages[0].tms, Some(0.067));
        assert_eq!(q4.stages[1].pickup_a, 2250.0);
        assert_eq!(q4.stages[1].time_s, 0.15);
        assert_eq!(q4.stages[2].pickup_a, report.fault_levels.if_lv_a);
        assert_eq!(q4.stages[2].time_s, 0.0);

        let q5 = &report.oc[4];
        assert_eq!(q5.load_a, 250.0);
        assert_eq!(q5.stages[0].pickup_a, 275.0);
        assert_eq!(q5.stages[0].tms, Some(0.116));
        assert_eq!(q5.stages[1].time_s, 0.3);
    }

    #[test]
    fn default_scenario_raises_no_alerts() {
        let report = default_report();
        assert!(report.alerts.is_empty());
        assert_eq!(report.total_load_a, 750.0);
        assert_eq!(report.hv_load_a, 250.0);
    }

    #[test]
    fn undersized_cts_raise_alerts_in_order() {
        let mut study = GradingStudy::preload_default();
        study.feeders[0].ct_a = 100.0;
        study.q4_ct_a = 600.0;
        study.q5_ct_a = 200.0;
        // Push the total load past FLC_LV to trigger the overload alert.
        study.feeders[2].load_a = 500.0;

        let report = run_grading(&study).unwrap();
        assert_eq!(report.alerts.len(), 4);
        assert!(matches!(
            report.alerts[0],
            GradingAlert::TransformerOverload { .. }
        ));
        assert!(matches!(
            report.alerts[1],
            GradingAlert::FeederCtUndersized { .. }
        ));
        assert!(matches!(
            report.alerts[2],
            GradingAlert::IncomerCtUndersized { .. }
        ));
        assert!(matches!(report.alerts[3], GradingAlert::HvCtUndersized { .. }));
    }

    #[test]
    fn overload_alert_absent_below_flc() {
        let report = default_report();
        assert!(report
            .alerts
            .iter()
            .all(|a| !matches!(a, GradingAlert::TransformerOverload { .. })));
    }

    #[test]
    fn cti_floor_is_enforced() {
        let mut study = GradingStudy::preload_default();
        study.cti_ms = 119.0;
        assert!(run_grading(&study).is_err());
        study.cti_ms = 120.0;
        assert!(run_grading(&study).is_ok());
    }

    #[test]
    fn zero_ct_yields_undefined_ratio_not_abort() {
        let mut study = GradingStudy::preload_default();
        study.feeders[0].ct_a = 0.0;
        let report = run_grading(&study).unwrap();
        assert_eq!(report.oc[0].stages[0].ratio, None);
    }

    #[test]
    fn earth_fault_pickups_use_ef_factors() {
        let report = default_report();
        let q1 = &report.ef[0];
        assert_eq!(q1.stages[0].pickup_a, 30.0);
        assert_eq!(q1.stages[1].pickup_a, 200.0);
    }

    #[test]
    fn single_feeder_study_still_grades() {
        let study = GradingStudy {
            transformer: TransformerRating {
                mva: 16.6,
                hv_kv: 33.0,
                lv_kv: 11.0,
                impedance_pct: 10.0,
            },
            cti_ms: 150.0,
            feeders: vec![FeederSpec {
                load_a: 400.0,
                ct_a: 400.0,
            }],
            q4_ct_a: 900.0,
            q5_ct_a: 300.0,
        };
        let report = run_grading(&study).unwrap();
        assert_eq!(report.oc.len(), 3);
        let q4 = &report.oc[1];
        assert_eq!(q4.stages[0].time_s, round3(report.oc[0].stages[0].time_s + 0.150));
    }
}
