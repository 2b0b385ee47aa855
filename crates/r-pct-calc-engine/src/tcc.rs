//! ---
//! pct_section: "08-protection-studies"
//! pct_subsection: "module"
//! pct_type: "source"
//! pct_scope: "code"
//! pct_description: "Protection coordination study routines for substation grading."
//! pct_version: "v0.0.0-prealpha"
//! pct_owner: "tbd"
//! ---
//! Time-current characteristic engine.
//!
//! Sweeps each relay's composite characteristic (IDMT plus up to two
//! definite-time stages, fastest element wins) over a logarithmic current
//! axis, evaluates trip times at a supplied fault current, and checks the
//! pairwise coordination margins of the fixed Q1..Q5 topology.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    errors::Result,
    fault_levels::{round3, FaultLevels},
    idmt::operating_time,
    model::{RelayConfig, TccStudy},
    reports::fmt_num,
};

pub const SWEEP_POINTS: usize = 800;
pub const SWEEP_MIN_EXP: f64 = 1.0;
pub const SWEEP_MAX_EXP: f64 = 5.0;

pub const RELAY_DESIGNATORS: [&str; 5] = ["Q1", "Q2", "Q3", "Q4", "Q5"];

pub const CTI_FEEDER_TO_INCOMER_S: f64 = 0.150;
pub const CTI_FEEDER_TO_HV_S: f64 = 0.300;
pub const CTI_INCOMER_TO_HV_S: f64 = 0.150;

/// DT2 stages are fitted only on the incomer and HV-side relays.
const DT2_MIN_RELAY_INDEX: usize = 3;

/// Index of the relay whose currents are referred across the transformer.
const HV_RELAY_INDEX: usize = 4;

/// One relay's composite characteristic over the swept axis. `None` points
/// mean no stage operates at that current.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayCurve {
    pub designator: String,
    pub times_s: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoordinationStatus {
    Ok,
    NotOk,
}

impl std::fmt::Display for CoordinationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoordinationStatus::Ok => f.write_str("OK"),
            CoordinationStatus::NotOk => f.write_str("NOT OK"),
        }
    }
}

/// Margin between one downstream/upstream pair at the evaluated fault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinationResult {
    pub downstream: String,
    pub upstream: String,
    pub margin_s: f64,
    pub required_cti_s: f64,
    pub status: CoordinationStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TccAlert {
    FaultCurrentClamped { requested_a: f64, isc_lv_a: f64 },
}

impl std::fmt::Display for TccAlert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TccAlert::FaultCurrentClamped {
                requested_a,
                isc_lv_a,
            } => write!(
                f,
                "ALERT: Fault current {}A exceeds available Isc {}A; evaluating at {}A",
                fmt_num(*requested_a),
                fmt_num(*isc_lv_a),
                fmt_num(*isc_lv_a)
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TccReport {
    pub fault_levels: FaultLevels,
    pub currents_a: Vec<f64>,
    pub curves: Vec<RelayCurve>,
    pub trip_times: IndexMap<String, f64>,
    pub coordination: Vec<CoordinationResult>,
    pub effective_fault_a: Option<f64>,
    pub alerts: Vec<TccAlert>,
}

pub fn run_tcc(study: &TccStudy) -> Result<TccReport> {
    study.validate()?;

    let levels = FaultLevels::for_transformer(&study.transformer)?;
    let turns_ratio = study.transformer.turns_ratio();
    info!(
        isc_lv_a = levels.isc_lv_a,
        fault_a = ?study.fault_current_a,
        "running TCC study"
    );

    let mut alerts = Vec::new();
    let effective_fault_a = study.fault_current_a.map(|requested_a| {
        if requested_a > levels.isc_lv_a {
            warn!(
                requested_a,
                isc_lv_a = levels.isc_lv_a,
                "fault current exceeds available fault level; clamping"
            );
            alerts.push(TccAlert::FaultCurrentClamped {
                requested_a,
                isc_lv_a: levels.isc_lv_a,
            });
            levels.isc_lv_a
        } else {
            requested_a
        }
    });

    let currents_a = logspace(SWEEP_MIN_EXP, SWEEP_MAX_EXP, SWEEP_POINTS);

    let mut curves = Vec::with_capacity(study.relays.len());
    let mut trip_times = IndexMap::new();

    for (index, relay) in study.relays.iter().enumerate() {
        let designator = RELAY_DESIGNATORS[index];
        let scale = if index == HV_RELAY_INDEX {
            turns_ratio
        } else {
            1.0
        };
        let allow_dt2 = index >= DT2_MIN_RELAY_INDEX;

        let times_s = currents_a
            .iter()
            .map(|current_a| composite_trip_time(relay, current_a / scale, allow_dt2))
            .collect();
        curves.push(RelayCurve {
            designator: designator.to_owned(),
            times_s,
        });

        if let Some(fault_a) = effective_fault_a {
            if let Some(t) = composite_trip_time(relay, fault_a / scale, allow_dt2) {
                trip_times.insert(designator.to_owned(), round3(t));
            }
        }
    }

    let coordination = check_coordination(&trip_times);

    Ok(TccReport {
        fault_levels: levels,
        currents_a,
        curves,
        trip_times,
        coordination,
        effective_fault_a,
        alerts,
    })
}

/// Fastest enabled stage at the relay-side current, or `None` when nothing
/// operates.
fn composite_trip_time(relay: &RelayConfig, scaled_current_a: f64, allow_dt2: bool) -> Option<f64> {
    let mut fastest: Option<f64> = None;
    let mut consider = |t: f64| {
        fastest = Some(match fastest {
            Some(best) => best.min(t),
            None => t,
        });
    };

    if relay.idmt_enabled {
        if let Some(t) = operating_time(scaled_current_a, relay.pickup_a, relay.tms, relay.curve) {
            consider(t);
        }
    }
    if relay.dt1.enabled && scaled_current_a >= relay.dt1.pickup_a {
        consider(relay.dt1.delay_s);
    }
    if allow_dt2 && relay.dt2.enabled && scaled_current_a >= relay.dt2.pickup_a {
        consider(relay.dt2.delay_s);
    }
    fastest
}

/// Fixed grading topology: feeders into the incomer, feeders across the
/// transformer, and incomer into the HV side.
fn coordination_checks() -> [(&'static str, &'static str, f64); 7] {
    [
        ("Q1", "Q4", CTI_FEEDER_TO_INCOMER_S),
        ("Q2", "Q4", CTI_FEEDER_TO_INCOMER_S),
        ("Q3", "Q4", CTI_FEEDER_TO_INCOMER_S),
        ("Q1", "Q5", CTI_FEEDER_TO_HV_S),
        ("Q2", "Q5", CTI_FEEDER_TO_HV_S),
        ("Q3", "Q5", CTI_FEEDER_TO_HV_S),
        ("Q4", "Q5", CTI_INCOMER_TO_HV_S),
    ]
}

fn check_coordination(trip_times: &IndexMap<String, f64>) -> Vec<CoordinationResult> {
    let mut results = Vec::new();
    for (downstream, upstream, required_cti_s) in coordination_checks() {
        // A pair is only checked when both relays actually operated; no
        // data is not a coordination failure.
        let (Some(t_down), Some(t_up)) = (trip_times.get(downstream), trip_times.get(upstream))
        else {
            continue;
        };
        let margin_s = round3(t_up - t_down);
        let status = if margin_s >= required_cti_s {
            CoordinationStatus::Ok
        } else {
            CoordinationStatus::NotOk
        };
        results.push(CoordinationResult {
            downstream: downstream.to_owned(),
            upstream: upstream.to_owned(),
            margin_s,
            required_cti_s,
            status,
        });
    }
    results
}

fn logspace(min_exp: f64, max_exp: f64, points: usize) -> Vec<f64> {
    if points < 2 {
        return vec![10.0_f64.powf(min_exp)];
    }
    let step = (max_exp - min_exp) / (points - 1) as f64;
    (0..points)
        .map(|i| 10.0_f64.powf(min_exp + step * i as f64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DtStage, TransformerRating};

    #[test]
    fn sweep_axis_is_logarithmic() {
        let axis = logspace(SWEEP_MIN_EXP, SWEEP_MAX_EXP, SWEEP_POINTS);
        assert_eq!(axis.len(), SWEEP_POINTS);
        assert!((axis[0] - 10.0).abs() < 1e-9);
        assert!((axis[SWEEP_POINTS - 1] - 100_000.0).abs() < 1e-6);
        // Constant ratio between successive points.
        let r0 = axis[1] / axis[0];
        let r1 = axis[401] / axis[400];
        assert!((r0 - r1).abs() < 1e-12);
    }

    #[test]
    fn default_study_produces_curves_and_trip_times() {
        let report = run_tcc(&TccStudy::preload_default()).unwrap();
        assert_eq!(report.curves.len(), 5);
        assert_eq!(report.curves[0].times_s.len(), SWEEP_POINTS);
        // All five relays operate at an 8 kA LV fault.
        for designator in RELAY_DESIGNATORS {
            assert!(report.trip_times.contains_key(designator), "{designator}");
        }
        assert!(report.alerts.is_empty());
        assert_eq!(report.effective_fault_a, Some(8000.0));
    }

    #[test]
    fn fault_current_is_clamped_to_isc() {
        let mut study = TccStudy::preload_default();
        study.fault_current_a = Some(50_000.0);
        let report = run_tcc(&study).unwrap();
        assert_eq!(report.effective_fault_a, Some(report.fault_levels.isc_lv_a));
        assert_eq!(report.alerts.len(), 1);
        assert!(matches!(
            report.alerts[0],
            TccAlert::FaultCurrentClamped { .. }
        ));
    }

    #[test]
    fn no_fault_current_means_no_trip_times_or_checks() {
        let mut study = TccStudy::preload_default();
        study.fault_current_a = None;
        let report = run_tcc(&study).unwrap();
        assert!(report.trip_times.is_empty());
        assert!(report.coordination.is_empty());
        assert_eq!(report.curves.len(), 5);
    }

    #[test]
    fn curve_floor_takes_fastest_stage() {
        let study = TccStudy::preload_default();
        let relay = &study.relays[3];
        // Above the DT2 pickup the instantaneous stage wins outright.
        assert_eq!(composite_trip_time(relay, 9000.0, true), Some(0.0));
        // Between DT1 and DT2 pickups the 150 ms stage caps the IDMT time.
        let t = composite_trip_time(relay, 3000.0, true).unwrap();
        assert_eq!(t, 0.15);
        // Below every pickup nothing operates.
        assert_eq!(composite_trip_time(relay, 100.0, true), None);
    }

    #[test]
    fn dt2_is_ignored_on_feeder_relays() {
        let relay = RelayConfig {
            idmt_enabled: false,
            pickup_a: 0.0,
            tms: 0.0,
            curve: Default::default(),
            dt1: DtStage::default(),
            dt2: DtStage {
                enabled: true,
                pickup_a: 100.0,
                delay_s: 0.2,
            },
        };
        assert_eq!(composite_trip_time(&relay, 5000.0, false), None);
        assert_eq!(composite_trip_time(&relay, 5000.0, true), Some(0.2));
    }

    #[test]
    fn hv_relay_sees_referred_current() {
        let mut study = TccStudy::preload_default();
        // Kill everything but Q5's IDMT element and pick a fault where the
        // referred current sits just below the pickup: no trip expected.
        for relay in study.relays.iter_mut() {
            relay.dt1.enabled = false;
            relay.dt2.enabled = false;
        }
        study.fault_current_a = Some(800.0);
        let report = run_tcc(&study).unwrap();
        // 800 A at LV is 266.67 A seen by Q5 (pickup 275): no trip.
        assert!(!report.trip_times.contains_key("Q5"));
        // The LV feeders see the full 800 A and do trip.
        assert!(report.trip_times.contains_key("Q1"));
    }

    #[test]
    fn coordination_margin_verdicts() {
        let mut trip_times = IndexMap::new();
        trip_times.insert("Q1".to_owned(), 0.3);
        trip_times.insert("Q4".to_owned(), 0.5);
        let results = check_coordination(&trip_times);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].margin_s, 0.2);
        assert_eq!(results[0].status, CoordinationStatus::Ok);

        // Against the 300 ms requirement the same margin fails.
        let mut trip_times = IndexMap::new();
        trip_times.insert("Q1".to_owned(), 0.3);
        trip_times.insert("Q5".to_owned(), 0.5);
        let results = check_coordination(&trip_times);
        assert_eq!(results[0].required_cti_s, CTI_FEEDER_TO_HV_S);
        assert_eq!(results[0].status, CoordinationStatus::NotOk);
    }

    #[test]
    fn pairs_with_missing_times_are_skipped() {
        let mut trip_times = IndexMap::new();
        trip_times.insert("Q4".to_owned(), 0.5);
        assert!(check_coordination(&trip_times).is_empty());
    }

    #[test]
    fn default_scenario_coordinates_feeders_under_incomer() {
        let report = run_tcc(&TccStudy::preload_default()).unwrap();
        let q1_q4 = report
            .coordination
            .iter()
            .find(|c| c.downstream == "Q1" && c.upstream == "Q4")
            .unwrap();
        let t_q1 = report.trip_times["Q1"];
        let t_q4 = report.trip_times["Q4"];
        assert_eq!(q1_q4.margin_s, round3(t_q4 - t_q1));
    }

    #[test]
    fn zero_voltage_transformer_is_rejected() {
        let mut study = TccStudy::preload_default();
        study.transformer.lv_kv = 0.0;
        assert!(run_tcc(&study).is_err());
    }

    #[test]
    fn identity_scale_for_lv_relays() {
        // A synthetic study where only Q4 has a DT stage at 1000 A: the
        // unscaled sweep current drives it directly.
        let study = TccStudy {
            transformer: TransformerRating {
                mva: 16.6,
                hv_kv: 33.0,
                lv_kv: 11.0,
                impedance_pct: 10.0,
            },
            fault_current_a: Some(1200.0),
            relays: [
                RelayConfig::default(),
                RelayConfig::default(),
                RelayConfig::default(),
                RelayConfig {
                    idmt_enabled: false,
                    pickup_a: 0.0,
                    tms: 0.0,
                    curve: Default::default(),
                    dt1: DtStage {
                        enabled: true,
                        pickup_a: 1000.0,
                        delay_s: 0.25,
                    },
                    dt2: DtStage::default(),
                },
                RelayConfig::default(),
            ],
        };
        let report = run_tcc(&study).unwrap();
        assert_eq!(report.trip_times.get("Q4"), Some(&0.25));
        assert_eq!(report.trip_times.len(), 1);
        assert!(report.coordination.is_empty());
    }
}
