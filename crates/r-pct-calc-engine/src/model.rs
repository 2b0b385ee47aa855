//! ---
//! pct_section: "08-protection-studies"
//! pct_subsection: "module"
//! pct_type: "source"
//! pct_scope: "code"
//! pct_description: "Protection coordination study routines for substation grading."
//! pct_version: "v0.0.0-prealpha"
//! pct_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};

use crate::{
    errors::{CalcEngineError, Result},
    grading::MIN_CTI_MS,
    idmt::CurveKind,
};

/// Transformer nameplate data, as entered by the protection engineer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TransformerRating {
    pub mva: f64,
    pub hv_kv: f64,
    pub lv_kv: f64,
    pub impedance_pct: f64,
}

impl TransformerRating {
    /// HV/LV turns ratio used to refer currents across the transformer.
    pub fn turns_ratio(&self) -> f64 {
        self.hv_kv / self.lv_kv
    }

    pub fn validate(&self) -> Result<()> {
        ensure_positive(self.mva, "transformer.mva")?;
        ensure_positive(self.hv_kv, "transformer.hv_kv")?;
        ensure_positive(self.lv_kv, "transformer.lv_kv")?;
        ensure_positive(self.impedance_pct, "transformer.impedance_pct")?;
        Ok(())
    }
}

/// One outgoing feeder circuit: its load current and CT primary rating.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FeederSpec {
    pub load_a: f64,
    pub ct_a: f64,
}

/// Input to the OC/EF grading engine: transformer, grading margin, feeders
/// and the two upstream CT ratings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingStudy {
    pub transformer: TransformerRating,
    pub cti_ms: f64,
    pub feeders: Vec<FeederSpec>,
    pub q4_ct_a: f64,
    pub q5_ct_a: f64,
}

impl GradingStudy {
    pub fn validate(&self) -> Result<()> {
        self.transformer.validate()?;
        ensure_finite(self.cti_ms, "cti_ms")?;
        if self.cti_ms < MIN_CTI_MS {
            return Err(CalcEngineError::CtiTooLow {
                cti_ms: self.cti_ms,
                minimum_ms: MIN_CTI_MS,
            });
        }
        ensure_finite(self.q4_ct_a, "q4_ct_a")?;
        ensure_finite(self.q5_ct_a, "q5_ct_a")?;
        for (index, feeder) in self.feeders.iter().enumerate() {
            ensure_finite(feeder.load_a, &format!("feeders[{}].load_a", index))?;
            ensure_finite(feeder.ct_a, &format!("feeders[{}].ct_a", index))?;
        }
        Ok(())
    }

    /// The worked NEA example used throughout commissioning walkthroughs:
    /// 16.6 MVA 33/11 kV, 10 % impedance, three feeders.
    pub fn preload_default() -> Self {
        Self {
            transformer: TransformerRating {
                mva: 16.6,
                hv_kv: 33.0,
                lv_kv: 11.0,
                impedance_pct: 10.0,
            },
            cti_ms: 150.0,
            feeders: vec![
                FeederSpec {
                    load_a: 200.0,
                    ct_a: 400.0,
                },
                FeederSpec {
                    load_a: 250.0,
                    ct_a: 400.0,
                },
                FeederSpec {
                    load_a: 300.0,
                    ct_a: 400.0,
                },
            ],
            q4_ct_a: 900.0,
            q5_ct_a: 300.0,
        }
    }
}

/// A definite-time stage override on a relay: fires at a fixed delay once
/// the (scaled) current reaches its pickup.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DtStage {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub pickup_a: f64,
    #[serde(default)]
    pub delay_s: f64,
}

/// Per-relay configuration for the TCC study.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_true")]
    pub idmt_enabled: bool,
    pub pickup_a: f64,
    pub tms: f64,
    #[serde(default)]
    pub curve: CurveKind,
    #[serde(default)]
    pub dt1: DtStage,
    #[serde(default)]
    pub dt2: DtStage,
}

fn default_true() -> bool {
    true
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            idmt_enabled: false,
            pickup_a: 0.0,
            tms: 0.0,
            curve: CurveKind::StandardInverse,
            dt1: DtStage::default(),
            dt2: DtStage::default(),
        }
    }
}

/// Input to the TCC curve engine: transformer, an optional evaluated fault
/// current, and the five relays of the fixed Q1..Q5 topology.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TccStudy {
    pub transformer: TransformerRating,
    #[serde(default)]
    pub fault_current_a: Option<f64>,
    pub relays: [RelayConfig; 5],
}

impl TccStudy {
    pub fn validate(&self) -> Result<()> {
        self.transformer.validate()?;
        if let Some(fault) = self.fault_current_a {
            ensure_finite(fault, "fault_current_a")?;
        }
        for (index, relay) in self.relays.iter().enumerate() {
            ensure_finite(relay.pickup_a, &format!("relays[{}].pickup_a", index))?;
            ensure_finite(relay.tms, &format!("relays[{}].tms", index))?;
            ensure_finite(relay.dt1.pickup_a, &format!("relays[{}].dt1.pickup_a", index))?;
            ensure_finite(relay.dt1.delay_s, &format!("relays[{}].dt1.delay_s", index))?;
            ensure_finite(relay.dt2.pickup_a, &format!("relays[{}].dt2.pickup_a", index))?;
            ensure_finite(relay.dt2.delay_s, &format!("relays[{}].dt2.delay_s", index))?;
        }
        Ok(())
    }

    /// Default relay table for the worked 33/11 kV example, evaluated at an
    /// 8 kA LV fault.
    pub fn preload_default() -> Self {
        let feeder = |pickup_a: f64, dt1_pickup_a: f64| RelayConfig {
            idmt_enabled: true,
            pickup_a,
            tms: 0.025,
            curve: CurveKind::StandardInverse,
            dt1: DtStage {
                enabled: true,
                pickup_a: dt1_pickup_a,
                delay_s: 0.0,
            },
            dt2: DtStage::default(),
        };
        Self {
            transformer: TransformerRating {
                mva: 16.6,
                hv_kv: 33.0,
                lv_kv: 11.0,
                impedance_pct: 10.0,
            },
            fault_current_a: Some(8000.0),
            relays: [
                feeder(220.0, 600.0),
                feeder(275.0, 750.0),
                feeder(330.0, 900.0),
                RelayConfig {
                    idmt_enabled: true,
                    pickup_a: 825.0,
                    tms: 0.07,
                    curve: CurveKind::StandardInverse,
                    dt1: DtStage {
                        enabled: true,
                        pickup_a: 2250.0,
                        delay_s: 0.15,
                    },
                    dt2: DtStage {
                        enabled: true,
                        pickup_a: 8000.0,
                        delay_s: 0.0,
                    },
                },
                RelayConfig {
                    idmt_enabled: true,
                    pickup_a: 275.0,
                    tms: 0.12,
                    curve: CurveKind::StandardInverse,
                    dt1: DtStage {
                        enabled: true,
                        pickup_a: 750.0,
                        delay_s: 0.3,
                    },
                    dt2: DtStage {
                        enabled: true,
                        pickup_a: 2666.67,
                        delay_s: 0.0,
                    },
                },
            ],
        }
    }
}

fn ensure_finite(value: f64, field: &str) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(CalcEngineError::NonFiniteField {
            field: field.to_owned(),
            value,
        })
    }
}

fn ensure_positive(value: f64, field: &str) -> Result<()> {
    ensure_finite(value, field)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(CalcEngineError::NonPositiveField {
            field: field.to_owned(),
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_study_is_valid() {
        GradingStudy::preload_default().validate().unwrap();
        TccStudy::preload_default().validate().unwrap();
    }

    #[test]
    fn rejects_cti_below_floor() {
        let mut study = GradingStudy::preload_default();
        study.cti_ms = 119.0;
        let err = study.validate().unwrap_err();
        assert!(matches!(err, CalcEngineError::CtiTooLow { .. }));

        study.cti_ms = 120.0;
        study.validate().unwrap();
    }

    #[test]
    fn rejects_non_finite_feeder_load() {
        let mut study = GradingStudy::preload_default();
        study.feeders[1].load_a = f64::NAN;
        let err = study.validate().unwrap_err();
        match err {
            CalcEngineError::NonFiniteField { field, .. } => {
                assert_eq!(field, "feeders[1].load_a");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_zero_transformer_voltage() {
        let mut study = GradingStudy::preload_default();
        study.transformer.lv_kv = 0.0;
        let err = study.validate().unwrap_err();
        assert!(matches!(err, CalcEngineError::NonPositiveField { .. }));
        assert!(err.is_validation());
    }
}
