//! ---
//! pct_section: "08-protection-studies"
//! pct_subsection: "module"
//! pct_type: "source"
//! pct_scope: "code"
//! pct_description: "Protection coordination study routines for substation grading."
//! pct_version: "v0.0.0-prealpha"
//! pct_owner: "tbd"
//! ---
//! Transformer fault-physics primitives shared by both study engines.

use serde::{Deserialize, Serialize};

use crate::{
    errors::{CalcEngineError, Result},
    model::TransformerRating,
};

/// De-rating applied to the bolted fault current to obtain the "realistic"
/// fault level used for relay timing. Fixed engineering convention.
pub const REALISTIC_FAULT_RATIO: f64 = 0.9;

/// Reporting precision for currents and ratios (amps, *In).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Reporting precision for times and TMS values (seconds).
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Three-phase full load current in amps from MVA and line voltage in kV.
pub fn full_load_current(mva: f64, kv: f64) -> Result<f64> {
    if kv <= 0.0 {
        return Err(CalcEngineError::NonPositiveField {
            field: "voltage_kv".to_owned(),
            value: kv,
        });
    }
    Ok((mva * 1000.0) / (3.0_f64.sqrt() * kv))
}

/// Bolted three-phase short-circuit current from full load current and
/// percentage impedance.
pub fn short_circuit_current(flc_a: f64, impedance_pct: f64) -> Result<f64> {
    if impedance_pct <= 0.0 {
        return Err(CalcEngineError::NonPositiveField {
            field: "impedance_pct".to_owned(),
            value: impedance_pct,
        });
    }
    Ok(flc_a / (impedance_pct / 100.0))
}

/// De-rated fault current actually assumed to flow during a fault.
pub fn referred_fault_current(isc_a: f64) -> f64 {
    REALISTIC_FAULT_RATIO * isc_a
}

/// Refer an LV-side current to the HV side of the transformer. Current
/// steps down as voltage steps up, so this divides by the turns ratio.
pub fn refer_current_to_hv(current_a: f64, turns_ratio: f64) -> Result<f64> {
    if turns_ratio <= 0.0 {
        return Err(CalcEngineError::NonPositiveField {
            field: "turns_ratio".to_owned(),
            value: turns_ratio,
        });
    }
    Ok(current_a / turns_ratio)
}

/// Derived fault levels for a transformer. Values carry the 2 dp reporting
/// precision used throughout the setting reports; recomputed on every run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FaultLevels {
    pub flc_lv_a: f64,
    pub flc_hv_a: f64,
    pub isc_lv_a: f64,
    pub if_lv_a: f64,
    pub if_hv_a: f64,
}

impl FaultLevels {
    pub fn for_transformer(transformer: &TransformerRating) -> Result<Self> {
        transformer.validate()?;
        let flc_lv_a = round2(full_load_current(transformer.mva, transformer.lv_kv)?);
        let flc_hv_a = round2(full_load_current(transformer.mva, transformer.hv_kv)?);
        let isc_lv_a = round2(short_circuit_current(flc_lv_a, transformer.impedance_pct)?);
        let if_lv_a = round2(referred_fault_current(isc_lv_a));
        let if_hv_a = round2(refer_current_to_hv(if_lv_a, transformer.turns_ratio())?);
        Ok(Self {
            flc_lv_a,
            flc_hv_a,
            isc_lv_a,
            if_lv_a,
            if_hv_a,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_transformer() -> TransformerRating {
        TransformerRating {
            mva: 16.6,
            hv_kv: 33.0,
            lv_kv: 11.0,
            impedance_pct: 10.0,
        }
    }

    #[test]
    fn reference_fault_levels() {
        let levels = FaultLevels::for_transformer(&reference_transformer()).unwrap();
        assert_eq!(levels.flc_lv_a, 871.27);
        assert_eq!(levels.flc_hv_a, 290.42);
        assert_eq!(levels.isc_lv_a, 8712.7);
        assert_eq!(levels.if_lv_a, 7841.43);
        assert_eq!(levels.if_hv_a, 2613.81);
    }

    #[test]
    fn full_load_current_rejects_zero_voltage() {
        let err = full_load_current(16.6, 0.0).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn short_circuit_current_rejects_zero_impedance() {
        let err = short_circuit_current(871.27, 0.0).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn hv_referral_divides_by_turns_ratio() {
        let referred = refer_current_to_hv(900.0, 3.0).unwrap();
        assert_eq!(referred, 300.0);
    }
}
