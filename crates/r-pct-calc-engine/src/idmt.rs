//! ---
//! pct_section: "08-protection-studies"
//! pct_subsection: "module"
//! pct_type: "source"
//! pct_scope: "code"
//! pct_description: "Protection coordination study routines for substation grading."
//! pct_version: "v0.0.0-prealpha"
//! pct_owner: "tbd"
//! ---
//! IEC 60255 inverse-time curve evaluation and the TMS back-solve.
//!
//! This is the single implementation of the curve law in the workspace;
//! both the grading and TCC engines call through here.

use serde::{Deserialize, Serialize};

/// Floor applied to the current multiple before curve evaluation. Keeps the
/// denominator away from zero when the fault current barely exceeds pickup.
pub const MIN_CURRENT_MULTIPLE: f64 = 1.05;

/// IEC 60255 inverse-time characteristic families.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CurveKind {
    #[default]
    StandardInverse,
    VeryInverse,
    ExtremelyInverse,
}

impl CurveKind {
    /// The (k, alpha) constant pair of the curve family.
    pub fn constants(&self) -> (f64, f64) {
        match self {
            CurveKind::StandardInverse => (0.14, 0.02),
            CurveKind::VeryInverse => (13.5, 1.0),
            CurveKind::ExtremelyInverse => (80.0, 2.0),
        }
    }
}

impl std::fmt::Display for CurveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CurveKind::StandardInverse => "Standard Inverse",
            CurveKind::VeryInverse => "Very Inverse",
            CurveKind::ExtremelyInverse => "Extremely Inverse",
        };
        f.write_str(name)
    }
}

/// Operating time in seconds of an IDMT stage at `current_a`.
///
/// Returns `None` when the stage does not trip (`current_a <= pickup_a`)
/// and `Some(0.0)` for an unconfigured stage (`pickup_a <= 0`).
pub fn operating_time(current_a: f64, pickup_a: f64, tms: f64, curve: CurveKind) -> Option<f64> {
    if pickup_a <= 0.0 {
        return Some(0.0);
    }
    if current_a <= pickup_a {
        return None;
    }
    let (k, alpha) = curve.constants();
    let multiple = (current_a / pickup_a).max(MIN_CURRENT_MULTIPLE);
    Some(tms * k / (multiple.powf(alpha) - 1.0))
}

/// Back-solve the TMS that makes a stage operate in exactly `t_req_s` at
/// `fault_a`. The curve law is linear in TMS, so this is a direct algebraic
/// inversion. Returns `None` for an unconfigured pickup.
pub fn solve_tms(pickup_a: f64, fault_a: f64, t_req_s: f64, curve: CurveKind) -> Option<f64> {
    if pickup_a <= 0.0 {
        return None;
    }
    let (k, alpha) = curve.constants();
    let multiple = (fault_a / pickup_a).max(MIN_CURRENT_MULTIPLE);
    Some(t_req_s / (k / (multiple.powf(alpha) - 1.0)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_trip_at_or_below_pickup() {
        assert!(operating_time(200.0, 220.0, 0.025, CurveKind::StandardInverse).is_none());
        assert!(operating_time(220.0, 220.0, 0.025, CurveKind::StandardInverse).is_none());
    }

    #[test]
    fn trips_above_pickup_with_positive_time() {
        let t = operating_time(7841.43, 220.0, 0.025, CurveKind::StandardInverse).unwrap();
        assert!(t > 0.0 && t.is_finite());
    }

    #[test]
    fn time_decreases_with_tms() {
        let fast = operating_time(1000.0, 220.0, 0.025, CurveKind::StandardInverse).unwrap();
        let slow = operating_time(1000.0, 220.0, 0.1, CurveKind::StandardInverse).unwrap();
        assert!(fast < slow);
    }

    #[test]
    fn clamp_floors_the_current_multiple() {
        // A fault at 1.01x pickup evaluates as if it were at 1.05x.
        let clamped = operating_time(222.2, 220.0, 0.025, CurveKind::StandardInverse).unwrap();
        let floored = operating_time(231.0, 220.0, 0.025, CurveKind::StandardInverse).unwrap();
        assert!((clamped - floored).abs() < 1e-12);
    }

    #[test]
    fn degenerate_pickup_operates_instantly() {
        assert_eq!(
            operating_time(1000.0, 0.0, 0.025, CurveKind::StandardInverse),
            Some(0.0)
        );
        assert!(solve_tms(0.0, 1000.0, 0.2, CurveKind::StandardInverse).is_none());
    }

    #[test]
    fn back_solve_round_trips() {
        for curve in [
            CurveKind::StandardInverse,
            CurveKind::VeryInverse,
            CurveKind::ExtremelyInverse,
        ] {
            let tms = solve_tms(825.0, 7841.43, 0.204, curve).unwrap();
            let t = operating_time(7841.43, 825.0, tms, curve).unwrap();
            assert!((t - 0.204).abs() < 1e-9, "curve {curve}: {t}");
        }
    }

    #[test]
    fn curve_constants_match_iec_families() {
        assert_eq!(CurveKind::StandardInverse.constants(), (0.14, 0.02));
        assert_eq!(CurveKind::VeryInverse.constants(), (13.5, 1.0));
        assert_eq!(CurveKind::ExtremelyInverse.constants(), (80.0, 2.0));
    }
}
