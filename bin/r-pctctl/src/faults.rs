//! ---
//! pct_section: "05-operator-interfaces"
//! pct_subsection: "binary"
//! pct_type: "source"
//! pct_scope: "code"
//! pct_description: "Operator CLI for running protection coordination studies."
//! pct_version: "v0.0.0-prealpha"
//! pct_owner: "tbd"
//! ---
use anyhow::Result;
use clap::Args;
use r_pct_calc_engine::{fault_levels::FaultLevels, model::TransformerRating};

#[derive(Debug, Args)]
pub struct FaultLevelsArgs {
    /// Transformer rating in MVA.
    #[arg(long)]
    mva: f64,

    /// HV winding voltage in kV.
    #[arg(long = "hv-kv")]
    hv_kv: f64,

    /// LV winding voltage in kV.
    #[arg(long = "lv-kv")]
    lv_kv: f64,

    /// Percentage impedance.
    #[arg(long = "impedance-pct")]
    impedance_pct: f64,
}

pub fn run(args: FaultLevelsArgs) -> Result<()> {
    let transformer = TransformerRating {
        mva: args.mva,
        hv_kv: args.hv_kv,
        lv_kv: args.lv_kv,
        impedance_pct: args.impedance_pct,
    };
    let levels = FaultLevels::for_transformer(&transformer)?;
    print!("{}", render(&levels));
    Ok(())
}

fn render(levels: &FaultLevels) -> String {
    format!(
        "FLC LV:          {:>10.2} A\n\
         FLC HV:          {:>10.2} A\n\
         Isc LV (bolted): {:>10.2} A\n\
         If LV (0.9x):    {:>10.2} A\n\
         If HV (referred):{:>10.2} A\n",
        levels.flc_lv_a, levels.flc_hv_a, levels.isc_lv_a, levels.if_lv_a, levels.if_hv_a
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_reference_levels() {
        let levels = FaultLevels::for_transformer(&TransformerRating {
            mva: 16.6,
            hv_kv: 33.0,
            lv_kv: 11.0,
            impedance_pct: 10.0,
        })
        .unwrap();
        let text = render(&levels);
        assert!(text.contains("871.27"));
        assert!(text.contains("8712.70"));
        assert!(text.contains("7841.43"));
    }
}
