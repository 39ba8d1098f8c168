use crate::cli::VolumeArgs;
use crate::config::builder::{resolve_pipetting, resolve_reservoir};
use crate::config::defaults::DefaultsConfig;
use crate::error::Result;
use transfex::core::parameters::calculator::{
    Calculated, calculate_iso_volume, calculate_mastermix_volume_from_iso_volume,
    calculate_reagent_dilution_volume,
};
use transfex::core::utils::numbers::trimmed_number;
use transfex::engine::error::EngineError;

pub fn run(args: &VolumeArgs) -> Result<()> {
    let Calculated { value, warnings } = iso_volume(args)?;

    println!("ISO volume: {} ul", trimmed_number(value));
    println!(
        "Mastermix volume: {} ul",
        trimmed_number(calculate_mastermix_volume_from_iso_volume(value, args.optimem))
    );
    println!(
        "Reagent dilution volume: {} ul",
        trimmed_number(calculate_reagent_dilution_volume(value, args.optimem))
    );
    for warning in warnings {
        eprintln!("Warning: {}", warning);
    }
    Ok(())
}

fn iso_volume(args: &VolumeArgs) -> Result<Calculated<f64>> {
    let defaults = DefaultsConfig::default();
    let pipetting = resolve_pipetting(args.pipetting.as_deref().unwrap_or(&defaults.pipetting))?;
    let reservoir = resolve_reservoir(args.reservoir.as_deref().unwrap_or(&defaults.reservoir))?;

    calculate_iso_volume(
        args.wells,
        args.replicates,
        args.optimem,
        &reservoir,
        &pipetting,
    )
    .map_err(|e| EngineError::from(e).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;

    fn args(wells: usize, replicates: usize, optimem: f64) -> VolumeArgs {
        VolumeArgs {
            wells,
            replicates,
            optimem,
            pipetting: None,
            reservoir: None,
        }
    }

    #[test]
    fn single_well_is_clamped_to_the_biomek_minimum() {
        let result = iso_volume(&args(1, 1, 4.0)).unwrap();
        assert_eq!(result.value, 2.0);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn larger_well_counts_need_no_clamping() {
        let result = iso_volume(&args(10, 3, 4.0)).unwrap();
        assert!(result.value > 2.0);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn zero_wells_are_a_calculation_error() {
        assert!(matches!(
            iso_volume(&args(0, 1, 4.0)),
            Err(CliError::Core(EngineError::Calculation { .. }))
        ));
    }

    #[test]
    fn unknown_reservoir_is_a_config_error() {
        let mut volume_args = args(4, 1, 4.0);
        volume_args.reservoir = Some("bucket".to_string());
        assert!(matches!(
            iso_volume(&volume_args),
            Err(CliError::Config(_))
        ));
    }
}
