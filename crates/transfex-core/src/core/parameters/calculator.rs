use super::{
    CELL_DILUTION_FACTOR, ISO_VOLUME_DECIMALS, MINIMUM_ISO_VOLUME, MIRNA_OPTIMEM_DILUTION_FACTOR,
    REAGENT_MM_DILUTION_FACTOR, STANDARD_OPTIMEM_DILUTION_FACTOR, TRANSFER_VOLUME,
};
use crate::core::models::molecule::{MoleculeType, UnknownMoleculeType};
use crate::core::models::specs::{PipettingSpec, ReservoirSpec, dynamic_dead_volume};
use crate::core::utils::numbers::{is_positive_number, round_up, trimmed_number};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum CalculationError {
    #[error(transparent)]
    UnknownMoleculeType(#[from] UnknownMoleculeType),

    #[error(
        "Target volume {target_volume} ul requires an ISO volume of {iso_volume} ul, which is below the minimum transfer volume of {min_transfer_volume} ul"
    )]
    IncompatibleTargetVolume {
        target_volume: f64,
        iso_volume: f64,
        min_transfer_volume: f64,
    },

    #[error("Invalid calculation input: {0}")]
    InvalidInput(String),
}

/// Non-fatal findings of a calculation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PlanningWarning {
    IsoVolumeClamped { computed: f64, minimum: f64 },
    CriticalIsoConcentration { iso_concentration: f64, critical: f64 },
}

impl fmt::Display for PlanningWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanningWarning::IsoVolumeClamped { computed, minimum } => write!(
                f,
                "ISO volume of {} ul is below the minimum transfer volume and was raised to {} ul",
                trimmed_number(round_up(*computed, ISO_VOLUME_DECIMALS)),
                trimmed_number(*minimum)
            ),
            PlanningWarning::CriticalIsoConcentration {
                iso_concentration,
                critical,
            } => write!(
                f,
                "ISO concentration of {} nM exceeds the critical concentration of {} nM; the robot step size may distort the final concentration",
                trimmed_number(*iso_concentration),
                trimmed_number(round_up(*critical, 1))
            ),
        }
    }
}

/// A calculated value together with the warnings raised while computing it.
#[derive(Debug, Clone, PartialEq)]
pub struct Calculated<T> {
    pub value: T,
    pub warnings: Vec<PlanningWarning>,
}

impl<T> Calculated<T> {
    fn clean(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }
}

/// OptiMem dilution factor for a molecule type: 3 for miRNA, 4 for everything else.
pub fn optimem_factor(molecule_type: MoleculeType) -> f64 {
    if molecule_type.is_mirna() {
        MIRNA_OPTIMEM_DILUTION_FACTOR
    } else {
        STANDARD_OPTIMEM_DILUTION_FACTOR
    }
}

pub fn optimem_factor_for_id(molecule_type_id: &str) -> Result<f64, CalculationError> {
    let molecule_type: MoleculeType = molecule_type_id.parse()?;
    Ok(optimem_factor(molecule_type))
}

/// Overall dilution between ISO and cell plate: reagent mastermix, OptiMem and cells.
pub fn total_dilution_factor(optimem_factor: f64) -> f64 {
    REAGENT_MM_DILUTION_FACTOR * CELL_DILUTION_FACTOR * optimem_factor
}

pub fn calculate_mastermix_volume_from_target_well_number(
    number_target_wells: usize,
    number_replicates: usize,
    reservoir_spec: &ReservoirSpec,
    pipetting_spec: &PipettingSpec,
) -> f64 {
    let well_count = number_target_wells * number_replicates;
    let dead_volume = if pipetting_spec.has_dynamic_dead_volume {
        dynamic_dead_volume(well_count, reservoir_spec)
    } else {
        reservoir_spec.min_dead_volume_ul()
    };
    well_count as f64 * TRANSFER_VOLUME + dead_volume
}

/// ISO volume (in ul) needed to serve `number_target_wells` wells in each of
/// `number_replicates` replicate plates.
///
/// Volumes below the minimum transfer volume of the pipetting device are raised to it
/// and reported as a warning. The result is rounded up to 0.1 ul.
pub fn calculate_iso_volume(
    number_target_wells: usize,
    number_replicates: usize,
    optimem_factor: f64,
    reservoir_spec: &ReservoirSpec,
    pipetting_spec: &PipettingSpec,
) -> Result<Calculated<f64>, CalculationError> {
    if number_target_wells == 0 || number_replicates == 0 {
        return Err(CalculationError::InvalidInput(format!(
            "target well count ({}) and replicate count ({}) must be positive",
            number_target_wells, number_replicates
        )));
    }
    check_optimem_factor(optimem_factor)?;

    let mastermix_volume = calculate_mastermix_volume_from_target_well_number(
        number_target_wells,
        number_replicates,
        reservoir_spec,
        pipetting_spec,
    );
    let iso_volume = mastermix_volume / (REAGENT_MM_DILUTION_FACTOR * optimem_factor);
    let minimum = min_iso_volume(pipetting_spec);

    if iso_volume < minimum {
        return Ok(Calculated {
            value: round_up(minimum, ISO_VOLUME_DECIMALS),
            warnings: vec![PlanningWarning::IsoVolumeClamped {
                computed: iso_volume,
                minimum,
            }],
        });
    }
    Ok(Calculated::clean(round_up(iso_volume, ISO_VOLUME_DECIMALS)))
}

/// ISO volume that yields exactly `target_volume` ul of mastermix.
///
/// Unlike [`calculate_iso_volume`] this does not clamp: a target volume that would need
/// less than the minimum transfer volume is rejected.
pub fn calculate_iso_volume_for_target_volume(
    target_volume: f64,
    optimem_factor: f64,
    pipetting_spec: &PipettingSpec,
) -> Result<f64, CalculationError> {
    if !is_positive_number(target_volume) {
        return Err(CalculationError::InvalidInput(format!(
            "target volume must be positive, got {}",
            target_volume
        )));
    }
    check_optimem_factor(optimem_factor)?;

    let iso_volume = target_volume / (REAGENT_MM_DILUTION_FACTOR * optimem_factor);
    let minimum = min_iso_volume(pipetting_spec);
    if iso_volume < minimum {
        return Err(CalculationError::IncompatibleTargetVolume {
            target_volume,
            iso_volume,
            min_transfer_volume: minimum,
        });
    }
    Ok(round_up(iso_volume, ISO_VOLUME_DECIMALS))
}

pub fn calculate_mastermix_volume_from_iso_volume(iso_volume: f64, optimem_factor: f64) -> f64 {
    REAGENT_MM_DILUTION_FACTOR * iso_volume * optimem_factor
}

pub fn calculate_reagent_dilution_volume(iso_volume: f64, optimem_factor: f64) -> f64 {
    iso_volume * optimem_factor
}

pub fn calculate_initial_reagent_dilution(reagent_dil_factor: f64) -> f64 {
    reagent_dil_factor / (REAGENT_MM_DILUTION_FACTOR * CELL_DILUTION_FACTOR)
}

pub fn calculate_iso_concentration(final_concentration: f64, optimem_factor: f64) -> f64 {
    final_concentration * total_dilution_factor(optimem_factor)
}

/// Largest ISO concentration (nM) for which the 0.1 ul step size of the BioMek does not
/// noticeably distort the concentration, for a pool with the given stock concentration.
///
/// Empirical: combines the minimum dead volume of a standard 96-well reservoir, the
/// minimum ISO volume and the BioMek minimum transfer volume.
pub fn critical_iso_concentration(stock_concentration: f64) -> f64 {
    let min_dead_volume = ReservoirSpec::standard_96().min_dead_volume_ul();
    let min_transfer_volume = PipettingSpec::biomek().min_transfer_volume;
    stock_concentration * min_transfer_volume / (min_dead_volume + MINIMUM_ISO_VOLUME)
}

pub fn critical_final_concentration(stock_concentration: f64, optimem_factor: f64) -> f64 {
    critical_iso_concentration(stock_concentration) / total_dilution_factor(optimem_factor)
}

/// Warns if an ISO concentration is above the critical concentration for its stock.
pub fn check_critical_iso_concentration(
    iso_concentration: f64,
    stock_concentration: f64,
) -> Option<PlanningWarning> {
    let critical = critical_iso_concentration(stock_concentration);
    (iso_concentration > critical).then_some(PlanningWarning::CriticalIsoConcentration {
        iso_concentration,
        critical,
    })
}

fn min_iso_volume(pipetting_spec: &PipettingSpec) -> f64 {
    pipetting_spec.min_transfer_volume.max(MINIMUM_ISO_VOLUME)
}

fn check_optimem_factor(optimem_factor: f64) -> Result<(), CalculationError> {
    if is_positive_number(optimem_factor) {
        Ok(())
    } else {
        Err(CalculationError::InvalidInput(format!(
            "OptiMem dilution factor must be positive, got {}",
            optimem_factor
        )))
    }
}
