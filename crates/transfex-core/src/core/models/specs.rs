use crate::core::utils::identifiers::normalize_identifier;
use std::str::FromStr;
use thiserror::Error;

/// Conversion factor between litres (external) and microlitres (internal).
pub const VOLUME_CONVERSION_FACTOR: f64 = 1e6;
/// Conversion factor between molar (external) and nanomolar (internal).
pub const CONCENTRATION_CONVERSION_FACTOR: f64 = 1e9;

/// Up to this number of target wells a reservoir only needs its minimum dead volume.
const DYNAMIC_DEAD_VOLUME_WELL_LIMIT: usize = 3;
/// Additional dead volume (in ul) per target well beyond the limit.
const DEAD_VOLUME_COEFFICIENT: f64 = 0.5;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum SpecError {
    #[error("Unknown pipetting specs '{0}'")]
    UnknownPipettingSpec(String),
    #[error("Unknown reservoir specs '{0}'")]
    UnknownReservoirSpec(String),
}

/// Capabilities of a liquid handler.
#[derive(Debug, Clone, PartialEq)]
pub struct PipettingSpec {
    pub name: &'static str,
    /// Smallest volume the device can transfer, in ul.
    pub min_transfer_volume: f64,
    /// Largest volume for a single transfer, in ul.
    pub max_transfer_volume: f64,
    pub has_dynamic_dead_volume: bool,
}

impl PipettingSpec {
    pub fn biomek() -> Self {
        Self {
            name: "BioMek",
            min_transfer_volume: 2.0,
            max_transfer_volume: 250.0,
            has_dynamic_dead_volume: true,
        }
    }

    pub fn cybio() -> Self {
        Self {
            name: "CyBio",
            min_transfer_volume: 1.0,
            max_transfer_volume: 100.0,
            has_dynamic_dead_volume: false,
        }
    }

    pub fn manual() -> Self {
        Self {
            name: "manual",
            min_transfer_volume: 1.0,
            max_transfer_volume: 1000.0,
            has_dynamic_dead_volume: false,
        }
    }
}

impl FromStr for PipettingSpec {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_identifier(s).as_str() {
            "biomek" => Ok(Self::biomek()),
            "cybio" => Ok(Self::cybio()),
            "manual" => Ok(Self::manual()),
            _ => Err(SpecError::UnknownPipettingSpec(s.to_string())),
        }
    }
}

/// Plate or tube properties of an ISO source. All volumes are in litres.
#[derive(Debug, Clone, PartialEq)]
pub struct ReservoirSpec {
    pub name: &'static str,
    pub max_volume: f64,
    pub min_dead_volume: f64,
    pub max_dead_volume: f64,
}

impl ReservoirSpec {
    pub fn standard_96() -> Self {
        Self {
            name: "standard 96",
            max_volume: 300e-6,
            min_dead_volume: 10e-6,
            max_dead_volume: 30e-6,
        }
    }

    pub fn standard_384() -> Self {
        Self {
            name: "standard 384",
            max_volume: 100e-6,
            min_dead_volume: 5e-6,
            max_dead_volume: 15e-6,
        }
    }

    pub fn deep_96() -> Self {
        Self {
            name: "deep 96",
            max_volume: 2000e-6,
            min_dead_volume: 30e-6,
            max_dead_volume: 40e-6,
        }
    }

    pub fn min_dead_volume_ul(&self) -> f64 {
        self.min_dead_volume * VOLUME_CONVERSION_FACTOR
    }

    pub fn max_dead_volume_ul(&self) -> f64 {
        self.max_dead_volume * VOLUME_CONVERSION_FACTOR
    }

    pub fn max_volume_ul(&self) -> f64 {
        self.max_volume * VOLUME_CONVERSION_FACTOR
    }
}

impl FromStr for ReservoirSpec {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_identifier(s).as_str() {
            "standard_96" | "std_96" => Ok(Self::standard_96()),
            "standard_384" | "std_384" => Ok(Self::standard_384()),
            "deep_96" => Ok(Self::deep_96()),
            _ => Err(SpecError::UnknownReservoirSpec(s.to_string())),
        }
    }
}

/// Dead volume (in ul) of a reservoir serving `well_count` target wells.
///
/// Step function: the minimum dead volume for small well counts, then whole-ul steps
/// growing with the well count until the maximum dead volume is reached.
pub fn dynamic_dead_volume(well_count: usize, reservoir_spec: &ReservoirSpec) -> f64 {
    let min_dead_volume = reservoir_spec.min_dead_volume_ul();
    let max_dead_volume = reservoir_spec.max_dead_volume_ul();
    if well_count <= DYNAMIC_DEAD_VOLUME_WELL_LIMIT {
        return min_dead_volume;
    }
    let additional_wells = (well_count - DYNAMIC_DEAD_VOLUME_WELL_LIMIT) as f64;
    let dead_volume = min_dead_volume + (additional_wells * DEAD_VOLUME_COEFFICIENT).ceil();
    dead_volume.min(max_dead_volume)
}
