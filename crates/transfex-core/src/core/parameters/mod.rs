//! # Transfection Parameters
//!
//! The attributes of a transfection position, their validity rules per position type,
//! and the dilution constants and calculations that turn an experiment design into
//! ISO volumes and concentrations.
//!
//! Volumes are given in ul and concentrations in nM throughout.
//!
//! - [`parameter`] - Position types, parameter enumeration, aliases and validity table
//! - [`calculator`] - Mastermix, ISO volume and concentration formulas

use crate::core::models::molecule::MoleculeType;

pub mod calculator;
pub mod parameter;

/// Volume transferred into each well of the cell plate, in ul.
pub const TRANSFER_VOLUME: f64 = 5.0;
/// The reagent mastermix is diluted 1:2 with the reagent dilution.
pub const REAGENT_MM_DILUTION_FACTOR: f64 = 2.0;
/// Dilution by the cell suspension in the cell plate.
pub const CELL_DILUTION_FACTOR: f64 = 7.0;
pub const MIRNA_OPTIMEM_DILUTION_FACTOR: f64 = 3.0;
pub const STANDARD_OPTIMEM_DILUTION_FACTOR: f64 = 4.0;
/// Lower bound for any computed ISO volume, in ul.
pub const MINIMUM_ISO_VOLUME: f64 = 1.0;
/// Used to pick the OptiMem factor of mock (and library) wells without a pool.
pub const DEFAULT_MOCK_MOLECULE_TYPE: MoleculeType = MoleculeType::SiRna;
/// ISO volumes are rounded up to this many decimal places.
pub const ISO_VOLUME_DECIMALS: u32 = 1;
