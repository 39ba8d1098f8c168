//! # Core Module
//!
//! Stateless building blocks of transfection planning.
//!
//! - **Supporting models** ([`models`]) - Rack shapes and coordinates, molecule types and
//!   pools, pipetting and reservoir specifications
//! - **Parameters** ([`parameters`]) - Position types, transfection parameters with their
//!   per-type validity table, dilution constants and the volume calculator
//! - **Positions** ([`position`]) - One validated source well and its liquid hashes
//! - **Layouts** ([`layout`]) - Positions over a rack shape and their tag-based projection
//! - **Utilities** ([`utils`]) - Rounding, number formatting and identifier lookup tables

pub mod layout;
pub mod models;
pub mod parameters;
pub mod position;
pub mod utils;
