//! # Core Models Module
//!
//! Plain data describing the physical world the planner works with: racks and well
//! coordinates, molecule types and design pools, and the specifications of liquid
//! handlers and source reservoirs.
//!
//! - [`rack`] - Rack shapes and row-major rack positions
//! - [`molecule`] - Molecule types, design pools and pool lookup
//! - [`specs`] - Pipetting and reservoir specifications, dead volume rules

pub mod molecule;
pub mod rack;
pub mod specs;
