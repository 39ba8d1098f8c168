//! # Workflows Module
//!
//! Top-level entry points that run a complete planning procedure.
//!
//! - **Planning Workflow** ([`plan`]) - Optimizes the source layout of a set of design racks
//!   and fills in OptiMem factors, ISO volumes and ISO concentrations, collecting every
//!   non-fatal warning on the way.

pub mod plan;
