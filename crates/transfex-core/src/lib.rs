//! # Transfex Core Library
//!
//! Plans the source plates ("ISO plates") of RNAi transfection experiments run on a
//! liquid-handling robot: it validates the transfection layouts of the target plates,
//! collapses them into a compact source layout the robot can aspirate in few head moves,
//! and computes the volumes and concentrations needed for every source well.
//!
//! ## Architecture
//!
//! - **[`core`]: The Foundation.** Stateless data models (`TransfectionPosition`,
//!   `TransfectionLayout`), the parameter tables and the pure volume calculator.
//!
//! - **[`engine`]: The Logic Core.** The source layout optimizer with its one-to-one
//!   shortcut and subcolumn packing, plus configuration, errors and progress reporting.
//!
//! - **[`workflows`]: The Public API.** End-to-end planning that ties the optimizer and the
//!   calculator together and returns the source layout with per-well volume summaries.

pub mod core;
pub mod engine;
pub mod workflows;
