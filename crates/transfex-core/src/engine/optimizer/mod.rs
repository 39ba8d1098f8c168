//! Source layout optimization.
//!
//! The optimizer turns the transfection layouts of the design racks (the target plates)
//! into a source layout holding every distinct liquid exactly once. It first tries to
//! reuse the design rack coordinates directly; otherwise it cuts every target column
//! into subcolumns a robot head can dispense in one move and packs those into source
//! columns it can aspirate in one move.

mod hashing;
mod one_to_one;
mod packing;
mod subcolumn;

pub use hashing::min_row_distance;

use crate::core::layout::TransfectionLayout;
use crate::core::models::rack::RackShape;
use crate::engine::config::OptimizerConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use tracing::{debug, info, instrument};

/// Largest number of distinct liquids that fit on a source plate.
pub const MAX_SOURCE_POSITIONS: usize = 384;

/// A target plate design and its transfection layout.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignRack {
    pub label: String,
    pub layout: TransfectionLayout,
}

impl DesignRack {
    pub fn new(label: impl Into<String>, layout: TransfectionLayout) -> Self {
        Self {
            label: label.into(),
            layout,
        }
    }
}

/// Smallest standard shape holding `hash_count` source positions.
pub fn select_source_shape(hash_count: usize) -> Result<RackShape, EngineError> {
    if hash_count <= RackShape::SHAPE_96.size() {
        Ok(RackShape::SHAPE_96)
    } else if hash_count <= MAX_SOURCE_POSITIONS {
        Ok(RackShape::SHAPE_384)
    } else {
        Err(EngineError::TooManySources {
            found: hash_count,
            max: MAX_SOURCE_POSITIONS,
        })
    }
}

#[instrument(skip_all, name = "source_layout_optimizer", fields(design_racks = design_racks.len()))]
pub fn optimize(
    design_racks: &[DesignRack],
    config: &OptimizerConfig,
    reporter: &ProgressReporter,
) -> Result<TransfectionLayout, EngineError> {
    let collected = reporter.phase("Hash collection", || {
        hashing::collect(design_racks, config.hash_kind)
    });
    let hash_count = collected.hashes.len();
    if hash_count == 0 {
        return Err(EngineError::NoSourcePositions);
    }
    let source_shape = select_source_shape(hash_count)?;
    info!(
        "Found {} distinct liquids; using a {} source plate.",
        hash_count, source_shape
    );

    if config.allow_one_to_one {
        let shortcut = reporter.phase("One-to-one assignment", || {
            one_to_one::try_assign(design_racks, source_shape, config.hash_kind)
        })?;
        if let Some(layout) = shortcut {
            info!("Design rack coordinates reused as source layout.");
            return Ok(layout);
        }
        debug!("One-to-one assignment not possible; packing subcolumns.");
    }

    let subcolumns = reporter.phase("Subcolumn extraction", || {
        subcolumn::extract_subcolumns(collected.columns, source_shape.number_rows())
    });
    debug!("Extracted {} target subcolumns.", subcolumns.len());

    reporter.report(Progress::PhaseStart {
        name: "Source column packing",
    });
    let layout = packing::pack(subcolumns, source_shape, reporter)?;
    reporter.report(Progress::PhaseFinish);

    if layout.len() != hash_count {
        return Err(EngineError::PackingBug(format!(
            "placed {} source positions for {} distinct liquids",
            layout.len(),
            hash_count
        )));
    }
    info!("Packed {} liquids into the source layout.", layout.len());
    Ok(layout)
}
