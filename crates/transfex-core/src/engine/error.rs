use thiserror::Error;

use super::config::ConfigError;
use crate::core::layout::LayoutError;
use crate::core::parameters::calculator::CalculationError;
use crate::core::position::PositionError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Too many distinct source positions: found {found}, at most {max} fit on a source plate")]
    TooManySources { found: usize, max: usize },

    #[error("Source layout packing failed: {0}")]
    PackingBug(String),

    #[error("The design racks do not contain any position that needs a source well")]
    NoSourcePositions,

    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Layout error: {source}")]
    Layout {
        #[from]
        source: LayoutError,
    },

    #[error("Position error: {source}")]
    Position {
        #[from]
        source: PositionError,
    },

    #[error("Calculation failed: {source}")]
    Calculation {
        #[from]
        source: CalculationError,
    },
}
