//! Transfection layouts: rack coordinates mapped to transfection positions, and their
//! projection onto the tag-based rack layouts used by downstream tools.

pub mod rack_layout;

use crate::core::models::molecule::PoolCatalog;
use crate::core::models::rack::{RackPosition, RackShape};
use crate::core::parameters::parameter::{
    LIBRARY_MARKER, MOCK_MARKER, NONE_MARKER, PositionType, RawValue, TransfectionParameter,
    UNTRANSFECTED_MARKER, UNTREATED_MARKER, value_rule,
};
use crate::core::position::{PoolId, PositionError, TransfectionPosition};
use rack_layout::{RackLayout, Tag};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum LayoutError {
    #[error("Rack position {0} is already occupied")]
    PositionOccupied(RackPosition),
    #[error("Rack position {rack_position} lies outside of the {shape} rack")]
    OutOfBounds {
        rack_position: RackPosition,
        shape: RackShape,
    },
    #[error("Rack shape mismatch: expected {expected}, found {found}")]
    ShapeMismatch { expected: RackShape, found: RackShape },
    #[error("Cannot parse tag '{predicate}' = '{value}' at {rack_position}")]
    TagParsing {
        rack_position: RackPosition,
        predicate: String,
        value: String,
    },
    #[error("Unknown molecule design pool {0}")]
    UnknownPool(u32),
    #[error(transparent)]
    Position(#[from] PositionError),
}

/// Positions of one plate over a fixed rack shape.
#[derive(Debug, Clone, PartialEq)]
pub struct TransfectionLayout {
    shape: RackShape,
    positions: BTreeMap<RackPosition, TransfectionPosition>,
}

impl TransfectionLayout {
    pub fn new(shape: RackShape) -> Self {
        Self {
            shape,
            positions: BTreeMap::new(),
        }
    }

    pub fn shape(&self) -> RackShape {
        self.shape
    }

    pub fn add(&mut self, position: TransfectionPosition) -> Result<(), LayoutError> {
        let rack_position = position.rack_position();
        if !self.shape.contains(rack_position) {
            return Err(LayoutError::OutOfBounds {
                rack_position,
                shape: self.shape,
            });
        }
        if self.positions.contains_key(&rack_position) {
            return Err(LayoutError::PositionOccupied(rack_position));
        }
        self.positions.insert(rack_position, position);
        Ok(())
    }

    pub fn remove(&mut self, rack_position: RackPosition) -> Option<TransfectionPosition> {
        self.positions.remove(&rack_position)
    }

    pub fn get(&self, rack_position: RackPosition) -> Option<&TransfectionPosition> {
        self.positions.get(&rack_position)
    }

    pub fn get_mut(&mut self, rack_position: RackPosition) -> Option<&mut TransfectionPosition> {
        self.positions.get_mut(&rack_position)
    }

    pub fn positions(&self) -> impl Iterator<Item = &TransfectionPosition> {
        self.positions.values()
    }

    pub fn positions_mut(&mut self) -> impl Iterator<Item = &mut TransfectionPosition> {
        self.positions.values_mut()
    }

    /// Positions in row-major order.
    pub fn sorted_positions(&self) -> Vec<&TransfectionPosition> {
        self.positions.values().collect()
    }

    pub fn rack_positions(&self) -> impl Iterator<Item = RackPosition> + '_ {
        self.positions.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn has_iso_volumes(&self) -> bool {
        self.positions()
            .any(|p| !p.is_empty() && p.iso_volume().is_some())
    }

    pub fn has_iso_concentrations(&self) -> bool {
        self.positions()
            .any(|p| !p.is_empty() && !p.is_mock() && p.iso_concentration().is_some())
    }

    pub fn has_final_concentrations(&self) -> bool {
        self.positions()
            .any(|p| !p.is_empty() && !p.is_mock() && p.final_concentration().is_some())
    }

    /// Compares the layouts with untreated, untransfected and empty wells removed.
    pub fn compare_ignoring_untreated(&self, other: &TransfectionLayout) -> bool {
        fn treated(
            layout: &TransfectionLayout,
        ) -> impl Iterator<Item = &TransfectionPosition> {
            layout
                .positions()
                .filter(|p| !p.is_empty() && !p.is_untreated_type())
        }
        self.shape == other.shape && treated(self).eq(treated(other))
    }

    pub fn to_rack_layout(&self, user: &str) -> RackLayout {
        RackLayout::from_tag_map(self.shape, &self.tag_map(), user)
    }

    /// Projects the layout and adds `additional_tags` before grouping.
    pub fn merge_rack_layout(
        &self,
        additional_tags: &BTreeMap<Tag, BTreeSet<RackPosition>>,
        user: &str,
    ) -> RackLayout {
        let mut tag_map = self.tag_map();
        for (tag, positions) in additional_tags {
            tag_map
                .entry(tag.clone())
                .or_default()
                .extend(positions.iter().copied());
        }
        RackLayout::from_tag_map(self.shape, &tag_map, user)
    }

    /// Adds the screening tags of an ISO request layout to an experiment layout.
    pub fn complete_with_screening_tags(
        experiment_layout: &mut RackLayout,
        iso_request_layout: &RackLayout,
        user: &str,
    ) {
        experiment_layout.complete_with_screening_tags(iso_request_layout, user);
    }

    /// Parses a tag-based rack layout back into transfection positions.
    ///
    /// Only tags of the transfection domain are read; predicates may use any alias.
    /// Positions without a pool tag are skipped unless they are explicitly typed empty.
    pub fn from_rack_layout(
        rack_layout: &RackLayout,
        catalog: &impl PoolCatalog,
    ) -> Result<Self, LayoutError> {
        let mut layout = Self::new(rack_layout.shape());
        for rack_position in rack_layout.rack_positions() {
            let values: BTreeMap<TransfectionParameter, &str> = rack_layout
                .tags_for_position(rack_position)
                .into_iter()
                .filter_map(|tag| tag.parameter().map(|p| (p, tag.value.as_str())))
                .collect();
            if let Some(position) = parse_position(rack_position, &values, catalog)? {
                layout.add(position)?;
            }
        }
        Ok(layout)
    }

    fn tag_map(&self) -> BTreeMap<Tag, BTreeSet<RackPosition>> {
        let mut tag_map: BTreeMap<Tag, BTreeSet<RackPosition>> = BTreeMap::new();
        for position in self.positions().filter(|p| !p.is_empty()) {
            for parameter in TransfectionParameter::ALL {
                if let Some(value) = position.tag_value(parameter) {
                    tag_map
                        .entry(Tag::transfection(parameter, value))
                        .or_default()
                        .insert(position.rack_position());
                }
            }
        }
        tag_map
    }
}

fn parse_position(
    rack_position: RackPosition,
    values: &BTreeMap<TransfectionParameter, &str>,
    catalog: &impl PoolCatalog,
) -> Result<Option<TransfectionPosition>, LayoutError> {
    let tag_error = |parameter: TransfectionParameter, value: &str| LayoutError::TagParsing {
        rack_position,
        predicate: parameter.predicate().to_string(),
        value: value.to_string(),
    };

    let position_type = values
        .get(&TransfectionParameter::PositionType)
        .map(|value| {
            value
                .parse::<PositionType>()
                .map_err(|_| tag_error(TransfectionParameter::PositionType, value))
        })
        .transpose()?;

    let pool = match values
        .get(&TransfectionParameter::MoleculeDesignPool)
        .filter(|value| !is_absent_marker(value))
    {
        Some(value) => Some(parse_pool(value, catalog).ok_or_else(|| {
            match value.trim().parse::<u32>() {
                Ok(id) => LayoutError::UnknownPool(id),
                Err(_) => tag_error(TransfectionParameter::MoleculeDesignPool, value),
            }
        })?),
        None => None,
    };

    let Some(pool) = pool else {
        return match position_type {
            Some(PositionType::Empty) => Ok(Some(TransfectionPosition::empty(rack_position))),
            Some(other) => Err(tag_error(TransfectionParameter::PositionType, other.name())),
            None => Ok(None),
        };
    };

    // Markers stand in for absent numbers only where the type allows them, e.g. `mock`
    // as final concentration of a mock position.
    let effective_type = position_type.unwrap_or_else(|| pool.position_type());
    let number = |parameter: TransfectionParameter| -> Result<Option<f64>, LayoutError> {
        let Some(value) = values.get(&parameter).filter(|value| !is_absent_marker(value)) else {
            return Ok(None);
        };
        if let Ok(number) = value.trim().parse::<f64>() {
            return Ok(Some(number));
        }
        let text = RawValue::from_text(Some(value.trim()));
        match value_rule(parameter, effective_type) {
            Some(rule) if is_marker(value) && rule.accepts(text) => Ok(None),
            Some(rule) if is_marker(value) => Err(PositionError::InvalidPositionValue {
                rack_position,
                parameter,
                value: value.trim().to_string(),
                reason: format!("expected {}", rule.describe()),
            }
            .into()),
            _ => Err(tag_error(parameter, value)),
        }
    };

    let mut builder = TransfectionPosition::builder(rack_position)
        .pool(pool)
        .reagent_dilution_factor(number(TransfectionParameter::ReagentDilutionFactor)?)
        .iso_volume(number(TransfectionParameter::IsoVolume)?)
        .iso_concentration(number(TransfectionParameter::IsoConcentration)?)
        .final_concentration(number(TransfectionParameter::FinalConcentration)?)
        .optimem_dilution_factor(number(TransfectionParameter::OptimemDilutionFactor)?);
    if let Some(position_type) = position_type {
        builder = builder.position_type(position_type);
    }
    if let Some(name) = values
        .get(&TransfectionParameter::ReagentName)
        .filter(|value| !is_absent_marker(value))
    {
        builder = builder.reagent_name(name.trim());
    }
    Ok(Some(builder.build()?))
}

fn parse_pool(value: &str, catalog: &impl PoolCatalog) -> Option<PoolId> {
    let value = value.trim();
    let marker = value.to_ascii_lowercase();
    match marker.as_str() {
        MOCK_MARKER => Some(PoolId::Mock),
        LIBRARY_MARKER => Some(PoolId::Library),
        UNTREATED_MARKER => Some(PoolId::Untreated),
        UNTRANSFECTED_MARKER => Some(PoolId::Untransfected),
        _ if PoolId::is_floating_placeholder(value) => Some(PoolId::Floating(value.to_string())),
        _ => value
            .parse::<u32>()
            .ok()
            .and_then(|id| catalog.pool(id))
            .map(PoolId::Pool),
    }
}

fn is_absent_marker(value: &str) -> bool {
    value.trim().is_empty() || value.trim() == NONE_MARKER
}

fn is_marker(value: &str) -> bool {
    let value = value.trim();
    [NONE_MARKER, MOCK_MARKER, LIBRARY_MARKER, UNTREATED_MARKER, UNTRANSFECTED_MARKER]
        .iter()
        .any(|marker| value.eq_ignore_ascii_case(marker))
}
