use super::DesignRack;
use super::hashing::needs_source;
use crate::core::layout::TransfectionLayout;
use crate::core::models::rack::{RackPosition, RackShape};
use crate::core::position::{HashKind, TransfectionPosition};
use crate::engine::error::EngineError;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// Tries to reuse the design rack coordinates as source coordinates.
///
/// Returns `None` as soon as two different liquids compete for one coordinate, a liquid
/// of a later design rack sits somewhere the first rack did not put it, or a design rack
/// does not have the source shape.
pub(crate) fn try_assign(
    design_racks: &[DesignRack],
    source_shape: RackShape,
    hash_kind: HashKind,
) -> Result<Option<TransfectionLayout>, EngineError> {
    if let Some(rack) = design_racks
        .iter()
        .find(|rack| rack.layout.shape() != source_shape)
    {
        debug!(
            "Design rack '{}' has shape {}, source needs {}; skipping one-to-one assignment.",
            rack.label,
            rack.layout.shape(),
            source_shape
        );
        return Ok(None);
    }

    let mut hash_to_rack_positions: HashMap<String, Vec<RackPosition>> = HashMap::new();
    let mut used_rack_positions: BTreeMap<RackPosition, &TransfectionPosition> = BTreeMap::new();
    // Additional first-rack occurrences; no other liquid may claim them.
    let mut reserved: HashSet<RackPosition> = HashSet::new();

    for (rack_index, rack) in design_racks.iter().enumerate() {
        for position in rack.layout.sorted_positions() {
            if !needs_source(position) {
                continue;
            }
            let rack_position = position.rack_position();
            let hash = position.hash_value(hash_kind);
            match hash_to_rack_positions.get_mut(&hash) {
                None => {
                    if used_rack_positions.contains_key(&rack_position)
                        || reserved.contains(&rack_position)
                    {
                        debug!(
                            "Position {} of rack '{}' is already taken; one-to-one assignment aborted.",
                            rack_position, rack.label
                        );
                        return Ok(None);
                    }
                    used_rack_positions.insert(rack_position, position);
                    hash_to_rack_positions.insert(hash, vec![rack_position]);
                }
                Some(known) if rack_index == 0 => {
                    known.push(rack_position);
                    reserved.insert(rack_position);
                }
                Some(known) => {
                    if !known.contains(&rack_position) {
                        debug!(
                            "Liquid '{}' moved to {} in rack '{}'; one-to-one assignment aborted.",
                            hash, rack_position, rack.label
                        );
                        return Ok(None);
                    }
                }
            }
        }
    }

    let mut layout = TransfectionLayout::new(source_shape);
    for position in used_rack_positions.into_values() {
        layout.add(position.clone())?;
    }
    Ok(Some(layout))
}
