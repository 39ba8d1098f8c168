use super::DesignRack;
use super::subcolumn::{TargetColumn, TransferItem};
use crate::core::models::rack::RackShape;
use crate::core::position::{HashKind, TransfectionPosition};
use std::collections::{BTreeMap, BTreeSet};

/// Distinct liquid hashes and the target wells of every design rack column.
#[derive(Debug)]
pub(crate) struct CollectedHashes<'a> {
    pub hashes: BTreeSet<String>,
    pub columns: Vec<TargetColumn<'a>>,
}

/// Minimum row distance of a robot head on a plate of the given shape.
pub fn min_row_distance(shape: RackShape) -> usize {
    if shape == RackShape::SHAPE_384 { 1 } else { 0 }
}

pub(crate) fn needs_source(position: &TransfectionPosition) -> bool {
    position.position_type().requires_source()
}

pub(crate) fn collect(design_racks: &[DesignRack], hash_kind: HashKind) -> CollectedHashes<'_> {
    let mut hashes = BTreeSet::new();
    let mut grouped: BTreeMap<(usize, usize), Vec<TransferItem<'_>>> = BTreeMap::new();

    for (rack_index, rack) in design_racks.iter().enumerate() {
        for position in rack.layout.sorted_positions() {
            if !needs_source(position) {
                continue;
            }
            let hash = position.hash_value(hash_kind);
            hashes.insert(hash.clone());
            grouped
                .entry((rack_index, position.rack_position().column_index))
                .or_default()
                .push(TransferItem::new(position, hash));
        }
    }

    let columns = grouped
        .into_iter()
        .map(|((rack_index, column_index), items)| TargetColumn {
            rack_index,
            column_index,
            min_row_distance: min_row_distance(design_racks[rack_index].layout.shape()),
            items,
        })
        .collect();

    CollectedHashes { hashes, columns }
}
