use crate::core::position::TransfectionPosition;
use itertools::Itertools;
use std::collections::HashSet;

/// A target well waiting for a source position.
#[derive(Debug, Clone)]
pub(crate) struct TransferItem<'a> {
    pub position: &'a TransfectionPosition,
    pub hash: String,
}

impl<'a> TransferItem<'a> {
    pub fn new(position: &'a TransfectionPosition, hash: String) -> Self {
        Self { position, hash }
    }

    pub fn row_index(&self) -> usize {
        self.position.rack_position().row_index
    }
}

/// Transfer items of one target column that can be served in a single head move.
#[derive(Debug, Clone)]
pub(crate) struct TargetSubcolumn<'a> {
    pub column_index: usize,
    pub items: Vec<TransferItem<'a>>,
}

impl<'a> TargetSubcolumn<'a> {
    pub fn new(column_index: usize, items: Vec<TransferItem<'a>>) -> Self {
        Self {
            column_index,
            items,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Column index followed by the item hashes, used to order subcolumns of equal length.
    pub fn hash_value(&self) -> String {
        format!(
            "{}-{}",
            self.column_index,
            self.items.iter().map(|item| item.hash.as_str()).join("-")
        )
    }

    /// Splits off the items from `at` onwards into a new subcolumn of the same column.
    pub fn split_off(&mut self, at: usize) -> TargetSubcolumn<'a> {
        TargetSubcolumn::new(self.column_index, self.items.split_off(at))
    }
}

/// Target wells of one column of one design rack, sorted by row.
#[derive(Debug, Clone)]
pub(crate) struct TargetColumn<'a> {
    pub rack_index: usize,
    pub column_index: usize,
    pub min_row_distance: usize,
    pub items: Vec<TransferItem<'a>>,
}

/// Greedily distributes the row-sorted items of a column over subcolumns whose row
/// indices differ by more than `min_row_distance`.
pub(crate) fn partition_column<'a>(
    column_index: usize,
    items: Vec<TransferItem<'a>>,
    min_row_distance: usize,
) -> Vec<TargetSubcolumn<'a>> {
    let mut subcolumns: Vec<TargetSubcolumn<'a>> = Vec::new();
    for item in items {
        let row = item.row_index();
        let slot = subcolumns.iter().position(|subcolumn| {
            subcolumn
                .items
                .last()
                .is_some_and(|last| row > last.row_index() + min_row_distance)
        });
        match slot {
            Some(index) => subcolumns[index].items.push(item),
            None => subcolumns.push(TargetSubcolumn::new(column_index, vec![item])),
        }
    }
    subcolumns
}

/// Builds the target subcolumns of all design racks.
///
/// Every hash is kept once, in the first subcolumn it shows up in. Subcolumns of the
/// first design rack are stored as they are; later racks top up stored subcolumns of
/// the same target column (up to `source_rows` items) before opening new ones.
pub(crate) fn extract_subcolumns<'a>(
    columns: Vec<TargetColumn<'a>>,
    source_rows: usize,
) -> Vec<TargetSubcolumn<'a>> {
    let first_rack = columns.first().map(|column| column.rack_index);
    let mut stored: Vec<TargetSubcolumn<'a>> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for column in columns {
        let is_first_rack = Some(column.rack_index) == first_rack;
        let column_index = column.column_index;
        for subcolumn in partition_column(column_index, column.items, column.min_row_distance) {
            let fresh: Vec<TransferItem<'a>> = subcolumn
                .items
                .into_iter()
                .filter(|item| seen.insert(item.hash.clone()))
                .collect();
            if fresh.is_empty() {
                continue;
            }
            if is_first_rack {
                stored.push(TargetSubcolumn::new(column_index, fresh));
                continue;
            }

            let mut remaining = fresh.into_iter();
            let mut exhausted = false;
            for existing in stored
                .iter_mut()
                .filter(|existing| existing.column_index == column_index)
            {
                while existing.len() < source_rows {
                    match remaining.next() {
                        Some(item) => existing.items.push(item),
                        None => {
                            exhausted = true;
                            break;
                        }
                    }
                }
                if exhausted {
                    break;
                }
            }
            let rest: Vec<TransferItem<'a>> = remaining.collect();
            if !rest.is_empty() {
                stored.push(TargetSubcolumn::new(column_index, rest));
            }
        }
    }
    stored
}
