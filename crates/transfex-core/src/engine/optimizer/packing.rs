use super::hashing::min_row_distance;
use super::subcolumn::TargetSubcolumn;
use crate::core::layout::TransfectionLayout;
use crate::core::models::rack::{RackPosition, RackShape};
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use tracing::{debug, trace};

/// Rows of one source column that a head can aspirate in one move.
#[derive(Debug, Clone)]
pub(crate) struct SourceSubcolumn {
    pub column_index: usize,
    pub offset: usize,
    free_rows: VecDeque<usize>,
}

impl SourceSubcolumn {
    fn new(column_index: usize, offset: usize, number_rows: usize, step: usize) -> Self {
        Self {
            column_index,
            offset,
            free_rows: (offset..number_rows).step_by(step).collect(),
        }
    }

    pub fn free_count(&self) -> usize {
        self.free_rows.len()
    }

    fn take_row(&mut self) -> Option<usize> {
        self.free_rows.pop_front()
    }
}

/// Source subcolumns of a shape, column by column and offset by offset.
pub(crate) fn source_subcolumns(shape: RackShape) -> Vec<SourceSubcolumn> {
    let distance = min_row_distance(shape);
    let step = distance + 1;
    (0..shape.number_columns())
        .flat_map(|column| {
            (0..=distance).map(move |offset| {
                SourceSubcolumn::new(column, offset, shape.number_rows(), step)
            })
        })
        .filter(|subcolumn| subcolumn.free_count() > 0)
        .collect()
}

/// Places target subcolumns on source subcolumns, longest first.
pub(crate) fn pack(
    subcolumns: Vec<TargetSubcolumn<'_>>,
    source_shape: RackShape,
    reporter: &ProgressReporter,
) -> Result<TransfectionLayout, EngineError> {
    let total_items: usize = subcolumns.iter().map(TargetSubcolumn::len).sum();
    reporter.report(Progress::TaskStart {
        total_steps: total_items as u64,
    });

    let mut buckets: BTreeMap<usize, Vec<TargetSubcolumn<'_>>> = BTreeMap::new();
    for subcolumn in subcolumns.into_iter().filter(|s| !s.items.is_empty()) {
        buckets.entry(subcolumn.len()).or_default().push(subcolumn);
    }

    let mut sources = source_subcolumns(source_shape);
    // Source columns already serving each target column.
    let mut column_usage: HashMap<usize, BTreeSet<usize>> = HashMap::new();
    let mut layout = TransfectionLayout::new(source_shape);

    while let Some(mut subcolumn) = next_subcolumn(&mut buckets) {
        let blocked = column_usage.entry(subcolumn.column_index).or_default();
        let source_index = choose_source(&sources, subcolumn.len(), blocked).ok_or_else(|| {
            EngineError::PackingBug(format!(
                "no free source position left for subcolumn '{}'",
                subcolumn.hash_value()
            ))
        })?;
        let source = &mut sources[source_index];
        trace!(
            "Target column {} uses source column {} at row offset {}.",
            subcolumn.column_index + 1,
            source.column_index + 1,
            source.offset
        );

        if source.free_count() < subcolumn.len() {
            let remainder = subcolumn.split_off(source.free_count());
            debug!(
                "Split subcolumn of target column {} at {}; {} items remain.",
                subcolumn.column_index,
                subcolumn.len(),
                remainder.len()
            );
            buckets.entry(remainder.len()).or_default().push(remainder);
        }

        for item in &subcolumn.items {
            let row = source.take_row().ok_or_else(|| {
                EngineError::PackingBug(format!(
                    "source column {} ran out of rows",
                    source.column_index + 1
                ))
            })?;
            let rack_position = RackPosition::from_indices(row, source.column_index);
            trace!("Placing '{}' at {}.", item.hash, rack_position);
            layout.add(item.position.relocated(rack_position))?;
            reporter.report(Progress::TaskIncrement);
        }
        blocked.insert(source.column_index);
    }

    reporter.report(Progress::TaskFinish);
    Ok(layout)
}

/// Removes the subcolumn with the smallest hash from the bucket of longest subcolumns.
fn next_subcolumn<'a>(
    buckets: &mut BTreeMap<usize, Vec<TargetSubcolumn<'a>>>,
) -> Option<TargetSubcolumn<'a>> {
    let mut entry = buckets.last_entry()?;
    let index = entry
        .get()
        .iter()
        .enumerate()
        .min_by_key(|(_, subcolumn)| subcolumn.hash_value())
        .map(|(index, _)| index)?;
    let subcolumn = entry.get_mut().remove(index);
    if entry.get().is_empty() {
        entry.remove();
    }
    Some(subcolumn)
}

/// Picks a source subcolumn for `length` items: an exact fit, else the tightest larger
/// one, else the largest smaller one (the caller splits). Source columns in `blocked`
/// are avoided as long as a choice exists without them.
fn choose_source(
    sources: &[SourceSubcolumn],
    length: usize,
    blocked: &BTreeSet<usize>,
) -> Option<usize> {
    let open = |s: &SourceSubcolumn| !blocked.contains(&s.column_index);
    let any = |_: &SourceSubcolumn| true;

    exact_fit(sources, length, open)
        .or_else(|| best_fit(sources, length, open))
        .or_else(|| exact_fit(sources, length, any))
        .or_else(|| best_fit(sources, length, any))
        .or_else(|| largest_partial(sources, length, open))
        .or_else(|| largest_partial(sources, length, any))
}

fn exact_fit(
    sources: &[SourceSubcolumn],
    length: usize,
    allowed: impl Fn(&SourceSubcolumn) -> bool,
) -> Option<usize> {
    sources
        .iter()
        .position(|s| allowed(s) && s.free_count() == length)
}

fn best_fit(
    sources: &[SourceSubcolumn],
    length: usize,
    allowed: impl Fn(&SourceSubcolumn) -> bool,
) -> Option<usize> {
    sources
        .iter()
        .enumerate()
        .filter(|(_, s)| allowed(s) && s.free_count() > length)
        .min_by_key(|(_, s)| s.free_count())
        .map(|(index, _)| index)
}

fn largest_partial(
    sources: &[SourceSubcolumn],
    length: usize,
    allowed: impl Fn(&SourceSubcolumn) -> bool,
) -> Option<usize> {
    sources
        .iter()
        .enumerate()
        .filter(|(_, s)| allowed(s) && s.free_count() > 0 && s.free_count() < length)
        .min_by_key(|(_, s)| Reverse(s.free_count()))
        .map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::position::{PoolId, TransfectionPosition};
    use crate::engine::optimizer::subcolumn::TransferItem;

    fn wells(count: usize) -> Vec<TransfectionPosition> {
        (0..count)
            .map(|i| {
                TransfectionPosition::builder(RackPosition::from_indices(i % 8, i / 8))
                    .pool(PoolId::floating(i + 1))
                    .build()
                    .unwrap()
            })
            .collect()
    }

    fn subcolumn<'a>(
        column_index: usize,
        wells: &'a [TransfectionPosition],
    ) -> TargetSubcolumn<'a> {
        TargetSubcolumn::new(
            column_index,
            wells
                .iter()
                .map(|p| TransferItem::new(p, p.full_hash()))
                .collect(),
        )
    }

    #[test]
    fn source_subcolumns_interleave_rows_on_384_plates() {
        let subcolumns = source_subcolumns(RackShape::SHAPE_384);
        assert_eq!(subcolumns.len(), 48);
        assert_eq!(subcolumns[0].free_rows, [0, 2, 4, 6, 8, 10, 12, 14]);
        assert_eq!(subcolumns[1].free_rows, [1, 3, 5, 7, 9, 11, 13, 15]);
        assert_eq!(subcolumns[1].column_index, 0);
        assert_eq!(subcolumns[2].column_index, 1);
    }

    #[test]
    fn source_subcolumns_cover_whole_columns_on_96_plates() {
        let subcolumns = source_subcolumns(RackShape::SHAPE_96);
        assert_eq!(subcolumns.len(), 12);
        assert!(subcolumns.iter().all(|s| s.free_count() == 8));
        assert!(subcolumns.iter().all(|s| s.offset == 0));
    }

    #[test]
    fn source_subcolumn_offset_is_its_first_free_row() {
        let subcolumns = source_subcolumns(RackShape::SHAPE_384);
        for (index, subcolumn) in subcolumns.iter().enumerate() {
            assert_eq!(subcolumn.column_index, index / 2);
            assert_eq!(subcolumn.offset, index % 2);
            assert_eq!(subcolumn.free_rows.front(), Some(&subcolumn.offset));
        }
    }

    #[test]
    fn exact_fit_is_preferred_over_larger_subcolumns() {
        let mut sources = source_subcolumns(RackShape::SHAPE_96);
        sources[0].free_rows.truncate(3);
        sources[1].free_rows.truncate(4);
        assert_eq!(choose_source(&sources, 4, &BTreeSet::new()), Some(1));
        assert_eq!(choose_source(&sources, 2, &BTreeSet::new()), Some(0));
    }

    #[test]
    fn oversized_subcolumn_takes_the_largest_partial_source() {
        let mut sources = source_subcolumns(RackShape::SHAPE_96);
        sources.truncate(2);
        sources[0].free_rows.truncate(3);
        sources[1].free_rows.truncate(5);
        assert_eq!(choose_source(&sources, 7, &BTreeSet::new()), Some(1));
    }

    #[test]
    fn blocked_columns_are_avoided_while_possible() {
        let sources = source_subcolumns(RackShape::SHAPE_96);
        assert_eq!(choose_source(&sources, 8, &BTreeSet::from([0])), Some(1));
        let all_blocked: BTreeSet<usize> = (0..12).collect();
        assert_eq!(choose_source(&sources, 8, &all_blocked), Some(0));
    }

    #[test]
    fn longest_subcolumns_are_packed_first() {
        let long = wells(5);
        let short = wells(11)[8..].to_vec();
        let subcolumns = vec![subcolumn(1, &short), subcolumn(0, &long)];
        let layout = pack(subcolumns, RackShape::SHAPE_96, &ProgressReporter::new()).unwrap();
        assert_eq!(layout.len(), 8);
        for row in 0..5 {
            let placed = layout.get(RackPosition::from_indices(row, 0)).unwrap();
            assert_eq!(placed.full_hash(), long[row].full_hash());
        }
        // The short subcolumn exactly fills the rest of the first source column.
        for row in 5..8 {
            assert!(layout.get(RackPosition::from_indices(row, 0)).is_some());
        }
    }

    #[test]
    fn too_many_items_are_reported() {
        let many = wells(96);
        let mut subcolumns: Vec<TargetSubcolumn<'_>> = many
            .chunks(8)
            .enumerate()
            .map(|(column, chunk)| subcolumn(column, chunk))
            .collect();
        let extra = wells(97)[96..].to_vec();
        subcolumns.push(subcolumn(0, &extra));
        let result = pack(subcolumns, RackShape::SHAPE_96, &ProgressReporter::new());
        assert!(matches!(result, Err(EngineError::PackingBug(_))));
    }
}
