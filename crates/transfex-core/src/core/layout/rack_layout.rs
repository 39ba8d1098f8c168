use crate::core::models::rack::{RackPosition, RackShape};
use crate::core::parameters::parameter::TransfectionParameter;
use crate::core::utils::identifiers::{lookup_parameter, normalize_identifier};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub const TRANSFECTION_DOMAIN: &str = "transfection";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tag {
    pub domain: String,
    pub predicate: String,
    pub value: String,
}

impl Tag {
    pub fn new(
        domain: impl Into<String>,
        predicate: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            predicate: predicate.into(),
            value: value.into(),
        }
    }

    pub fn transfection(parameter: TransfectionParameter, value: impl Into<String>) -> Self {
        Self::new(TRANSFECTION_DOMAIN, parameter.predicate(), value)
    }

    pub fn is_transfection(&self) -> bool {
        normalize_identifier(&self.domain) == TRANSFECTION_DOMAIN
    }

    /// The transfection parameter this tag describes, resolving predicate aliases.
    pub fn parameter(&self) -> Option<TransfectionParameter> {
        if !self.is_transfection() {
            return None;
        }
        lookup_parameter(&self.predicate)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}={}", self.domain, self.predicate, self.value)
    }
}

/// A set of rack positions, identified by the sorted labels of its members.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct RackPositionSet {
    positions: BTreeSet<RackPosition>,
}

impl RackPositionSet {
    pub fn new(positions: impl IntoIterator<Item = RackPosition>) -> Self {
        Self {
            positions: positions.into_iter().collect(),
        }
    }

    pub fn positions(&self) -> &BTreeSet<RackPosition> {
        &self.positions
    }

    pub fn contains(&self, rack_position: RackPosition) -> bool {
        self.positions.contains(&rack_position)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn hash_value(&self) -> String {
        self.positions.iter().map(RackPosition::label).join("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedRackPositionSet {
    pub tags: BTreeSet<Tag>,
    pub rack_position_set: RackPositionSet,
    pub user: String,
}

/// Tags attached to sets of rack positions, as exchanged with downstream tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RackLayout {
    shape: RackShape,
    tagged_sets: Vec<TaggedRackPositionSet>,
}

impl RackLayout {
    pub fn new(shape: RackShape) -> Self {
        Self {
            shape,
            tagged_sets: Vec::new(),
        }
    }

    /// Groups tags by the exact set of positions they apply to.
    pub fn from_tag_map(
        shape: RackShape,
        tag_map: &BTreeMap<Tag, BTreeSet<RackPosition>>,
        user: &str,
    ) -> Self {
        let mut by_set: BTreeMap<RackPositionSet, BTreeSet<Tag>> = BTreeMap::new();
        for (tag, positions) in tag_map {
            if positions.is_empty() {
                continue;
            }
            by_set
                .entry(RackPositionSet::new(positions.iter().copied()))
                .or_default()
                .insert(tag.clone());
        }

        let mut layout = Self::new(shape);
        for (rack_position_set, tags) in by_set {
            layout.tagged_sets.push(TaggedRackPositionSet {
                tags,
                rack_position_set,
                user: user.to_string(),
            });
        }
        layout
    }

    pub fn shape(&self) -> RackShape {
        self.shape
    }

    pub fn tagged_rack_position_sets(&self) -> &[TaggedRackPositionSet] {
        &self.tagged_sets
    }

    /// Adds tags for a position set, merging into an existing entry with the same
    /// position set hash.
    pub fn add_tagged_set(&mut self, tags: BTreeSet<Tag>, rack_position_set: RackPositionSet, user: &str) {
        if tags.is_empty() || rack_position_set.is_empty() {
            return;
        }
        let hash = rack_position_set.hash_value();
        if let Some(existing) = self
            .tagged_sets
            .iter_mut()
            .find(|set| set.rack_position_set.hash_value() == hash)
        {
            existing.tags.extend(tags);
            return;
        }
        self.tagged_sets.push(TaggedRackPositionSet {
            tags,
            rack_position_set,
            user: user.to_string(),
        });
    }

    pub fn tags_for_position(&self, rack_position: RackPosition) -> BTreeSet<&Tag> {
        self.tagged_sets
            .iter()
            .filter(|set| set.rack_position_set.contains(rack_position))
            .flat_map(|set| set.tags.iter())
            .collect()
    }

    pub fn rack_positions(&self) -> BTreeSet<RackPosition> {
        self.tagged_sets
            .iter()
            .flat_map(|set| set.rack_position_set.positions().iter().copied())
            .collect()
    }

    /// Copies every tag of `iso_request_layout` except ISO volumes and concentrations
    /// onto this layout.
    pub fn complete_with_screening_tags(&mut self, iso_request_layout: &RackLayout, user: &str) {
        for tagged_set in &iso_request_layout.tagged_sets {
            let tags: BTreeSet<Tag> = tagged_set
                .tags
                .iter()
                .filter(|tag| {
                    !matches!(
                        tag.parameter(),
                        Some(TransfectionParameter::IsoVolume | TransfectionParameter::IsoConcentration)
                    )
                })
                .cloned()
                .collect();
            self.add_tagged_set(tags, tagged_set.rack_position_set.clone(), user);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rp(label: &str) -> RackPosition {
        RackPosition::from_label(label).unwrap()
    }

    #[test]
    fn position_set_hash_concatenates_sorted_labels() {
        let set = RackPositionSet::new([rp("B1"), rp("A2"), rp("A1")]);
        assert_eq!(set.hash_value(), "A1A2B1");
    }

    #[test]
    fn tag_parameter_resolves_aliases_and_ignores_other_domains() {
        let tag = Tag::new("Transfection", "final conc", "10");
        assert_eq!(tag.parameter(), Some(TransfectionParameter::FinalConcentration));
        let foreign = Tag::new("sample", "final_concentration", "10");
        assert_eq!(foreign.parameter(), None);
    }

    #[test]
    fn tags_with_identical_positions_share_one_set() {
        let mut tag_map = BTreeMap::new();
        tag_map.insert(
            Tag::transfection(TransfectionParameter::ReagentName, "mix1"),
            BTreeSet::from([rp("A1"), rp("B1")]),
        );
        tag_map.insert(
            Tag::transfection(TransfectionParameter::ReagentDilutionFactor, "1400"),
            BTreeSet::from([rp("A1"), rp("B1")]),
        );
        tag_map.insert(
            Tag::transfection(TransfectionParameter::FinalConcentration, "10"),
            BTreeSet::from([rp("A1")]),
        );
        let layout = RackLayout::from_tag_map(RackShape::SHAPE_96, &tag_map, "it");
        assert_eq!(layout.tagged_rack_position_sets().len(), 2);
        assert_eq!(layout.tags_for_position(rp("A1")).len(), 3);
        assert_eq!(layout.tags_for_position(rp("B1")).len(), 2);
        assert_eq!(layout.rack_positions().len(), 2);
    }

    #[test]
    fn screening_completion_skips_iso_tags_and_merges_by_position_set() {
        let mut experiment = RackLayout::new(RackShape::SHAPE_96);
        experiment.add_tagged_set(
            BTreeSet::from([Tag::new("experiment", "cell_line", "HeLa")]),
            RackPositionSet::new([rp("A1")]),
            "it",
        );

        let mut iso_request = RackLayout::new(RackShape::SHAPE_96);
        iso_request.add_tagged_set(
            BTreeSet::from([
                Tag::transfection(TransfectionParameter::ReagentName, "mix1"),
                Tag::transfection(TransfectionParameter::IsoVolume, "5"),
            ]),
            RackPositionSet::new([rp("A1")]),
            "it",
        );
        iso_request.add_tagged_set(
            BTreeSet::from([Tag::transfection(TransfectionParameter::IsoConcentration, "500")]),
            RackPositionSet::new([rp("C3")]),
            "it",
        );

        experiment.complete_with_screening_tags(&iso_request, "it");
        assert_eq!(experiment.tagged_rack_position_sets().len(), 1);
        let tags = experiment.tags_for_position(rp("A1"));
        assert_eq!(tags.len(), 2);
        assert!(tags.iter().all(|t| t.predicate != "iso_volume"));
        assert!(experiment.tags_for_position(rp("C3")).is_empty());
    }
}
