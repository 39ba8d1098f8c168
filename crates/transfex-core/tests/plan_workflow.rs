use std::collections::{BTreeSet, HashMap};

use itertools::Itertools;
use transfex::core::layout::TransfectionLayout;
use transfex::core::models::molecule::{MoleculeDesignPool, MoleculeType};
use transfex::core::models::rack::{RackPosition, RackShape};
use transfex::core::models::specs::{PipettingSpec, ReservoirSpec};
use transfex::core::parameters::parameter::PositionType;
use transfex::core::position::{PoolId, TransfectionPosition};
use transfex::engine::config::{OptimizerConfigBuilder, PlanningConfig, PlanningConfigBuilder};
use transfex::engine::optimizer::DesignRack;
use transfex::engine::progress::ProgressReporter;
use transfex::workflows::plan;

fn catalog() -> HashMap<u32, MoleculeDesignPool> {
    (1..=40)
        .map(|id| {
            let molecule_type = if id % 5 == 0 {
                MoleculeType::MiRnaInhibitor
            } else {
                MoleculeType::SiRna
            };
            (id, MoleculeDesignPool::new(id, molecule_type, 50000.0))
        })
        .collect()
}

fn fixed(rack_position: RackPosition, pool: &MoleculeDesignPool, final_concentration: f64) -> TransfectionPosition {
    TransfectionPosition::builder(rack_position)
        .pool(PoolId::Pool(pool.clone()))
        .reagent_name("RNAiMax")
        .reagent_dilution_factor(1400.0)
        .final_concentration(final_concentration)
        .build()
        .unwrap()
}

/// A screening plate: pools in columns 1-10 (duplicates in neighbouring rows), mocks
/// and untreated controls in column 11.
fn screening_rack(label: &str, catalog: &HashMap<u32, MoleculeDesignPool>, shift: u32) -> DesignRack {
    let mut layout = TransfectionLayout::new(RackShape::SHAPE_96);
    for column in 0..10 {
        for row in (0..8).step_by(2) {
            let pool_id = ((column * 4 + row / 2) as u32 + shift) % 40 + 1;
            let pool = &catalog[&pool_id];
            for replicate_row in [row, row + 1] {
                layout
                    .add(fixed(RackPosition::from_indices(replicate_row, column), pool, 10.0))
                    .unwrap();
            }
        }
    }
    for row in 0..4 {
        layout
            .add(
                TransfectionPosition::create_mock(
                    RackPosition::from_indices(row, 10),
                    Some("RNAiMax"),
                    Some(1400.0),
                    None,
                )
                .unwrap(),
            )
            .unwrap();
    }
    for row in 4..8 {
        layout
            .add(
                TransfectionPosition::create_untreated(
                    RackPosition::from_indices(row, 10),
                    PositionType::Untreated,
                )
                .unwrap(),
            )
            .unwrap();
    }
    DesignRack::new(label, layout)
}

fn planning_config(allow_one_to_one: bool) -> PlanningConfig {
    PlanningConfigBuilder::new()
        .optimizer(
            OptimizerConfigBuilder::new()
                .allow_one_to_one(allow_one_to_one)
                .build(),
        )
        .number_replicates(2)
        .reservoir(ReservoirSpec::standard_96())
        .pipetting(PipettingSpec::biomek())
        .build()
        .unwrap()
}

fn design_hashes(racks: &[DesignRack]) -> BTreeSet<String> {
    racks
        .iter()
        .flat_map(|rack| rack.layout.positions())
        .filter(|p| p.position_type().requires_source())
        .map(TransfectionPosition::full_hash)
        .collect()
}

#[test]
fn shifted_screening_plates_are_packed_once_per_liquid() {
    let catalog = catalog();
    let racks = vec![
        screening_rack("plate 1", &catalog, 0),
        screening_rack("plate 2", &catalog, 7),
    ];
    let result = plan::run(&racks, &planning_config(true), &ProgressReporter::new()).unwrap();

    let source_hashes: Vec<String> = result
        .source_layout
        .positions()
        .map(TransfectionPosition::full_hash)
        .collect();
    assert!(source_hashes.iter().all_unique());
    assert_eq!(
        source_hashes.into_iter().collect::<BTreeSet<_>>(),
        design_hashes(&racks)
    );
    // 40 pools plus the mock.
    assert_eq!(result.source_layout.len(), 41);
    assert_eq!(result.source_layout.shape(), RackShape::SHAPE_96);
    assert!(result.source_layout.has_iso_volumes());
    assert!(result.source_layout.has_iso_concentrations());
}

#[test]
fn every_source_well_gets_volumes_for_its_target_wells() {
    let catalog = catalog();
    let racks = vec![
        screening_rack("plate 1", &catalog, 0),
        screening_rack("plate 2", &catalog, 7),
    ];
    let result = plan::run(&racks, &planning_config(false), &ProgressReporter::new()).unwrap();

    assert_eq!(result.summaries.len(), result.source_layout.len());
    let mock = result
        .summaries
        .iter()
        .find(|s| s.position_type == PositionType::Mock)
        .unwrap();
    assert_eq!(mock.target_well_count, 8);
    assert_eq!(mock.iso_concentration, None);

    for summary in result.summaries.iter().filter(|s| s.position_type == PositionType::Fixed) {
        assert_eq!(summary.target_well_count, 4);
        let source = result.source_layout.get(summary.rack_position).unwrap();
        let expected_factor = if source.molecule_design_pool().unwrap().molecule_type.is_mirna() {
            3.0
        } else {
            4.0
        };
        assert_eq!(summary.optimem_dil_factor, expected_factor);
        assert!(summary.iso_volume >= PipettingSpec::biomek().min_transfer_volume);
        assert_eq!(source.iso_volume(), Some(summary.iso_volume));
    }
    assert!(result.warnings.is_empty());
}

#[test]
fn liquids_of_one_target_column_share_few_source_columns() {
    let catalog = catalog();
    let racks = vec![
        screening_rack("plate 1", &catalog, 0),
        screening_rack("plate 2", &catalog, 7),
    ];
    let result = plan::run(&racks, &planning_config(false), &ProgressReporter::new()).unwrap();
    let by_hash: HashMap<String, RackPosition> = result
        .source_layout
        .positions()
        .map(|p| (p.full_hash(), p.rack_position()))
        .collect();

    // The four pools of the first column of the first plate travel together.
    let sources: Vec<RackPosition> = (0..8)
        .step_by(2)
        .map(|row| {
            let target = racks[0].layout.get(RackPosition::from_indices(row, 0)).unwrap();
            by_hash[&target.full_hash()]
        })
        .collect();
    assert!(sources.iter().map(|rp| rp.column_index).all_equal());
    for (a, b) in sources.iter().tuple_combinations() {
        assert_ne!(a.row_index, b.row_index);
    }
}

#[test]
fn source_layout_survives_rack_layout_round_trip() {
    let catalog = catalog();
    let racks = vec![screening_rack("plate 1", &catalog, 0)];
    let result = plan::run(&racks, &planning_config(true), &ProgressReporter::new()).unwrap();

    let rack_layout = result.source_layout.to_rack_layout("planner");
    let parsed = TransfectionLayout::from_rack_layout(&rack_layout, &catalog).unwrap();
    assert_eq!(parsed, result.source_layout);
    for position in result.source_layout.positions() {
        let restored = parsed.get(position.rack_position()).unwrap();
        assert_eq!(restored.iso_volume(), position.iso_volume());
        assert_eq!(restored.optimem_dil_factor(), position.optimem_dil_factor());
    }
}
