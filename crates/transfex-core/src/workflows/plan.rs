use crate::core::layout::TransfectionLayout;
use crate::core::models::rack::RackPosition;
use crate::core::parameters::DEFAULT_MOCK_MOLECULE_TYPE;
use crate::core::parameters::calculator::{
    PlanningWarning, calculate_iso_concentration, calculate_iso_volume,
    calculate_mastermix_volume_from_iso_volume, check_critical_iso_concentration, optimem_factor,
};
use crate::core::parameters::parameter::PositionType;
use crate::core::position::{HashKind, TransfectionPosition};
use crate::engine::config::PlanningConfig;
use crate::engine::error::EngineError;
use crate::engine::optimizer::{self, DesignRack};
use crate::engine::progress::{Progress, ProgressReporter};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tracing::{info, instrument, warn};

/// Volumes planned for one source well.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionSummary {
    pub rack_position: RackPosition,
    pub position_type: PositionType,
    pub hash: String,
    pub target_well_count: usize,
    pub optimem_dil_factor: f64,
    pub iso_volume: f64,
    pub iso_concentration: Option<f64>,
    pub mastermix_volume: f64,
    pub reagent_dilution_volume: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanWarning {
    pub rack_position: RackPosition,
    pub warning: PlanningWarning,
}

impl fmt::Display for PlanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.rack_position, self.warning)
    }
}

#[derive(Debug, Clone)]
pub struct PlanningResult {
    pub source_layout: TransfectionLayout,
    pub summaries: Vec<PositionSummary>,
    pub warnings: Vec<PlanWarning>,
}

#[instrument(skip_all, name = "planning_workflow")]
pub fn run(
    design_racks: &[DesignRack],
    config: &PlanningConfig,
    reporter: &ProgressReporter,
) -> Result<PlanningResult, EngineError> {
    info!(
        "Planning source layout for {} design rack(s), {} replicate(s).",
        design_racks.len(),
        config.number_replicates
    );
    let mut source_layout = optimizer::optimize(design_racks, &config.optimizer, reporter)?;
    let hash_kind = config.optimizer.hash_kind;
    let well_counts = count_target_wells(design_racks, hash_kind);

    reporter.report(Progress::PhaseStart {
        name: "Volume calculation",
    });
    reporter.report(Progress::TaskStart {
        total_steps: source_layout.len() as u64,
    });

    let mut summaries = Vec::with_capacity(source_layout.len());
    let mut warnings = Vec::new();
    for position in source_layout.positions_mut() {
        let (summary, position_warnings) =
            plan_position(position, &well_counts, hash_kind, config)?;
        for warning in position_warnings {
            warn!("{}: {}", summary.rack_position, warning);
            warnings.push(PlanWarning {
                rack_position: summary.rack_position,
                warning,
            });
        }
        summaries.push(summary);
        reporter.report(Progress::TaskIncrement);
    }

    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);
    info!(
        "Planned {} source positions with {} warning(s).",
        summaries.len(),
        warnings.len()
    );

    Ok(PlanningResult {
        source_layout,
        summaries,
        warnings,
    })
}

/// Number of target wells served by each liquid.
fn count_target_wells(design_racks: &[DesignRack], hash_kind: HashKind) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for position in design_racks
        .iter()
        .flat_map(|rack| rack.layout.positions())
        .filter(|p| p.position_type().requires_source())
    {
        *counts.entry(position.hash_value(hash_kind)).or_insert(0) += 1;
    }
    counts
}

/// OptiMem factor of a source well: its own, else its pool's, else the default type's.
///
/// Wells without a pool (mock, library and floating) fall back to the default molecule
/// type; floating miRNA wells must carry their factor explicitly.
fn resolve_optimem_factor(position: &TransfectionPosition) -> f64 {
    position.optimem_dil_factor().unwrap_or_else(|| {
        let molecule_type = position
            .molecule_design_pool()
            .map_or(DEFAULT_MOCK_MOLECULE_TYPE, |pool| pool.molecule_type);
        optimem_factor(molecule_type)
    })
}

fn plan_position(
    position: &mut TransfectionPosition,
    well_counts: &HashMap<String, usize>,
    hash_kind: HashKind,
    config: &PlanningConfig,
) -> Result<(PositionSummary, Vec<PlanningWarning>), EngineError> {
    let hash = position.hash_value(hash_kind);
    let target_well_count = well_counts.get(&hash).copied().unwrap_or(1);

    let optimem = resolve_optimem_factor(position);
    if position.optimem_dil_factor().is_none() {
        position.set_optimem_dilution_factor(optimem)?;
    }

    let calculated = calculate_iso_volume(
        target_well_count,
        config.number_replicates,
        optimem,
        &config.reservoir,
        &config.pipetting,
    )?;
    let iso_volume = calculated.value;
    let mut warnings = calculated.warnings;
    position.set_iso_volume(iso_volume)?;

    let iso_concentration = match position.final_concentration() {
        Some(final_concentration) if !position.is_mock() => {
            let iso_concentration = calculate_iso_concentration(final_concentration, optimem);
            position.set_iso_concentration(iso_concentration)?;
            if let Some(pool) = position.molecule_design_pool() {
                warnings.extend(check_critical_iso_concentration(
                    iso_concentration,
                    pool.stock_concentration,
                ));
            }
            Some(iso_concentration)
        }
        _ => None,
    };

    let summary = PositionSummary {
        rack_position: position.rack_position(),
        position_type: position.position_type(),
        hash,
        target_well_count,
        optimem_dil_factor: optimem,
        iso_volume,
        iso_concentration,
        mastermix_volume: calculate_mastermix_volume_from_iso_volume(iso_volume, optimem),
        reagent_dilution_volume: position.reagent_dilution_volume().unwrap_or_default(),
    };
    Ok((summary, warnings))
}
