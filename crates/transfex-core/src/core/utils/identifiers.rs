use crate::core::models::molecule::MoleculeType;
use crate::core::parameters::parameter::TransfectionParameter;
use phf::{Map, phf_map};

static MOLECULE_TYPE_IDS: Map<&'static str, MoleculeType> = phf_map! {
    "sirna" => MoleculeType::SiRna,
    "esirna" => MoleculeType::EsiRna,
    "long_dsrna" => MoleculeType::LongDsRna,
    "mirna_inhi" => MoleculeType::MiRnaInhibitor,
    "mirna_mimi" => MoleculeType::MiRnaMimic,
    "ssdna" => MoleculeType::SsDna,
    "amo" => MoleculeType::Amo,
    "compound" => MoleculeType::Compound,
    "cloned_dsdna" => MoleculeType::ClonedDsDna,
};

static PARAMETER_ALIASES: Map<&'static str, TransfectionParameter> = phf_map! {
    "molecule_design_pool_id" => TransfectionParameter::MoleculeDesignPool,
    "molecule_design_pool" => TransfectionParameter::MoleculeDesignPool,
    "molecule_design_set" => TransfectionParameter::MoleculeDesignPool,
    "pool_id" => TransfectionParameter::MoleculeDesignPool,
    "pool" => TransfectionParameter::MoleculeDesignPool,
    "md_pool" => TransfectionParameter::MoleculeDesignPool,
    "position_type" => TransfectionParameter::PositionType,
    "type" => TransfectionParameter::PositionType,
    "reagent_name" => TransfectionParameter::ReagentName,
    "rnai_reagent" => TransfectionParameter::ReagentName,
    "transfection_reagent" => TransfectionParameter::ReagentName,
    "reagent" => TransfectionParameter::ReagentName,
    "reagent_dilution_factor" => TransfectionParameter::ReagentDilutionFactor,
    "reagent_dil_factor" => TransfectionParameter::ReagentDilutionFactor,
    "reagent_concentration" => TransfectionParameter::ReagentDilutionFactor,
    "final_concentration" => TransfectionParameter::FinalConcentration,
    "final_conc" => TransfectionParameter::FinalConcentration,
    "iso_volume" => TransfectionParameter::IsoVolume,
    "iso_concentration" => TransfectionParameter::IsoConcentration,
    "iso_conc" => TransfectionParameter::IsoConcentration,
    "optimem_dilution_factor" => TransfectionParameter::OptimemDilutionFactor,
    "optimem_dil_factor" => TransfectionParameter::OptimemDilutionFactor,
    "optimem_factor" => TransfectionParameter::OptimemDilutionFactor,
};

/// Lowercases a name and maps spaces and dashes to underscores (`"Final Conc"` -> `"final_conc"`).
pub fn normalize_identifier(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

pub fn lookup_molecule_type(id: &str) -> Option<MoleculeType> {
    MOLECULE_TYPE_IDS.get(normalize_identifier(id).as_str()).copied()
}

pub fn lookup_parameter(alias: &str) -> Option<TransfectionParameter> {
    PARAMETER_ALIASES.get(normalize_identifier(alias).as_str()).copied()
}

/// All aliases registered for a parameter, canonical predicate included.
pub fn parameter_aliases(parameter: TransfectionParameter) -> Vec<&'static str> {
    let mut aliases: Vec<&'static str> = PARAMETER_ALIASES
        .entries()
        .filter(|(_, p)| **p == parameter)
        .map(|(alias, _)| *alias)
        .collect();
    aliases.sort_unstable();
    aliases
}
