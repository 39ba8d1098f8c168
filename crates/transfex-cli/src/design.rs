//! Design rack files.
//!
//! A design file lists the molecule design pools used in the screen and, for every
//! design rack, groups of wells sharing the same transfection parameters:
//!
//! ```toml
//! [[pools]]
//! id = 205200
//! molecule-type = "siRNA"
//! stock-concentration = 50000
//!
//! [[racks]]
//! label = "design_1"
//! shape = "16x24"
//!
//! [[racks.wells]]
//! positions = ["A1", "B1"]
//! pool = "205200"
//! reagent-name = "RNAiMax"
//! reagent-dilution-factor = 1400
//! final-concentration = 10
//! ```

use crate::config::defaults::DefaultsConfig;
use crate::error::{CliError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;
use transfex::core::layout::TransfectionLayout;
use transfex::core::models::molecule::{MoleculeDesignPool, MoleculeType};
use transfex::core::models::rack::{RackPosition, RackShape};
use transfex::core::parameters::parameter::{
    LIBRARY_MARKER, MOCK_MARKER, PositionType, UNTRANSFECTED_MARKER, UNTREATED_MARKER,
};
use transfex::core::position::{PoolId, TransfectionPosition};
use transfex::engine::optimizer::DesignRack;

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct FilePool {
    pub id: u32,
    #[serde(rename = "molecule-type")]
    pub molecule_type: String,
    #[serde(rename = "stock-concentration")]
    pub stock_concentration: f64,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileWellGroup {
    pub positions: Vec<String>,
    pub pool: Option<String>,
    #[serde(rename = "position-type")]
    pub position_type: Option<String>,
    #[serde(rename = "reagent-name")]
    pub reagent_name: Option<String>,
    #[serde(rename = "reagent-dilution-factor")]
    pub reagent_dilution_factor: Option<f64>,
    #[serde(rename = "final-concentration")]
    pub final_concentration: Option<f64>,
    #[serde(rename = "optimem-dilution-factor")]
    pub optimem_dilution_factor: Option<f64>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileRack {
    pub label: String,
    pub shape: Option<String>,
    #[serde(default)]
    pub wells: Vec<FileWellGroup>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct DesignFile {
    #[serde(default)]
    pub pools: Vec<FilePool>,
    #[serde(default)]
    pub racks: Vec<FileRack>,
}

impl DesignFile {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading design racks from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Builds the transfection layouts of all racks. `path` is only used for error messages.
    pub fn into_design_racks(self, path: &Path) -> Result<Vec<DesignRack>> {
        let invalid = |reason: String| CliError::Design {
            path: path.to_path_buf(),
            reason,
        };

        if self.racks.is_empty() {
            return Err(invalid("the design does not contain any racks".to_string()));
        }

        let mut catalog = HashMap::new();
        for pool in self.pools {
            let molecule_type: MoleculeType = pool
                .molecule_type
                .parse()
                .map_err(|e| invalid(format!("pool {}: {}", pool.id, e)))?;
            catalog.insert(
                pool.id,
                MoleculeDesignPool::new(pool.id, molecule_type, pool.stock_concentration),
            );
        }

        let default_shape = DefaultsConfig::default().design_shape;
        self.racks
            .into_iter()
            .map(|rack| {
                let shape = parse_shape(rack.shape.as_deref().unwrap_or(&default_shape))
                    .map_err(|reason| invalid(format!("rack '{}': {}", rack.label, reason)))?;
                let layout = build_layout(shape, &rack.wells, &catalog)
                    .map_err(|reason| invalid(format!("rack '{}': {}", rack.label, reason)))?;
                Ok::<_, CliError>(DesignRack::new(rack.label, layout))
            })
            .collect()
    }
}

pub fn load_design_racks(path: &Path) -> Result<Vec<DesignRack>> {
    DesignFile::from_file(path)?.into_design_racks(path)
}

fn parse_shape(name: &str) -> std::result::Result<RackShape, String> {
    match name.trim() {
        "96" => Ok(RackShape::SHAPE_96),
        "384" => Ok(RackShape::SHAPE_384),
        other => other.parse().map_err(|e| format!("{}", e)),
    }
}

fn build_layout(
    shape: RackShape,
    groups: &[FileWellGroup],
    catalog: &HashMap<u32, MoleculeDesignPool>,
) -> std::result::Result<TransfectionLayout, String> {
    let mut layout = TransfectionLayout::new(shape);
    for group in groups {
        let pool = group
            .pool
            .as_deref()
            .map(|token| parse_pool(token, catalog))
            .transpose()?;
        let position_type = group
            .position_type
            .as_deref()
            .map(|name| name.parse::<PositionType>().map_err(|e| e.to_string()))
            .transpose()?;

        for label in &group.positions {
            let rack_position = RackPosition::from_label(label).map_err(|e| e.to_string())?;
            let position = build_position(rack_position, pool.clone(), position_type, group)?;
            layout.add(position).map_err(|e| e.to_string())?;
        }
    }
    Ok(layout)
}

fn build_position(
    rack_position: RackPosition,
    pool: Option<PoolId>,
    position_type: Option<PositionType>,
    group: &FileWellGroup,
) -> std::result::Result<TransfectionPosition, String> {
    if pool.is_none() && position_type.is_none_or(|t| t.is_empty()) {
        return Ok(TransfectionPosition::empty(rack_position));
    }

    let mut builder = TransfectionPosition::builder(rack_position)
        .reagent_dilution_factor(group.reagent_dilution_factor)
        .final_concentration(group.final_concentration)
        .optimem_dilution_factor(group.optimem_dilution_factor);
    if let Some(pool) = pool {
        builder = builder.pool(pool);
    }
    if let Some(position_type) = position_type {
        builder = builder.position_type(position_type);
    }
    if let Some(name) = &group.reagent_name {
        builder = builder.reagent_name(name.as_str());
    }
    builder.build().map_err(|e| e.to_string())
}

fn parse_pool(
    token: &str,
    catalog: &HashMap<u32, MoleculeDesignPool>,
) -> std::result::Result<PoolId, String> {
    let token = token.trim();
    let marker = token.to_ascii_lowercase();
    match marker.as_str() {
        MOCK_MARKER => return Ok(PoolId::Mock),
        LIBRARY_MARKER => return Ok(PoolId::Library),
        UNTREATED_MARKER => return Ok(PoolId::Untreated),
        UNTRANSFECTED_MARKER => return Ok(PoolId::Untransfected),
        _ => {}
    }
    if PoolId::is_floating_placeholder(token) {
        return Ok(PoolId::Floating(token.to_string()));
    }
    let id: u32 = token
        .parse()
        .map_err(|_| format!("invalid pool '{}'", token))?;
    catalog
        .get(&id)
        .cloned()
        .map(PoolId::Pool)
        .ok_or_else(|| format!("pool {} is not listed in [[pools]]", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    const DESIGN: &str = r#"
        [[pools]]
        id = 205200
        molecule-type = "siRNA"
        stock-concentration = 50000

        [[pools]]
        id = 330001
        molecule-type = "miRNA_mimi"
        stock-concentration = 10000

        [[racks]]
        label = "design_1"
        shape = "96"

        [[racks.wells]]
        positions = ["A1", "B1"]
        pool = "205200"
        reagent-name = "RNAiMax"
        reagent-dilution-factor = 1400
        final-concentration = 10

        [[racks.wells]]
        positions = ["A2"]
        pool = "330001"
        reagent-name = "RNAiMax"
        reagent-dilution-factor = 1400
        final-concentration = 5

        [[racks.wells]]
        positions = ["C1"]
        pool = "mock"
        reagent-name = "RNAiMax"
        reagent-dilution-factor = 1400

        [[racks.wells]]
        positions = ["D1"]
        pool = "md_001"
        reagent-name = "RNAiMax"
        reagent-dilution-factor = 1400
        final-concentration = 10

        [[racks.wells]]
        positions = ["E1"]
        pool = "untreated"

        [[racks]]
        label = "design_2"

        [[racks.wells]]
        positions = ["P24"]
        pool = "205200"
        reagent-name = "RNAiMax"
        reagent-dilution-factor = 1400
        final-concentration = 10
    "#;

    fn write_design(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("design.toml");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn design_file_builds_one_layout_per_rack() {
        let (_dir, path) = write_design(DESIGN);
        let racks = load_design_racks(&path).expect("design should load");

        assert_eq!(racks.len(), 2);
        assert_eq!(racks[0].label, "design_1");
        assert_eq!(racks[0].layout.shape(), RackShape::SHAPE_96);
        assert_eq!(racks[0].layout.len(), 6);
        assert_eq!(racks[1].layout.shape(), RackShape::SHAPE_384);
        assert_eq!(racks[1].layout.len(), 1);
    }

    #[test]
    fn position_types_follow_the_pool_tokens() {
        let (_dir, path) = write_design(DESIGN);
        let racks = load_design_racks(&path).unwrap();
        let layout = &racks[0].layout;
        let type_at = |label: &str| {
            layout
                .get(RackPosition::from_label(label).unwrap())
                .map(|p| p.position_type())
        };

        assert_eq!(type_at("A1"), Some(PositionType::Fixed));
        assert_eq!(type_at("C1"), Some(PositionType::Mock));
        assert_eq!(type_at("D1"), Some(PositionType::Floating));
        assert_eq!(type_at("E1"), Some(PositionType::Untreated));
    }

    #[test]
    fn fixed_positions_take_the_optimem_factor_of_their_molecule_type() {
        let (_dir, path) = write_design(DESIGN);
        let racks = load_design_racks(&path).unwrap();
        let layout = &racks[0].layout;
        let factor_at = |label: &str| {
            layout
                .get(RackPosition::from_label(label).unwrap())
                .and_then(|p| p.optimem_dil_factor())
        };

        assert_eq!(factor_at("A1"), Some(4.0));
        assert_eq!(factor_at("A2"), Some(3.0));
    }

    #[test]
    fn unknown_pool_ids_are_design_errors() {
        let (_dir, path) = write_design(
            r#"
            [[racks]]
            label = "r"
            [[racks.wells]]
            positions = ["A1"]
            pool = "999"
            reagent-name = "RNAiMax"
            reagent-dilution-factor = 1400
            final-concentration = 10
            "#,
        );
        let err = load_design_racks(&path).err().expect("should fail");
        assert!(matches!(err, CliError::Design { .. }));
        assert!(err.to_string().contains("999"));
    }

    #[test]
    fn invalid_values_are_reported_with_the_rack_label() {
        let (_dir, path) = write_design(
            r#"
            [[pools]]
            id = 1
            molecule-type = "siRNA"
            stock-concentration = 50000

            [[racks]]
            label = "broken"
            [[racks.wells]]
            positions = ["A1"]
            pool = "1"
            reagent-name = "RNAiMax"
            reagent-dilution-factor = -2
            final-concentration = 10
            "#,
        );
        let err = load_design_racks(&path).err().expect("should fail");
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn duplicate_positions_are_rejected() {
        let (_dir, path) = write_design(
            r#"
            [[racks]]
            label = "r"
            [[racks.wells]]
            positions = ["A1", "A1"]
            pool = "untreated"
            "#,
        );
        assert!(matches!(
            load_design_racks(&path),
            Err(CliError::Design { .. })
        ));
    }

    #[test]
    fn unknown_keys_are_parse_errors() {
        let (_dir, path) = write_design("[[racks]]\nlabel = \"r\"\ncolour = \"red\"\n");
        assert!(matches!(
            load_design_racks(&path),
            Err(CliError::FileParsing { .. })
        ));
    }

    #[test]
    fn designs_without_racks_are_rejected() {
        let (_dir, path) = write_design("");
        assert!(matches!(
            load_design_racks(&path),
            Err(CliError::Design { .. })
        ));
    }
}
