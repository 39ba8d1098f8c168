use crate::core::utils::identifiers::lookup_molecule_type;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[error("Unknown molecule type '{0}'")]
pub struct UnknownMoleculeType(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoleculeType {
    SiRna,
    EsiRna,
    LongDsRna,
    MiRnaInhibitor,
    MiRnaMimic,
    SsDna,
    Amo,
    Compound,
    ClonedDsDna,
}

impl MoleculeType {
    pub fn id(&self) -> &'static str {
        match self {
            MoleculeType::SiRna => "siRNA",
            MoleculeType::EsiRna => "esiRNA",
            MoleculeType::LongDsRna => "long_dsRNA",
            MoleculeType::MiRnaInhibitor => "miRNA_inhi",
            MoleculeType::MiRnaMimic => "miRNA_mimi",
            MoleculeType::SsDna => "ssDNA",
            MoleculeType::Amo => "AMO",
            MoleculeType::Compound => "compound",
            MoleculeType::ClonedDsDna => "cloned_dsDNA",
        }
    }

    pub fn is_mirna(&self) -> bool {
        matches!(self, MoleculeType::MiRnaInhibitor | MoleculeType::MiRnaMimic)
    }
}

impl fmt::Display for MoleculeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for MoleculeType {
    type Err = UnknownMoleculeType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lookup_molecule_type(s).ok_or_else(|| UnknownMoleculeType(s.to_string()))
    }
}

/// A pool of molecule designs as delivered by the stock management.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoleculeDesignPool {
    pub id: u32,
    pub molecule_type: MoleculeType,
    /// Stock concentration in nM.
    pub stock_concentration: f64,
}

impl MoleculeDesignPool {
    pub fn new(id: u32, molecule_type: MoleculeType, stock_concentration: f64) -> Self {
        Self {
            id,
            molecule_type,
            stock_concentration,
        }
    }
}

/// Resolves pool ids to pools, e.g. when parsing a rack layout.
pub trait PoolCatalog {
    fn pool(&self, id: u32) -> Option<MoleculeDesignPool>;
}

impl PoolCatalog for HashMap<u32, MoleculeDesignPool> {
    fn pool(&self, id: u32) -> Option<MoleculeDesignPool> {
        self.get(&id).cloned()
    }
}
