use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;
use transfex::core::position::HashKind;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileHashKind {
    Full,
    Partial,
}

impl From<FileHashKind> for HashKind {
    fn from(kind: FileHashKind) -> Self {
        match kind {
            FileHashKind::Full => HashKind::Full,
            FileHashKind::Partial => HashKind::Partial,
        }
    }
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FilePlanningConfig {
    pub replicates: Option<usize>,
    pub pipetting: Option<String>,
    pub reservoir: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileOptimizerConfig {
    #[serde(rename = "hash-kind")]
    pub hash_kind: Option<FileHashKind>,
    #[serde(rename = "one-to-one")]
    pub one_to_one: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub planning: Option<FilePlanningConfig>,
    pub optimizer: Option<FileOptimizerConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }
}
