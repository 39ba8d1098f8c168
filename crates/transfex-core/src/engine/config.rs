use crate::core::models::specs::{PipettingSpec, ReservoirSpec};
use crate::core::position::HashKind;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerConfig {
    /// Hash used to decide whether two wells hold the same liquid.
    pub hash_kind: HashKind,
    /// Whether a design rack layout may be reused as source layout unchanged.
    pub allow_one_to_one: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            hash_kind: HashKind::Full,
            allow_one_to_one: true,
        }
    }
}

#[derive(Default)]
pub struct OptimizerConfigBuilder {
    hash_kind: Option<HashKind>,
    allow_one_to_one: Option<bool>,
}

impl OptimizerConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hash_kind(mut self, kind: HashKind) -> Self {
        self.hash_kind = Some(kind);
        self
    }
    pub fn allow_one_to_one(mut self, allow: bool) -> Self {
        self.allow_one_to_one = Some(allow);
        self
    }

    pub fn build(self) -> OptimizerConfig {
        let defaults = OptimizerConfig::default();
        OptimizerConfig {
            hash_kind: self.hash_kind.unwrap_or(defaults.hash_kind),
            allow_one_to_one: self.allow_one_to_one.unwrap_or(defaults.allow_one_to_one),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanningConfig {
    pub optimizer: OptimizerConfig,
    pub number_replicates: usize,
    pub reservoir: ReservoirSpec,
    pub pipetting: PipettingSpec,
}

#[derive(Default)]
pub struct PlanningConfigBuilder {
    optimizer: Option<OptimizerConfig>,
    number_replicates: Option<usize>,
    reservoir: Option<ReservoirSpec>,
    pipetting: Option<PipettingSpec>,
}

impl PlanningConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn optimizer(mut self, config: OptimizerConfig) -> Self {
        self.optimizer = Some(config);
        self
    }
    pub fn number_replicates(mut self, replicates: usize) -> Self {
        self.number_replicates = Some(replicates);
        self
    }
    pub fn reservoir(mut self, spec: ReservoirSpec) -> Self {
        self.reservoir = Some(spec);
        self
    }
    pub fn pipetting(mut self, spec: PipettingSpec) -> Self {
        self.pipetting = Some(spec);
        self
    }

    pub fn build(self) -> Result<PlanningConfig, ConfigError> {
        let number_replicates = self
            .number_replicates
            .ok_or(ConfigError::MissingParameter("number_replicates"))?;
        if number_replicates == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "number_replicates",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(PlanningConfig {
            optimizer: self.optimizer.unwrap_or_default(),
            number_replicates,
            reservoir: self
                .reservoir
                .ok_or(ConfigError::MissingParameter("reservoir"))?,
            pipetting: self
                .pipetting
                .ok_or(ConfigError::MissingParameter("pipetting"))?,
        })
    }
}
