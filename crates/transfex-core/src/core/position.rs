use crate::core::models::molecule::MoleculeDesignPool;
use crate::core::models::rack::RackPosition;
use crate::core::parameters::calculator::{calculate_reagent_dilution_volume, optimem_factor};
use crate::core::parameters::parameter::{
    LIBRARY_MARKER, MOCK_MARKER, NONE_MARKER, PositionType, RawValue, TransfectionParameter,
    UNTRANSFECTED_MARKER, UNTREATED_MARKER, is_valid_mock_value, value_rule,
};
use crate::core::utils::numbers::trimmed_number;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

const FLOATING_PLACEHOLDER_PREFIX: &str = "md_";

#[derive(Debug, Error, PartialEq, Clone)]
pub enum PositionError {
    #[error("Invalid value '{value}' for {parameter} at {rack_position}: {reason}")]
    InvalidPositionValue {
        rack_position: RackPosition,
        parameter: TransfectionParameter,
        value: String,
        reason: String,
    },

    #[error("{parameter} at {rack_position} has already been set")]
    AlreadySet {
        rack_position: RackPosition,
        parameter: TransfectionParameter,
    },
}

/// Which hash identifies the liquid of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HashKind {
    /// Pool, reagent, reagent dilution factor and final concentration.
    #[default]
    Full,
    /// As [`HashKind::Full`] but without the final concentration.
    Partial,
}

/// Identity of the molecules in a well.
#[derive(Debug, Clone, PartialEq)]
pub enum PoolId {
    Pool(MoleculeDesignPool),
    /// Placeholder (`md_001`, `md_002`, ...) for a pool chosen later.
    Floating(String),
    Mock,
    Library,
    Untreated,
    Untransfected,
}

impl PoolId {
    pub fn floating(index: usize) -> Self {
        PoolId::Floating(format!("{}{:03}", FLOATING_PLACEHOLDER_PREFIX, index))
    }

    pub fn is_floating_placeholder(value: &str) -> bool {
        value
            .strip_prefix(FLOATING_PLACEHOLDER_PREFIX)
            .is_some_and(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
    }

    /// The position type this pool identity belongs to.
    pub fn position_type(&self) -> PositionType {
        match self {
            PoolId::Pool(_) => PositionType::Fixed,
            PoolId::Floating(_) => PositionType::Floating,
            PoolId::Mock => PositionType::Mock,
            PoolId::Library => PositionType::Library,
            PoolId::Untreated => PositionType::Untreated,
            PoolId::Untransfected => PositionType::Untransfected,
        }
    }

    pub fn molecule_design_pool(&self) -> Option<&MoleculeDesignPool> {
        match self {
            PoolId::Pool(pool) => Some(pool),
            _ => None,
        }
    }

    pub fn token(&self) -> String {
        match self {
            PoolId::Pool(pool) => pool.id.to_string(),
            PoolId::Floating(placeholder) => placeholder.clone(),
            PoolId::Mock => MOCK_MARKER.to_string(),
            PoolId::Library => LIBRARY_MARKER.to_string(),
            PoolId::Untreated => UNTREATED_MARKER.to_string(),
            PoolId::Untransfected => UNTRANSFECTED_MARKER.to_string(),
        }
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token())
    }
}

/// One well of a transfection layout.
///
/// Attributes are validated against the position type on construction; only the ISO
/// volume, ISO concentration and OptiMem dilution factor can change afterwards.
#[derive(Debug, Clone)]
pub struct TransfectionPosition {
    rack_position: RackPosition,
    pool: Option<PoolId>,
    position_type: PositionType,
    reagent_name: Option<String>,
    reagent_dil_factor: Option<f64>,
    iso_volume: Option<f64>,
    iso_concentration: Option<f64>,
    final_concentration: Option<f64>,
    optimem_dil_factor: Option<f64>,
}

impl TransfectionPosition {
    pub fn builder(rack_position: RackPosition) -> TransfectionPositionBuilder {
        TransfectionPositionBuilder::new(rack_position)
    }

    pub fn empty(rack_position: RackPosition) -> Self {
        Self {
            rack_position,
            pool: None,
            position_type: PositionType::Empty,
            reagent_name: None,
            reagent_dil_factor: None,
            iso_volume: None,
            iso_concentration: None,
            final_concentration: None,
            optimem_dil_factor: None,
        }
    }

    pub fn create_mock(
        rack_position: RackPosition,
        reagent_name: Option<&str>,
        reagent_dil_factor: Option<f64>,
        optimem_dil_factor: Option<f64>,
    ) -> Result<Self, PositionError> {
        let mut builder = Self::builder(rack_position)
            .pool(PoolId::Mock)
            .reagent_dilution_factor(reagent_dil_factor)
            .optimem_dilution_factor(optimem_dil_factor);
        if let Some(name) = reagent_name {
            builder = builder.reagent_name(name);
        }
        builder.build()
    }

    pub fn create_library(
        rack_position: RackPosition,
        reagent_name: Option<&str>,
        reagent_dil_factor: Option<f64>,
        final_concentration: Option<f64>,
        optimem_dil_factor: Option<f64>,
    ) -> Result<Self, PositionError> {
        let mut builder = Self::builder(rack_position)
            .pool(PoolId::Library)
            .reagent_dilution_factor(reagent_dil_factor)
            .final_concentration(final_concentration)
            .optimem_dilution_factor(optimem_dil_factor);
        if let Some(name) = reagent_name {
            builder = builder.reagent_name(name);
        }
        builder.build()
    }

    /// Creates an untreated or untransfected position carrying its marker as reagent name.
    pub fn create_untreated(
        rack_position: RackPosition,
        kind: PositionType,
    ) -> Result<Self, PositionError> {
        let pool = match kind {
            PositionType::Untreated => PoolId::Untreated,
            PositionType::Untransfected => PoolId::Untransfected,
            other => {
                return Err(PositionError::InvalidPositionValue {
                    rack_position,
                    parameter: TransfectionParameter::PositionType,
                    value: other.name().to_string(),
                    reason: format!("expected '{}' or '{}'", UNTREATED_MARKER, UNTRANSFECTED_MARKER),
                });
            }
        };
        Self::builder(rack_position)
            .pool(pool)
            .reagent_name(kind.name())
            .build()
    }

    pub fn rack_position(&self) -> RackPosition {
        self.rack_position
    }

    pub fn pool(&self) -> Option<&PoolId> {
        self.pool.as_ref()
    }

    pub fn position_type(&self) -> PositionType {
        self.position_type
    }

    pub fn reagent_name(&self) -> Option<&str> {
        self.reagent_name.as_deref()
    }

    pub fn reagent_dil_factor(&self) -> Option<f64> {
        self.reagent_dil_factor
    }

    pub fn iso_volume(&self) -> Option<f64> {
        self.iso_volume
    }

    pub fn iso_concentration(&self) -> Option<f64> {
        self.iso_concentration
    }

    pub fn final_concentration(&self) -> Option<f64> {
        self.final_concentration
    }

    pub fn optimem_dil_factor(&self) -> Option<f64> {
        self.optimem_dil_factor
    }

    pub fn is_empty(&self) -> bool {
        self.position_type.is_empty()
    }

    pub fn is_mock(&self) -> bool {
        self.position_type.is_mock()
    }

    pub fn is_untreated_type(&self) -> bool {
        self.position_type.is_untreated_type()
    }

    pub fn is_fixed(&self) -> bool {
        self.position_type == PositionType::Fixed
    }

    pub fn molecule_design_pool(&self) -> Option<&MoleculeDesignPool> {
        self.pool.as_ref().and_then(PoolId::molecule_design_pool)
    }

    /// Sets the OptiMem dilution factor.
    ///
    /// Fixed positions may be overridden at any time; all other positions accept the
    /// factor only once.
    pub fn set_optimem_dilution_factor(&mut self, factor: f64) -> Result<(), PositionError> {
        self.check_value(
            TransfectionParameter::OptimemDilutionFactor,
            RawValue::Number(factor),
        )?;
        if !self.is_fixed() && self.optimem_dil_factor.is_some() {
            return Err(PositionError::AlreadySet {
                rack_position: self.rack_position,
                parameter: TransfectionParameter::OptimemDilutionFactor,
            });
        }
        self.optimem_dil_factor = Some(factor);
        Ok(())
    }

    /// Stores an OptiMem dilution factor on a fixed position, deriving it from the
    /// molecule type of the pool when `factor` is `None`.
    pub fn store_optimem_dilution_factor(&mut self, factor: Option<f64>) -> Result<(), PositionError> {
        let Some(pool) = self.molecule_design_pool() else {
            return Err(PositionError::InvalidPositionValue {
                rack_position: self.rack_position,
                parameter: TransfectionParameter::OptimemDilutionFactor,
                value: self.position_type.name().to_string(),
                reason: "only fixed positions derive the factor from their pool".to_string(),
            });
        };
        let factor = factor.unwrap_or_else(|| optimem_factor(pool.molecule_type));
        self.set_optimem_dilution_factor(factor)
    }

    pub fn set_iso_volume(&mut self, iso_volume: f64) -> Result<(), PositionError> {
        self.check_value(TransfectionParameter::IsoVolume, RawValue::Number(iso_volume))?;
        self.iso_volume = Some(iso_volume);
        Ok(())
    }

    pub fn set_iso_concentration(&mut self, iso_concentration: f64) -> Result<(), PositionError> {
        self.check_value(
            TransfectionParameter::IsoConcentration,
            RawValue::Number(iso_concentration),
        )?;
        self.iso_concentration = Some(iso_concentration);
        Ok(())
    }

    /// Volume of the reagent dilution (ISO volume times OptiMem factor).
    pub fn reagent_dilution_volume(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        Some(calculate_reagent_dilution_volume(
            self.iso_volume?,
            self.optimem_dil_factor?,
        ))
    }

    /// The same liquid at another coordinate.
    pub fn relocated(&self, rack_position: RackPosition) -> Self {
        Self {
            rack_position,
            ..self.clone()
        }
    }

    pub fn full_hash(&self) -> String {
        self.hash_value(HashKind::Full)
    }

    pub fn partial_hash(&self) -> String {
        self.hash_value(HashKind::Partial)
    }

    /// String identifying the liquid composition. Empty positions hash to their label.
    pub fn hash_value(&self, kind: HashKind) -> String {
        let Some(pool) = &self.pool else {
            return self.rack_position.label();
        };
        let mut hash = format!(
            "{}{}{}",
            pool.token(),
            self.reagent_name.as_deref().unwrap_or(NONE_MARKER),
            optional_token(self.reagent_dil_factor),
        );
        if kind == HashKind::Full {
            let final_concentration = if self.is_mock() {
                None
            } else {
                self.final_concentration
            };
            hash.push_str(&optional_token(final_concentration));
        }
        hash
    }

    /// The value of a parameter as it appears in tags, `None` if unset.
    pub fn tag_value(&self, parameter: TransfectionParameter) -> Option<String> {
        use TransfectionParameter as P;
        match parameter {
            P::MoleculeDesignPool => self.pool.as_ref().map(PoolId::token),
            P::PositionType => Some(self.position_type.name().to_string()),
            P::ReagentName => self.reagent_name.clone(),
            P::ReagentDilutionFactor => self.reagent_dil_factor.map(trimmed_number),
            P::IsoVolume => self.iso_volume.map(trimmed_number),
            P::IsoConcentration => self.iso_concentration.map(trimmed_number),
            P::FinalConcentration if self.is_mock() => Some(MOCK_MARKER.to_string()),
            P::FinalConcentration => self.final_concentration.map(trimmed_number),
            P::OptimemDilutionFactor => self.optimem_dil_factor.map(trimmed_number),
        }
    }

    fn check_value(
        &self,
        parameter: TransfectionParameter,
        value: RawValue<'_>,
    ) -> Result<(), PositionError> {
        validate_value(self.rack_position, self.position_type, parameter, value)
    }
}

impl PartialEq for TransfectionPosition {
    fn eq(&self, other: &Self) -> bool {
        if self.rack_position != other.rack_position
            || self.pool != other.pool
            || self.position_type != other.position_type
        {
            return false;
        }
        if self.is_empty() {
            return true;
        }
        if self.reagent_name != other.reagent_name
            || self.reagent_dil_factor != other.reagent_dil_factor
        {
            return false;
        }
        self.is_mock() || self.final_concentration == other.final_concentration
    }
}

impl fmt::Display for TransfectionPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}: {})",
            self.rack_position,
            self.position_type,
            self.full_hash()
        )
    }
}

#[derive(Debug, Clone)]
pub struct TransfectionPositionBuilder {
    rack_position: RackPosition,
    pool: Option<PoolId>,
    position_type: Option<PositionType>,
    reagent_name: Option<String>,
    reagent_dil_factor: Option<f64>,
    iso_volume: Option<f64>,
    iso_concentration: Option<f64>,
    final_concentration: Option<f64>,
    optimem_dil_factor: Option<f64>,
}

impl TransfectionPositionBuilder {
    fn new(rack_position: RackPosition) -> Self {
        Self {
            rack_position,
            pool: None,
            position_type: None,
            reagent_name: None,
            reagent_dil_factor: None,
            iso_volume: None,
            iso_concentration: None,
            final_concentration: None,
            optimem_dil_factor: None,
        }
    }

    pub fn pool(mut self, pool: PoolId) -> Self {
        self.pool = Some(pool);
        self
    }
    /// Optional; derived from the pool when not given.
    pub fn position_type(mut self, position_type: PositionType) -> Self {
        self.position_type = Some(position_type);
        self
    }
    pub fn reagent_name(mut self, name: impl Into<String>) -> Self {
        self.reagent_name = Some(name.into());
        self
    }
    pub fn reagent_dilution_factor(mut self, factor: impl Into<Option<f64>>) -> Self {
        self.reagent_dil_factor = factor.into();
        self
    }
    pub fn iso_volume(mut self, volume: impl Into<Option<f64>>) -> Self {
        self.iso_volume = volume.into();
        self
    }
    pub fn iso_concentration(mut self, concentration: impl Into<Option<f64>>) -> Self {
        self.iso_concentration = concentration.into();
        self
    }
    pub fn final_concentration(mut self, concentration: impl Into<Option<f64>>) -> Self {
        self.final_concentration = concentration.into();
        self
    }
    pub fn optimem_dilution_factor(mut self, factor: impl Into<Option<f64>>) -> Self {
        self.optimem_dil_factor = factor.into();
        self
    }

    pub fn build(self) -> Result<TransfectionPosition, PositionError> {
        let rack_position = self.rack_position;
        let pool_type = self
            .pool
            .as_ref()
            .map_or(PositionType::Empty, PoolId::position_type);
        let position_type = self.position_type.unwrap_or(pool_type);

        if position_type != pool_type {
            return Err(PositionError::InvalidPositionValue {
                rack_position,
                parameter: TransfectionParameter::MoleculeDesignPool,
                value: self
                    .pool
                    .as_ref()
                    .map_or_else(|| NONE_MARKER.to_string(), PoolId::token),
                reason: format!("expected a pool matching position type '{}'", position_type),
            });
        }
        if let Some(PoolId::Floating(placeholder)) = &self.pool {
            if !PoolId::is_floating_placeholder(placeholder) {
                return Err(PositionError::InvalidPositionValue {
                    rack_position,
                    parameter: TransfectionParameter::MoleculeDesignPool,
                    value: placeholder.clone(),
                    reason: format!("expected a placeholder of the form '{}NNN'", FLOATING_PLACEHOLDER_PREFIX),
                });
            }
        }

        use TransfectionParameter as P;
        let checks = [
            (P::ReagentName, RawValue::from_text(self.reagent_name.as_deref())),
            (P::ReagentDilutionFactor, RawValue::from_number(self.reagent_dil_factor)),
            (P::IsoVolume, RawValue::from_number(self.iso_volume)),
            (P::IsoConcentration, RawValue::from_number(self.iso_concentration)),
            (P::FinalConcentration, RawValue::from_number(self.final_concentration)),
            (P::OptimemDilutionFactor, RawValue::from_number(self.optimem_dil_factor)),
        ];
        for (parameter, value) in checks {
            validate_value(rack_position, position_type, parameter, value)?;
            if position_type.is_mock() {
                validate_mock_value(rack_position, parameter, value)?;
            }
        }

        let optimem_dil_factor = match (&self.pool, self.optimem_dil_factor) {
            (Some(PoolId::Pool(pool)), None) => Some(optimem_factor(pool.molecule_type)),
            (_, factor) => factor,
        };

        Ok(TransfectionPosition {
            rack_position,
            pool: self.pool,
            position_type,
            reagent_name: self.reagent_name,
            reagent_dil_factor: self.reagent_dil_factor,
            iso_volume: self.iso_volume,
            iso_concentration: self.iso_concentration,
            final_concentration: self.final_concentration,
            optimem_dil_factor,
        })
    }
}

fn validate_value(
    rack_position: RackPosition,
    position_type: PositionType,
    parameter: TransfectionParameter,
    value: RawValue<'_>,
) -> Result<(), PositionError> {
    match value_rule(parameter, position_type) {
        Some(rule) if !rule.accepts(value) => Err(PositionError::InvalidPositionValue {
            rack_position,
            parameter,
            value: value.to_string(),
            reason: format!("expected {}", rule.describe()),
        }),
        _ => Ok(()),
    }
}

/// Mock rows follow their own, slightly stricter rules (e.g. reagent names of more
/// than two characters).
fn validate_mock_value(
    rack_position: RackPosition,
    parameter: TransfectionParameter,
    value: RawValue<'_>,
) -> Result<(), PositionError> {
    let text = (!value.is_absent()).then(|| value.to_string());
    if is_valid_mock_value(text.as_deref(), parameter) {
        return Ok(());
    }
    Err(PositionError::InvalidPositionValue {
        rack_position,
        parameter,
        value: value.to_string(),
        reason: "expected a valid mock value".to_string(),
    })
}

fn optional_token(value: Option<f64>) -> String {
    value.map_or_else(|| NONE_MARKER.to_string(), trimmed_number)
}
