use crate::core::utils::identifiers::{lookup_parameter, normalize_identifier};
use crate::core::utils::numbers::is_positive_number;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const MOCK_MARKER: &str = "mock";
pub const LIBRARY_MARKER: &str = "library";
pub const UNTREATED_MARKER: &str = "untreated";
pub const UNTRANSFECTED_MARKER: &str = "untransfected";
/// Textual stand-in for an absent value in hashes and tag values.
pub const NONE_MARKER: &str = "None";

/// Minimum length of a reagent name on ordinary positions.
const MIN_REAGENT_NAME_LENGTH: usize = 2;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ParameterError {
    #[error("Unknown position type '{0}'")]
    UnknownPositionType(String),
    #[error("Unknown transfection parameter '{0}'")]
    UnknownParameter(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PositionType {
    Fixed,
    Floating,
    Mock,
    Library,
    Untreated,
    Untransfected,
    Empty,
}

impl PositionType {
    pub const ALL: [PositionType; 7] = [
        PositionType::Fixed,
        PositionType::Floating,
        PositionType::Mock,
        PositionType::Library,
        PositionType::Untreated,
        PositionType::Untransfected,
        PositionType::Empty,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PositionType::Fixed => "fixed",
            PositionType::Floating => "floating",
            PositionType::Mock => MOCK_MARKER,
            PositionType::Library => LIBRARY_MARKER,
            PositionType::Untreated => UNTREATED_MARKER,
            PositionType::Untransfected => UNTRANSFECTED_MARKER,
            PositionType::Empty => "empty",
        }
    }

    /// Untreated and untransfected wells receive nothing from the source plate.
    pub fn is_untreated_type(&self) -> bool {
        matches!(self, PositionType::Untreated | PositionType::Untransfected)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, PositionType::Empty)
    }

    pub fn is_mock(&self) -> bool {
        matches!(self, PositionType::Mock)
    }

    /// Whether the well needs liquid from the source plate.
    pub fn requires_source(&self) -> bool {
        !(self.is_empty() || self.is_untreated_type())
    }
}

impl fmt::Display for PositionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PositionType {
    type Err = ParameterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize_identifier(s);
        PositionType::ALL
            .into_iter()
            .find(|t| t.name() == normalized)
            .ok_or_else(|| ParameterError::UnknownPositionType(s.to_string()))
    }
}

/// The attributes that together describe a transfection source well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TransfectionParameter {
    MoleculeDesignPool,
    PositionType,
    ReagentName,
    ReagentDilutionFactor,
    IsoVolume,
    IsoConcentration,
    FinalConcentration,
    OptimemDilutionFactor,
}

impl TransfectionParameter {
    pub const ALL: [TransfectionParameter; 8] = [
        TransfectionParameter::MoleculeDesignPool,
        TransfectionParameter::PositionType,
        TransfectionParameter::ReagentName,
        TransfectionParameter::ReagentDilutionFactor,
        TransfectionParameter::IsoVolume,
        TransfectionParameter::IsoConcentration,
        TransfectionParameter::FinalConcentration,
        TransfectionParameter::OptimemDilutionFactor,
    ];

    /// Canonical tag predicate.
    pub fn predicate(&self) -> &'static str {
        match self {
            TransfectionParameter::MoleculeDesignPool => "molecule_design_pool_id",
            TransfectionParameter::PositionType => "position_type",
            TransfectionParameter::ReagentName => "reagent_name",
            TransfectionParameter::ReagentDilutionFactor => "reagent_dilution_factor",
            TransfectionParameter::IsoVolume => "iso_volume",
            TransfectionParameter::IsoConcentration => "iso_concentration",
            TransfectionParameter::FinalConcentration => "final_concentration",
            TransfectionParameter::OptimemDilutionFactor => "optimem_dilution_factor",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            TransfectionParameter::ReagentDilutionFactor
                | TransfectionParameter::IsoVolume
                | TransfectionParameter::IsoConcentration
                | TransfectionParameter::FinalConcentration
                | TransfectionParameter::OptimemDilutionFactor
        )
    }
}

impl fmt::Display for TransfectionParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.predicate())
    }
}

impl FromStr for TransfectionParameter {
    type Err = ParameterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lookup_parameter(s).ok_or_else(|| ParameterError::UnknownParameter(s.to_string()))
    }
}

/// A parameter value as seen by the validation table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawValue<'a> {
    Absent,
    Number(f64),
    Text(&'a str),
}

impl<'a> RawValue<'a> {
    pub fn from_number(value: Option<f64>) -> Self {
        value.map_or(RawValue::Absent, RawValue::Number)
    }

    pub fn from_text(value: Option<&'a str>) -> Self {
        value.map_or(RawValue::Absent, RawValue::Text)
    }

    pub fn is_absent(&self) -> bool {
        match self {
            RawValue::Absent => true,
            RawValue::Text(t) => t.trim() == NONE_MARKER,
            RawValue::Number(_) => false,
        }
    }

    fn is_marker(&self, marker: &str) -> bool {
        matches!(self, RawValue::Text(t) if t.trim().eq_ignore_ascii_case(marker))
    }
}

impl fmt::Display for RawValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Absent => f.write_str(NONE_MARKER),
            RawValue::Number(n) => write!(f, "{}", n),
            RawValue::Text(t) => f.write_str(t),
        }
    }
}

/// What a parameter may hold for a given position type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueRule {
    PositiveNumberOrAbsent,
    ReagentNameOrAbsent,
    MockMarkerOrAbsent,
    UntreatedMarkerOrAbsent(PositionType),
    MustBeAbsent,
}

impl ValueRule {
    pub fn accepts(&self, value: RawValue<'_>) -> bool {
        if value.is_absent() {
            return true;
        }
        match self {
            ValueRule::PositiveNumberOrAbsent => match value {
                RawValue::Number(n) => is_positive_number(n),
                RawValue::Text(t) => t.trim().parse::<f64>().is_ok_and(is_positive_number),
                RawValue::Absent => true,
            },
            ValueRule::ReagentNameOrAbsent => match value {
                RawValue::Text(t) => t.trim().chars().count() >= MIN_REAGENT_NAME_LENGTH,
                _ => false,
            },
            ValueRule::MockMarkerOrAbsent => value.is_marker(MOCK_MARKER),
            ValueRule::UntreatedMarkerOrAbsent(kind) => value.is_marker(kind.name()),
            ValueRule::MustBeAbsent => false,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ValueRule::PositiveNumberOrAbsent => "a positive number or nothing".to_string(),
            ValueRule::ReagentNameOrAbsent => format!(
                "a name of at least {} characters or nothing",
                MIN_REAGENT_NAME_LENGTH
            ),
            ValueRule::MockMarkerOrAbsent => format!("'{}' or nothing", MOCK_MARKER),
            ValueRule::UntreatedMarkerOrAbsent(kind) => format!("'{}' or nothing", kind.name()),
            ValueRule::MustBeAbsent => "nothing".to_string(),
        }
    }
}

/// Validity table for the liquid-describing parameters.
///
/// Returns `None` for the structural parameters (pool and position type), which are
/// checked against each other instead.
pub fn value_rule(
    parameter: TransfectionParameter,
    position_type: PositionType,
) -> Option<ValueRule> {
    use TransfectionParameter as P;
    if matches!(parameter, P::MoleculeDesignPool | P::PositionType) {
        return None;
    }
    let rule = match position_type {
        PositionType::Empty => ValueRule::MustBeAbsent,
        PositionType::Untreated | PositionType::Untransfected => {
            ValueRule::UntreatedMarkerOrAbsent(position_type)
        }
        PositionType::Mock if parameter == P::FinalConcentration => {
            ValueRule::MockMarkerOrAbsent
        }
        PositionType::Fixed
        | PositionType::Floating
        | PositionType::Mock
        | PositionType::Library => match parameter {
            P::ReagentName => ValueRule::ReagentNameOrAbsent,
            _ => ValueRule::PositiveNumberOrAbsent,
        },
    };
    Some(rule)
}

/// Checks a raw value of a mock row.
///
/// Dilution factors must be positive numbers, reagent names longer than two
/// characters, and the final concentration must be the mock marker. Absent values are
/// always accepted.
pub fn is_valid_mock_value(value: Option<&str>, parameter: TransfectionParameter) -> bool {
    let Some(value) = value.map(str::trim).filter(|v| *v != NONE_MARKER) else {
        return true;
    };
    match parameter {
        TransfectionParameter::ReagentDilutionFactor
        | TransfectionParameter::OptimemDilutionFactor => {
            value.parse::<f64>().is_ok_and(is_positive_number)
        }
        TransfectionParameter::ReagentName => value.chars().count() > 2,
        TransfectionParameter::FinalConcentration => value.eq_ignore_ascii_case(MOCK_MARKER),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_types_parse_by_name() {
        assert_eq!("Fixed".parse::<PositionType>().unwrap(), PositionType::Fixed);
        assert_eq!(
            "untransfected".parse::<PositionType>().unwrap(),
            PositionType::Untransfected
        );
        assert!("sample".parse::<PositionType>().is_err());
    }

    #[test]
    fn untreated_family_and_source_requirements() {
        assert!(PositionType::Untreated.is_untreated_type());
        assert!(PositionType::Untransfected.is_untreated_type());
        assert!(!PositionType::Mock.is_untreated_type());
        assert!(PositionType::Fixed.requires_source());
        assert!(PositionType::Mock.requires_source());
        assert!(!PositionType::Empty.requires_source());
        assert!(!PositionType::Untreated.requires_source());
    }

    #[test]
    fn parameters_parse_from_predicates_and_aliases() {
        for parameter in TransfectionParameter::ALL {
            assert_eq!(
                parameter.predicate().parse::<TransfectionParameter>(),
                Ok(parameter)
            );
        }
        assert_eq!(
            "ISO Conc".parse::<TransfectionParameter>(),
            Ok(TransfectionParameter::IsoConcentration)
        );
    }

    #[test]
    fn empty_positions_accept_nothing() {
        for parameter in TransfectionParameter::ALL {
            if let Some(rule) = value_rule(parameter, PositionType::Empty) {
                assert!(rule.accepts(RawValue::Absent));
                assert!(!rule.accepts(RawValue::Number(1.0)));
                assert!(!rule.accepts(RawValue::Text("mix1")));
            }
        }
    }

    #[test]
    fn mock_final_concentration_accepts_only_marker() {
        let rule = value_rule(TransfectionParameter::FinalConcentration, PositionType::Mock).unwrap();
        assert!(rule.accepts(RawValue::Text("Mock")));
        assert!(rule.accepts(RawValue::Text("None")));
        assert!(rule.accepts(RawValue::Absent));
        assert!(!rule.accepts(RawValue::Number(10.0)));
    }

    #[test]
    fn untreated_accepts_own_marker_only() {
        let rule = value_rule(TransfectionParameter::ReagentName, PositionType::Untreated).unwrap();
        assert!(rule.accepts(RawValue::Text("untreated")));
        assert!(!rule.accepts(RawValue::Text("untransfected")));
        assert!(!rule.accepts(RawValue::Text("mix1")));
        let rule = value_rule(
            TransfectionParameter::ReagentDilutionFactor,
            PositionType::Untransfected,
        )
        .unwrap();
        assert!(rule.accepts(RawValue::Text("UNTRANSFECTED")));
        assert!(!rule.accepts(RawValue::Number(140.0)));
    }

    #[test]
    fn fixed_positions_require_positive_numbers_and_names() {
        let dil = value_rule(TransfectionParameter::ReagentDilutionFactor, PositionType::Fixed)
            .unwrap();
        assert!(dil.accepts(RawValue::Number(1400.0)));
        assert!(dil.accepts(RawValue::Text("1400")));
        assert!(!dil.accepts(RawValue::Number(0.0)));
        assert!(!dil.accepts(RawValue::Text("-2")));
        assert!(!dil.accepts(RawValue::Text("abc")));

        let name = value_rule(TransfectionParameter::ReagentName, PositionType::Fixed).unwrap();
        assert!(name.accepts(RawValue::Text("mix1")));
        assert!(name.accepts(RawValue::Text("ab")));
        assert!(!name.accepts(RawValue::Text("a")));
    }

    #[test]
    fn structural_parameters_have_no_value_rule() {
        assert!(value_rule(TransfectionParameter::MoleculeDesignPool, PositionType::Fixed).is_none());
        assert!(value_rule(TransfectionParameter::PositionType, PositionType::Mock).is_none());
    }

    #[test]
    fn is_valid_mock_value_checks_each_parameter() {
        use TransfectionParameter as P;
        assert!(is_valid_mock_value(None, P::ReagentDilutionFactor));
        assert!(is_valid_mock_value(Some("140"), P::ReagentDilutionFactor));
        assert!(!is_valid_mock_value(Some("0"), P::ReagentDilutionFactor));
        assert!(!is_valid_mock_value(Some("x"), P::OptimemDilutionFactor));
        assert!(is_valid_mock_value(Some("mix1"), P::ReagentName));
        assert!(!is_valid_mock_value(Some("ab"), P::ReagentName));
        assert!(is_valid_mock_value(Some("MOCK"), P::FinalConcentration));
        assert!(is_valid_mock_value(Some("None"), P::FinalConcentration));
        assert!(!is_valid_mock_value(Some("10"), P::FinalConcentration));
    }
}
