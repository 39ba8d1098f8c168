pub mod identifiers;
pub mod numbers;
