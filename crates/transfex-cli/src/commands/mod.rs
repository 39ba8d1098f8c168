pub mod plan;
pub mod volume;
