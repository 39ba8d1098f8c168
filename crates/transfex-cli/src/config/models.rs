use std::path::PathBuf;
use transfex::engine::config::PlanningConfig;

pub struct AppConfig {
    pub design_path: PathBuf,
    pub output_path: Option<PathBuf>,
    pub planning: PlanningConfig,
}
