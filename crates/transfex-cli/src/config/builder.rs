use super::defaults::DefaultsConfig;
use super::file::{FileConfig, FileHashKind};
use super::models::AppConfig;
use crate::cli::PlanArgs;
use crate::error::{CliError, Result};
use transfex::core::models::specs::{PipettingSpec, ReservoirSpec, SpecError};
use transfex::core::position::HashKind;
use transfex::engine::config::{OptimizerConfigBuilder, PlanningConfigBuilder};

pub fn build_config(args: &PlanArgs) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();

    let file_config = match &args.config {
        Some(config_path) => FileConfig::from_file(config_path)?,
        None => FileConfig::default(),
    };
    let mut file_config = apply_set_values(file_config, &args.set_values)?;

    let planning_file = file_config.planning.take().unwrap_or_default();
    let optimizer_file = file_config.optimizer.take().unwrap_or_default();

    let replicates = args
        .replicates
        .or(planning_file.replicates)
        .unwrap_or(defaults.replicates);
    let pipetting = resolve_pipetting(
        args.pipetting
            .as_deref()
            .or(planning_file.pipetting.as_deref())
            .unwrap_or(&defaults.pipetting),
    )?;
    let reservoir = resolve_reservoir(
        args.reservoir
            .as_deref()
            .or(planning_file.reservoir.as_deref())
            .unwrap_or(&defaults.reservoir),
    )?;

    let hash_kind = if args.partial_hash {
        HashKind::Partial
    } else {
        match optimizer_file.hash_kind {
            Some(kind) => kind.into(),
            None if defaults.partial_hash => HashKind::Partial,
            None => HashKind::Full,
        }
    };
    let allow_one_to_one = !args.no_one_to_one
        && optimizer_file
            .one_to_one
            .unwrap_or(defaults.allow_one_to_one);

    let optimizer = OptimizerConfigBuilder::new()
        .hash_kind(hash_kind)
        .allow_one_to_one(allow_one_to_one)
        .build();
    let planning = PlanningConfigBuilder::new()
        .optimizer(optimizer)
        .number_replicates(replicates)
        .pipetting(pipetting)
        .reservoir(reservoir)
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    Ok(AppConfig {
        design_path: args.design.clone(),
        output_path: args.output.clone(),
        planning,
    })
}

pub fn resolve_pipetting(name: &str) -> Result<PipettingSpec> {
    name.parse()
        .map_err(|e: SpecError| CliError::Config(e.to_string()))
}

pub fn resolve_reservoir(name: &str) -> Result<ReservoirSpec> {
    name.parse()
        .map_err(|e: SpecError| CliError::Config(e.to_string()))
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let (key, value_str) = kv_pair.split_once('=').ok_or_else(|| {
            CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            ))
        })?;

        match key {
            "planning.replicates" => {
                config
                    .planning
                    .get_or_insert_with(Default::default)
                    .replicates = Some(value_str.parse().map_err(|_| {
                    CliError::Config(format!("Invalid integer value for {}: {}", key, value_str))
                })?);
            }
            "planning.pipetting" => {
                config
                    .planning
                    .get_or_insert_with(Default::default)
                    .pipetting = Some(value_str.to_string());
            }
            "planning.reservoir" => {
                config
                    .planning
                    .get_or_insert_with(Default::default)
                    .reservoir = Some(value_str.to_string());
            }
            "optimizer.hash-kind" => {
                let kind = match value_str.to_ascii_lowercase().as_str() {
                    "full" => FileHashKind::Full,
                    "partial" => FileHashKind::Partial,
                    _ => {
                        return Err(CliError::Config(format!(
                            "Invalid hash kind for {}: {} (expected 'full' or 'partial')",
                            key, value_str
                        )));
                    }
                };
                config
                    .optimizer
                    .get_or_insert_with(Default::default)
                    .hash_kind = Some(kind);
            }
            "optimizer.one-to-one" => {
                config
                    .optimizer
                    .get_or_insert_with(Default::default)
                    .one_to_one = Some(value_str.parse().map_err(|_| {
                    CliError::Config(format!("Invalid boolean value for {}: {}", key, value_str))
                })?);
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}
