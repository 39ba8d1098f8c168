use crate::cli::PlanArgs;
use crate::config::builder::build_config;
use crate::design::load_design_racks;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Write};
use tracing::info;
use transfex::core::parameters::parameter::TransfectionParameter;
use transfex::engine::progress::ProgressReporter;
use transfex::workflows::plan::{self, PlanningResult};

/// One row of the source plate CSV.
#[derive(Debug, Serialize)]
struct SourceRecord {
    position: String,
    position_type: String,
    pool: String,
    reagent_name: Option<String>,
    reagent_dilution_factor: Option<f64>,
    final_concentration: Option<String>,
    optimem_dilution_factor: Option<f64>,
    target_wells: usize,
    iso_volume: f64,
    iso_concentration: Option<f64>,
    mastermix_volume: f64,
    reagent_dilution_volume: f64,
}

pub fn run(args: &PlanArgs, quiet: bool) -> Result<()> {
    let app_config = build_config(args)?;

    info!("Loading design racks from {:?}", &app_config.design_path);
    let design_racks = load_design_racks(&app_config.design_path)?;

    let progress_handler = if quiet {
        CliProgressHandler::hidden()
    } else {
        CliProgressHandler::new()
    };
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    info!("Invoking the core planning workflow...");
    let result = plan::run(&design_racks, &app_config.planning, &reporter)?;

    match &app_config.output_path {
        Some(path) => {
            write_records(File::create(path)?, &result)?;
            eprintln!(
                "Source layout with {} position(s) written to: {}",
                result.summaries.len(),
                path.display()
            );
        }
        None => write_records(io::stdout().lock(), &result)?,
    }

    for warning in &result.warnings {
        eprintln!("Warning: {}", warning);
    }
    Ok(())
}

fn write_records<W: Write>(writer: W, result: &PlanningResult) -> Result<()> {
    let summaries: HashMap<_, _> = result
        .summaries
        .iter()
        .map(|summary| (summary.rack_position, summary))
        .collect();

    let mut csv_writer = csv::Writer::from_writer(writer);
    for position in result.source_layout.sorted_positions() {
        let Some(summary) = summaries.get(&position.rack_position()) else {
            continue;
        };
        csv_writer.serialize(SourceRecord {
            position: position.rack_position().label(),
            position_type: position.position_type().to_string(),
            pool: position
                .pool()
                .map(ToString::to_string)
                .unwrap_or_default(),
            reagent_name: position.reagent_name().map(str::to_string),
            reagent_dilution_factor: position.reagent_dil_factor(),
            final_concentration: position.tag_value(TransfectionParameter::FinalConcentration),
            optimem_dilution_factor: position.optimem_dil_factor(),
            target_wells: summary.target_well_count,
            iso_volume: summary.iso_volume,
            iso_concentration: summary.iso_concentration,
            mastermix_volume: summary.mastermix_volume,
            reagent_dilution_volume: summary.reagent_dilution_volume,
        })?;
    }
    csv_writer.flush()?;
    Ok(())
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
        id = 205201
        molecule-type = "siRNA"
        stock-concentration = 50000

        [[racks]]
        label = "design_1"
        shape = "8x12"

        [[racks.wells]]
        positions = ["A1", "B1", "C1"]
        pool = "205200"
        reagent-name = "RNAiMax"
        reagent-dilution-factor = 1400
        final-concentration = 10

        [[racks.wells]]
        positions = ["A2"]
        pool = "205201"
        reagent-name = "RNAiMax"
        reagent-dilution-factor = 1400
        final-concentration = 10

        [[racks.wells]]
        positions = ["H12"]
        pool = "mock"
        reagent-name = "RNAiMax"
        reagent-dilution-factor = 1400

        [[racks.wells]]
        positions = ["H11"]
        pool = "untreated"
    "#;

    fn plan_args(dir: &std::path::Path) -> PlanArgs {
        let design = dir.join("design.toml");
        fs::write(&design, DESIGN).unwrap();
        PlanArgs {
            design,
            config: None,
            output: Some(dir.join("source.csv")),
            replicates: Some(2),
            pipetting: None,
            reservoir: None,
            partial_hash: false,
            no_one_to_one: false,
            set_values: vec![],
        }
    }

    fn read_rows(path: &PathBuf) -> Vec<csv::StringRecord> {
        let mut reader = csv::Reader::from_path(path).unwrap();
        reader.records().map(|r| r.unwrap()).collect()
    }

    #[test]
    fn plan_writes_one_row_per_distinct_liquid() {
        let dir = tempdir().unwrap();
        let args = plan_args(dir.path());
        run(&args, true).expect("planning should succeed");

        let output = args.output.unwrap();
        let mut reader = csv::Reader::from_path(&output).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "position");
        assert_eq!(&headers[8], "iso_volume");

        let rows = read_rows(&output);
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|row| &row[1] != "untreated"));
    }

    #[test]
    fn plan_reports_mock_final_concentration_as_marker() {
        let dir = tempdir().unwrap();
        let args = plan_args(dir.path());
        run(&args, true).unwrap();

        let rows = read_rows(&args.output.unwrap());
        let mock = rows
            .iter()
            .find(|row| &row[1] == "mock")
            .expect("mock row present");
        assert_eq!(&mock[5], "mock");
        assert_eq!(&mock[9], "");
    }

    #[test]
    fn plan_fails_for_missing_design_file() {
        let dir = tempdir().unwrap();
        let mut args = plan_args(dir.path());
        args.design = dir.path().join("missing.toml");
        assert!(run(&args, true).is_err());
    }
}
