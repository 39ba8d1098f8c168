use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "transfex - plans the ISO source plate for RNAi transfection screens on a BioMek liquid handler.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Optimize the source layout for a set of design racks and compute its volumes.
    Plan(PlanArgs),
    /// Compute the ISO volume for a single source position.
    Volume(VolumeArgs),
}

/// Arguments for the `plan` subcommand.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Path to the design racks in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub design: PathBuf,

    /// Path to the planning configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Path for the CSV output. Written to stdout when omitted.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Override the number of replicate plates per design rack.
    #[arg(short, long, value_name = "INT")]
    pub replicates: Option<usize>,

    /// Override the liquid handler (e.g. 'BioMek', 'CyBio', 'manual').
    #[arg(long, value_name = "NAME")]
    pub pipetting: Option<String>,

    /// Override the ISO reservoir (e.g. 'standard 96', 'standard 384', 'deep 96').
    #[arg(long, value_name = "NAME")]
    pub reservoir: Option<String>,

    /// Group wells by the partial hash, ignoring final concentrations.
    #[arg(long)]
    pub partial_hash: bool,

    /// Never reuse the design rack coordinates for the source layout.
    #[arg(long)]
    pub no_one_to_one: bool,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S planning.replicates=3
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `volume` subcommand.
#[derive(Args, Debug)]
pub struct VolumeArgs {
    /// Number of target wells served by the source position on one design rack.
    #[arg(short, long, required = true, value_name = "INT")]
    pub wells: usize,

    /// Number of replicate plates.
    #[arg(short, long, required = true, value_name = "INT")]
    pub replicates: usize,

    /// OptiMem dilution factor of the position.
    #[arg(long, required = true, value_name = "FLOAT")]
    pub optimem: f64,

    /// Liquid handler used for the transfer.
    #[arg(long, value_name = "NAME")]
    pub pipetting: Option<String>,

    /// ISO reservoir holding the source liquid.
    #[arg(long, value_name = "NAME")]
    pub reservoir: Option<String>,
}
