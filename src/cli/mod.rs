//! CLI command definitions and handlers

pub(crate) mod analyze;
mod init;
mod prepare;
mod validate;
mod variables;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::{load_project_config, ProjectConfig};

/// schoolstat - California public school data analysis
#[derive(Parser, Debug)]
#[command(name = "schoolstat")]
#[command(
    version,
    about = "Correlation analysis, charts and reports for California public school data",
    long_about = "schoolstat loads the merged school table (salaries, test scores, \
socioeconomic status and chronic absence per school), computes the pairwise \
correlation matrix and SED bucket means, and writes PNG charts plus an optional \
Markdown or HTML report.\n\n\
Run without a subcommand to analyze data/school_data.csv:\n  \
schoolstat --with-report",
    after_help = "\
Examples:
  schoolstat                               Statistics and charts only
  schoolstat --with-report                 Also write the Markdown report
  schoolstat --html-report --open          Write the HTML report and open it
  schoolstat --html-report --publish-dir docs   Copy HTML/PNG output for publishing
  schoolstat prepare --raw-dir data        Merge the raw state extracts
  schoolstat variables                     Print the variable reference"
)]
pub struct Cli {
    /// Merged school table (default: data/school_data.csv)
    #[arg(long, global = true)]
    pub data: Option<PathBuf>,

    /// Config file (default: ./schoolstat.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    #[command(flatten)]
    pub analyze: AnalyzeArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Flags for the analysis run; accepted with or without `analyze`
#[derive(Args, Debug, Clone, Default)]
pub struct AnalyzeArgs {
    /// Write the Markdown report (school_data_report.md)
    #[arg(long, global = true)]
    pub with_report: bool,

    /// Write the standalone HTML report (school_data_report.html)
    #[arg(long, global = true)]
    pub html_report: bool,

    /// Directory for charts and reports (default: output)
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Copy HTML and PNG artifacts here after the run
    #[arg(long, global = true)]
    pub publish_dir: Option<PathBuf>,

    /// Open the written report with the system viewer
    #[arg(long, global = true)]
    pub open: bool,

    /// Compute statistics and reports without drawing charts
    #[arg(long, global = true)]
    pub skip_charts: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze the merged table (the default when no subcommand is given)
    Analyze,

    /// Merge the raw state extracts into the analysis table
    #[command(after_help = "\
Expected files in the raw directory:
  Expenditure_Data.txt     comma-separated, 5 footer lines
  Salary_Data.txt          comma-separated, 5 footer lines
  Test_Score_Results.txt   tab-separated
  Subgroup_Data.txt        comma-separated
  Chronic_Absent.txt       pipe-separated")]
    Prepare {
        /// Directory holding the raw extracts (default: data)
        #[arg(long)]
        raw_dir: Option<PathBuf>,

        /// Output CSV (default: the --data path)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Load the data file and report problems without writing anything
    Validate,

    /// Print the variable reference guide
    Variables,

    /// Write an example schoolstat.toml in the current directory
    Init,
}

/// Run the CLI command
pub fn run(cli: Cli) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to determine the working directory")?;

    match cli.command {
        Some(Commands::Init) => init::run(&cwd),

        Some(Commands::Variables) => variables::run(),

        Some(Commands::Validate) => {
            let config = load_config(cli.config.as_deref(), &cwd)?;
            let data = cli.data.unwrap_or_else(|| config.paths.data.clone());
            validate::run(&data)
        }

        Some(Commands::Prepare { raw_dir, out }) => {
            let config = load_config(cli.config.as_deref(), &cwd)?;
            let raw_dir = raw_dir.unwrap_or_else(|| config.paths.raw_dir.clone());
            let out = out
                .or(cli.data)
                .unwrap_or_else(|| config.paths.data.clone());
            prepare::run(&raw_dir, &out)
        }

        Some(Commands::Analyze) | None => {
            let config = load_config(cli.config.as_deref(), &cwd)?;
            analyze::run(&cli.analyze, cli.data.as_deref(), &config)
        }
    }
}

fn load_config(explicit: Option<&Path>, cwd: &Path) -> Result<ProjectConfig> {
    load_project_config(explicit, cwd).context("Failed to load configuration")
}
