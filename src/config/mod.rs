//! Configuration module for schoolstat
//!
//! This module handles:
//! - Project-level configuration (schoolstat.toml)
//! - Binning and report overrides
//! - The findings quoted in reports

mod project_config;

pub use project_config::{
    init_config, load_project_config, BinningConfig, ConfigError, PathsConfig, ProjectConfig,
    ReportConfig, CONFIG_FILE_NAME, EXAMPLE_CONFIG,
};
