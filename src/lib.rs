//! schoolstat - California public school data analysis
//!
//! Loads the merged school table, computes pairwise correlations and
//! socioeconomic bucket means, and renders charts and reports.

pub mod charts;
pub mod cli;
pub mod config;
pub mod data;
pub mod findings;
pub mod models;
pub mod reporters;
pub mod stats;
