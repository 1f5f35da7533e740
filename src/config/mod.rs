pub mod cli;
pub mod toml_config;

use crate::core::transport::DEFAULT_ENDPOINT;
use crate::core::{ColumnMapping, ConfigProvider, OperationForm};
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_file_extension, validate_path, validate_positive_number, validate_url, Validate,
};
#[cfg(feature = "cli")]
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// `INDEX=FIELD`, e.g. `0=product_name`. An empty field clears the entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingOverride {
    pub index: usize,
    pub field: String,
}

impl FromStr for MappingOverride {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (index, field) = s
            .split_once('=')
            .ok_or_else(|| format!("invalid mapping '{}', expected INDEX=FIELD", s))?;
        let index = index
            .trim()
            .parse::<usize>()
            .map_err(|e| format!("invalid column index '{}': {}", index, e))?;

        Ok(Self {
            index,
            field: field.to_string(),
        })
    }
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "csv-mapper")]
#[command(about = "Map CSV columns to reference fields and send the rows as JSON")]
pub struct CliConfig {
    /// CSV file to transform and send
    #[arg(long)]
    pub primary: String,

    /// CSV file whose header row supplies the target field names
    #[arg(long)]
    pub reference: String,

    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    pub api_endpoint: String,

    /// Override one mapping entry, INDEX=FIELD (repeatable)
    #[arg(long = "map", value_name = "INDEX=FIELD")]
    pub mappings: Vec<MappingOverride>,

    #[arg(long, help = "Start from an empty mapping instead of the automatic one")]
    pub no_auto_map: bool,

    #[arg(long, help = "Keep the original headers")]
    pub skip_apply_mapping: bool,

    /// Derived column, SOURCE:OPERATOR:OPERAND:NEW_FIELD (repeatable)
    #[arg(long = "derive", value_name = "SOURCE:OP:OPERAND:NEW")]
    pub derived: Vec<OperationForm>,

    /// Also write the JSON payload to this file
    #[arg(long)]
    pub output: Option<String>,

    #[arg(long)]
    pub timeout_seconds: Option<u64>,

    #[arg(long, help = "Show the mapping and a preview without sending")]
    pub dry_run: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,

    #[arg(long, default_value = "compact", value_parser = ["compact", "json"])]
    pub log_format: String,
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn api_endpoint(&self) -> &str {
        &self.api_endpoint
    }

    fn primary_file(&self) -> &str {
        &self.primary
    }

    fn reference_file(&self) -> &str {
        &self.reference
    }

    fn output_path(&self) -> Option<&str> {
        self.output.as_deref()
    }

    fn auto_map(&self) -> bool {
        !self.no_auto_map
    }

    fn apply_mapping(&self) -> bool {
        !self.skip_apply_mapping
    }

    fn mapping_overrides(&self) -> ColumnMapping {
        self.mappings
            .iter()
            .map(|m| (m.index, m.field.clone()))
            .collect()
    }

    fn derived_columns(&self) -> Vec<OperationForm> {
        self.derived.clone()
    }

    fn timeout_seconds(&self) -> Option<u64> {
        self.timeout_seconds
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_common(self)
    }
}

/// Checks shared by every configuration source.
pub(crate) fn validate_common<C: ConfigProvider>(config: &C) -> Result<()> {
    validate_url("api_endpoint", config.api_endpoint())?;
    validate_path("primary", config.primary_file())?;
    validate_file_extension("primary", config.primary_file(), &["csv"])?;
    validate_path("reference", config.reference_file())?;
    validate_file_extension("reference", config.reference_file(), &["csv"])?;

    if let Some(output) = config.output_path() {
        validate_path("output", output)?;
    }

    if let Some(timeout) = config.timeout_seconds() {
        validate_positive_number("timeout_seconds", timeout, 1)?;
    }

    Ok(())
}
