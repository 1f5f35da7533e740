use crate::config::validate_common;
use crate::core::transport::DEFAULT_ENDPOINT;
use crate::core::{ColumnMapping, ConfigProvider, OperationForm};
use crate::utils::error::{MapperError, Result};
use crate::utils::validation::{validate_non_empty_string, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub session: SessionConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub mapping: MappingConfig,
    #[serde(default)]
    pub derive: Vec<OperationForm>,
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub output: OutputConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub primary: String,
    pub reference: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingConfig {
    #[serde(default = "default_true")]
    pub auto: bool,
    #[serde(default = "default_true")]
    pub apply: bool,
    /// Column index (as a string key) -> reference field name.
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            auto: true,
            apply: true,
            overrides: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    pub timeout_seconds: Option<u64>,
    pub headers: Option<HashMap<String, String>>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_seconds: None,
            headers: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    pub path: Option<String>,
    #[serde(default)]
    pub preview: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub log_format: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(MapperError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| MapperError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${API_TOKEN})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| MapperError::ConfigError {
            message: format!("Invalid placeholder pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("session.name", &self.session.name)?;
        validate_common(self)?;

        for key in self.mapping.overrides.keys() {
            if key.trim().parse::<usize>().is_err() {
                return Err(MapperError::InvalidConfigValueError {
                    field: "mapping.overrides".to_string(),
                    value: key.clone(),
                    reason: "Keys must be column indices".to_string(),
                });
            }
        }

        if let Some(format) = self.log_format() {
            if !matches!(format, "compact" | "json") {
                return Err(MapperError::InvalidConfigValueError {
                    field: "monitoring.log_format".to_string(),
                    value: format.to_string(),
                    reason: "Valid formats: compact, json".to_string(),
                });
            }
        }

        Ok(())
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn log_format(&self) -> Option<&str> {
        self.monitoring.as_ref()?.log_format.as_deref()
    }

    pub fn preview_enabled(&self) -> bool {
        self.output.preview
    }
}

impl ConfigProvider for TomlConfig {
    fn api_endpoint(&self) -> &str {
        &self.target.endpoint
    }

    fn primary_file(&self) -> &str {
        &self.source.primary
    }

    fn reference_file(&self) -> &str {
        &self.source.reference
    }

    fn output_path(&self) -> Option<&str> {
        self.output.path.as_deref()
    }

    fn auto_map(&self) -> bool {
        self.mapping.auto
    }

    fn apply_mapping(&self) -> bool {
        self.mapping.apply
    }

    fn mapping_overrides(&self) -> ColumnMapping {
        self.mapping
            .overrides
            .iter()
            .filter_map(|(key, field)| Some((key.trim().parse::<usize>().ok()?, field.clone())))
            .collect()
    }

    fn derived_columns(&self) -> Vec<OperationForm> {
        self.derive.clone()
    }

    fn timeout_seconds(&self) -> Option<u64> {
        self.target.timeout_seconds
    }

    fn request_headers(&self) -> Vec<(String, String)> {
        self.target
            .headers
            .as_ref()
            .map(|headers| {
                headers
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
