use thiserror::Error;

#[derive(Error, Debug)]
pub enum MapperError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("HTTP {status}: {status_text}")]
    HttpStatusError { status: u16, status_text: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("No data found to send!")]
    NoDataError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Data,
    Io,
    Configuration,
    Validation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl MapperError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            MapperError::ApiError(_) | MapperError::HttpStatusError { .. } => {
                ErrorCategory::Network
            }
            MapperError::CsvError(_)
            | MapperError::SerializationError(_)
            | MapperError::NoDataError => ErrorCategory::Data,
            MapperError::IoError(_) => ErrorCategory::Io,
            MapperError::ConfigError { .. }
            | MapperError::ConfigValidationError { .. }
            | MapperError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            MapperError::ValidationError { .. } => ErrorCategory::Validation,
        }
    }

    /// 錯誤嚴重程度，CLI 依此決定退出碼
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            MapperError::NoDataError => ErrorSeverity::Low,
            MapperError::ApiError(_) | MapperError::HttpStatusError { .. } => {
                ErrorSeverity::Medium
            }
            MapperError::CsvError(_)
            | MapperError::SerializationError(_)
            | MapperError::ValidationError { .. }
            | MapperError::ConfigError { .. }
            | MapperError::ConfigValidationError { .. }
            | MapperError::InvalidConfigValueError { .. } => ErrorSeverity::High,
            MapperError::IoError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            MapperError::ApiError(_) => {
                "Make sure the backend server is running and reachable".to_string()
            }
            MapperError::HttpStatusError { status, .. } if *status >= 500 => {
                "The backend failed to process the data, check its logs and retry".to_string()
            }
            MapperError::HttpStatusError { .. } => {
                "The backend rejected the payload, check the field mapping".to_string()
            }
            MapperError::CsvError(_) => "Check that the input file is valid CSV".to_string(),
            MapperError::IoError(_) => "Check file paths and permissions".to_string(),
            MapperError::SerializationError(_) => {
                "The records could not be encoded as JSON for the request body or output file"
                    .to_string()
            }
            MapperError::ConfigError { .. }
            | MapperError::ConfigValidationError { .. }
            | MapperError::InvalidConfigValueError { .. } => {
                "Review the command line flags or the TOML configuration".to_string()
            }
            MapperError::ValidationError { .. } => {
                "Fill in every field of the derived column before adding it".to_string()
            }
            MapperError::NoDataError => "Load a primary CSV with at least one row".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            MapperError::ApiError(e) => format!("Backend connection error: {}", e),
            MapperError::HttpStatusError {
                status,
                status_text,
            } => format!("Backend connection error: HTTP {}: {}", status, status_text),
            MapperError::NoDataError => "No data found to send!".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MapperError>;
