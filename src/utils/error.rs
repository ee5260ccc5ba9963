use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Failed to fetch {key}: {reason}")]
    FetchError { key: String, reason: String },

    #[error("Timed out after {seconds}s waiting for {condition} on {key}")]
    TimeoutError {
        key: String,
        condition: String,
        seconds: u64,
    },

    #[error("Failed to parse {key}: missing field '{field}'")]
    ParseError { key: String, field: String },

    #[error("Column '{column}' not found in table")]
    MissingColumnError { column: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

pub type Result<T> = std::result::Result<T, EtlError>;

/// 單筆記錄失敗的種類；這些錯誤只會讓該筆記錄被略過
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordErrorKind {
    Fetch,
    Timeout,
    Parse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Data,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn fetch(key: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        EtlError::FetchError {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    pub fn parse(key: impl Into<String>, field: impl Into<String>) -> Self {
        EtlError::ParseError {
            key: key.into(),
            field: field.into(),
        }
    }

    pub fn record_kind(&self) -> Option<RecordErrorKind> {
        match self {
            EtlError::FetchError { .. } => Some(RecordErrorKind::Fetch),
            EtlError::TimeoutError { .. } => Some(RecordErrorKind::Timeout),
            EtlError::ParseError { .. } => Some(RecordErrorKind::Parse),
            _ => None,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ApiError(_) | EtlError::FetchError { .. } | EtlError::TimeoutError { .. } => {
                ErrorCategory::Network
            }
            EtlError::CsvError(_)
            | EtlError::SerializationError(_)
            | EtlError::MissingColumnError { .. }
            | EtlError::ParseError { .. } => ErrorCategory::Data,
            EtlError::UrlError(_)
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorCategory::Configuration,
            EtlError::IoError(_) | EtlError::ZipError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EtlError::TimeoutError { .. } => ErrorSeverity::Low,
            EtlError::ApiError(_) | EtlError::FetchError { .. } | EtlError::ParseError { .. } => {
                ErrorSeverity::Medium
            }
            EtlError::CsvError(_)
            | EtlError::SerializationError(_)
            | EtlError::MissingColumnError { .. }
            | EtlError::UrlError(_)
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorSeverity::High,
            EtlError::IoError(_) | EtlError::ZipError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check network connectivity and that the endpoint is reachable",
            ErrorCategory::Data => "Check that the input file and responses have the expected fields",
            ErrorCategory::Configuration => {
                "Check the TOML configuration file and any ${VAR} environment variables it uses"
            }
            ErrorCategory::System => "Check file permissions and available disk space",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::MissingConfigError { field } => {
                format!("缺少必要設定: {}", field)
            }
            EtlError::InvalidConfigValueError { field, reason, .. } => {
                format!("設定值 {} 無效: {}", field, reason)
            }
            EtlError::ConfigValidationError { field, message } => {
                format!("設定檔錯誤 ({}): {}", field, message)
            }
            EtlError::IoError(e) => format!("檔案讀寫失敗: {}", e),
            EtlError::CsvError(e) => format!("CSV 處理失敗: {}", e),
            other => other.to_string(),
        }
    }
}
