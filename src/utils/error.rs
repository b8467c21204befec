use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataSourceError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Backend responded with status {status}: {message}")]
    HttpStatusError { status: u16, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },
}

/// 錯誤分類，供 CLI 決定輸出與退出碼
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Backend,
    Data,
    Configuration,
    System,
}

impl DataSourceError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            DataSourceError::ApiError(_) => ErrorCategory::Network,
            DataSourceError::HttpStatusError { .. } => ErrorCategory::Backend,
            DataSourceError::SerializationError(_) => ErrorCategory::Data,
            DataSourceError::IoError(_) => ErrorCategory::System,
            DataSourceError::ConfigError { .. }
            | DataSourceError::InvalidConfigValueError { .. }
            | DataSourceError::ConfigValidationError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            DataSourceError::ApiError(e) if e.is_timeout() => {
                "The backend did not answer in time".to_string()
            }
            DataSourceError::ApiError(e) if e.is_connect() => {
                "Could not connect to the backend".to_string()
            }
            DataSourceError::ApiError(e) => format!("Request to the backend failed: {}", e),
            DataSourceError::HttpStatusError { status, message } => {
                format!("The backend rejected the request ({}): {}", status, message)
            }
            DataSourceError::SerializationError(e) => format!("Malformed JSON: {}", e),
            DataSourceError::IoError(e) => format!("File system error: {}", e),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check that the backend URL is reachable",
            ErrorCategory::Backend => "Inspect the backend logs for the failing endpoint",
            ErrorCategory::Data => "Check the JSON passed on the command line or returned by the backend",
            ErrorCategory::Configuration => "Fix the configuration file and try again",
            ErrorCategory::System => "Check file permissions and paths",
        }
    }
}

pub type Result<T> = std::result::Result<T, DataSourceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_is_backend_category() {
        let err = DataSourceError::HttpStatusError {
            status: 502,
            message: "Bad Gateway".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Backend);
        assert!(err.user_friendly_message().contains("502"));
    }

    #[test]
    fn test_config_errors_share_category() {
        let parse = DataSourceError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: "expected `]`".to_string(),
        };
        let invalid = DataSourceError::InvalidConfigValueError {
            field: "datasource.url".to_string(),
            value: "ftp://x".to_string(),
            reason: "Unsupported URL scheme: ftp".to_string(),
        };
        assert_eq!(parse.category(), ErrorCategory::Configuration);
        assert_eq!(invalid.category(), ErrorCategory::Configuration);
        assert_eq!(
            invalid.to_string(),
            "Invalid value for 'datasource.url' (ftp://x): Unsupported URL scheme: ftp"
        );
    }
}
