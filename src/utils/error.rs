use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Failed to read source '{path}': {message}")]
    SourceReadError { path: String, message: String },

    #[error("Cannot cast {value} in column '{column}' to {target}")]
    CoercionError {
        column: String,
        value: String,
        target: String,
    },

    #[error("Failed to write table '{table}': {message}")]
    SinkWriteError { table: String, message: String },

    #[error("Database error: {0}")]
    DatabaseError(#[from] tokio_postgres::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Source,
    Transform,
    Sink,
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
    pub fn sink_write(table: impl Into<String>, err: impl std::fmt::Display) -> Self {
        EtlError::SinkWriteError {
            table: table.into(),
            message: err.to_string(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::SourceReadError { .. } | EtlError::SerializationError(_) => {
                ErrorCategory::Source
            }
            EtlError::CoercionError { .. } => ErrorCategory::Transform,
            EtlError::SinkWriteError { .. }
            | EtlError::DatabaseError(_)
            | EtlError::CsvError(_) => ErrorCategory::Sink,
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorCategory::Configuration,
            EtlError::IoError(_) => ErrorCategory::System,
        }
    }

    /// 所有資料層級的錯誤都不會中止整個執行
    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Transform => ErrorSeverity::Low,
            ErrorCategory::Source => ErrorSeverity::Medium,
            ErrorCategory::Sink => ErrorSeverity::High,
            ErrorCategory::Configuration | ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Source => "Check that the source file exists and contains a JSON array",
            ErrorCategory::Transform => "The offending cell was stored as null",
            ErrorCategory::Sink => {
                "Check the database connection string (PG_URI) and that the server is reachable"
            }
            ErrorCategory::Configuration => "Check command line flags, .env and the TOML config",
            ErrorCategory::System => "Check file permissions and available disk space",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::SourceReadError { path, .. } => {
                format!("Could not read source data from {}", path)
            }
            EtlError::SinkWriteError { table, .. } => {
                format!("Could not load table {}", table)
            }
            EtlError::DatabaseError(_) => "The database rejected the request".to_string(),
            EtlError::MissingConfigError { field } => {
                format!("Missing configuration value: {}", field)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_errors_are_high_severity() {
        let err = EtlError::sink_write("fetch.brands", "connection reset");
        assert_eq!(err.category(), ErrorCategory::Sink);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert_eq!(
            err.to_string(),
            "Failed to write table 'fetch.brands': connection reset"
        );
    }

    #[test]
    fn test_coercion_errors_are_low_severity() {
        let err = EtlError::CoercionError {
            column: "itemPrice".to_string(),
            value: "\"N/A\"".to_string(),
            target: "Float".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Low);
    }
}
