use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Malformed date '{value}': {reason}")]
    DateFormatError { value: String, reason: String },

    #[error("Required column '{column}' is missing from the header")]
    MissingColumnError { column: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to insert data from {}: {source}", path.display())]
    IngestionError {
        path: PathBuf,
        #[source]
        source: Box<EtlError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Affects a single source; the run continues.
    Medium,
    /// Configuration problem; nothing was loaded.
    High,
    /// The store itself is unusable.
    Critical,
}

impl EtlError {
    pub fn date_format(value: &str, reason: impl Into<String>) -> Self {
        Self::DateFormatError {
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub fn ingestion(path: impl Into<PathBuf>, source: EtlError) -> Self {
        Self::IngestionError {
            path: path.into(),
            source: Box::new(source),
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EtlError::ConfigError { .. } | EtlError::InvalidConfigValueError { .. } => {
                ErrorSeverity::High
            }
            EtlError::DatabaseError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Medium,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::IoError(e) => format!("Could not read or write a file: {}", e),
            EtlError::CsvError(e) => format!("The input file is not valid delimited text: {}", e),
            EtlError::DatabaseError(e) => format!("The database rejected the operation: {}", e),
            EtlError::IngestionError { path, source } => {
                format!("Loading {} failed: {}", path.display(), source.user_friendly_message())
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::IoError(_) => "Check that the path exists and is readable",
            EtlError::CsvError(_) => "Check the delimiter configured for this source",
            EtlError::DatabaseError(_) => {
                "Check that the schema files created the destination tables"
            }
            EtlError::SerializationError(_) => "Check the rejection report path",
            EtlError::DateFormatError { .. } => {
                "Fix the date in the source file or set cleaning.on_malformed_date = \"reject\""
            }
            EtlError::MissingColumnError { .. } => {
                "Only enable clean_dates for sources with Start_Date and End_Date columns"
            }
            EtlError::ConfigError { .. } | EtlError::InvalidConfigValueError { .. } => {
                "Review the configuration file"
            }
            EtlError::IngestionError { source, .. } => source.recovery_suggestion(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
