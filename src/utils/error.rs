use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Page {url} answered with status {status}")]
    HttpStatusError { url: String, status: u16 },

    #[error("No matchCentreData found in page")]
    PayloadNotFound,

    #[error("Unbalanced {what} starting at byte {offset}")]
    UnbalancedPayload { what: &'static str, offset: usize },

    #[error("No page source given: pass an HTML file, a URL or a match id")]
    MissingSource,

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid configuration value for {field}: {value} ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Source,
    Configuration,
    Data,
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
    pub fn processing(message: impl Into<String>) -> Self {
        EtlError::ProcessingError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::HttpError(_) | EtlError::HttpStatusError { .. } => ErrorCategory::Network,
            EtlError::PayloadNotFound
            | EtlError::UnbalancedPayload { .. }
            | EtlError::MissingSource => ErrorCategory::Source,
            EtlError::TomlError(_)
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            EtlError::CsvError(_)
            | EtlError::SerializationError(_)
            | EtlError::ProcessingError { .. }
            | EtlError::ValidationError { .. } => ErrorCategory::Data,
            EtlError::IoError(_) | EtlError::ZipError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Source | ErrorCategory::Configuration | ErrorCategory::Data => {
                ErrorSeverity::High
            }
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::HttpError(_) | EtlError::HttpStatusError { .. } => {
                "The site may be rate limiting; wait a few minutes or save the page HTML and use --html"
            }
            EtlError::PayloadNotFound | EtlError::UnbalancedPayload { .. } => {
                "Make sure the saved page is a fully loaded Match Centre page (Live or Show/Match-Centre)"
            }
            EtlError::MissingSource => "Pass --html, --url or --match-id",
            EtlError::TomlError(_)
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::ConfigValidationError { .. } => {
                "Check the TOML configuration file and environment variables"
            }
            EtlError::CsvError(_) | EtlError::SerializationError(_) => {
                "Inspect the input file; it may be truncated or use an unexpected layout"
            }
            EtlError::ProcessingError { .. } | EtlError::ValidationError { .. } => {
                "Re-run with --verbose to see which record failed"
            }
            EtlError::IoError(_) | EtlError::ZipError(_) => {
                "Check that the output directory exists and is writable"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not download the page: {}", self),
            ErrorCategory::Source => format!("Could not read match data: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Data => format!("Bad input data: {}", self),
            ErrorCategory::System => format!("File system problem: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_maps_to_exit_codes() {
        assert_eq!(EtlError::PayloadNotFound.exit_code(), 1);
        assert_eq!(
            EtlError::HttpStatusError {
                url: "https://example.com".to_string(),
                status: 403
            }
            .exit_code(),
            2
        );
        let io = EtlError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(io.category(), ErrorCategory::System);
        assert_eq!(io.exit_code(), 3);
    }

    #[test]
    fn test_user_friendly_message_mentions_cause() {
        let err = EtlError::processing("no events");
        assert!(err.user_friendly_message().contains("no events"));
    }
}
