use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoanError {
    #[error("Remote call to {endpoint} failed: {cause}")]
    Transport { endpoint: String, cause: String },

    #[error("Malformed envelope: {reason}")]
    MalformedEnvelope { reason: String },

    #[error("Response element '{element}' not found in envelope")]
    ResponseElementMissing { element: String },

    #[error("Required field missing: {field}")]
    FieldMissing { field: String },

    #[error("Invalid format for '{field}' (value: {value}): {reason}")]
    FormatError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Stage '{stage}' requires '{field}' from an earlier stage")]
    StageDependencyUnmet { stage: String, field: String },

    #[error("Document error: {message}")]
    DocumentError { message: String },

    #[error("Field extraction failed: {message}")]
    ExtractorError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid configuration value for '{field}' (value: {value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Envelope,
    Payload,
    Pipeline,
    Input,
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

impl LoanError {
    pub fn transport(endpoint: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::Transport {
            endpoint: endpoint.into(),
            cause: cause.to_string(),
        }
    }

    pub fn field_missing(field: impl Into<String>) -> Self {
        Self::FieldMissing {
            field: field.into(),
        }
    }

    pub fn format_error(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::FormatError {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Transport { .. } => ErrorCategory::Network,
            Self::MalformedEnvelope { .. } | Self::ResponseElementMissing { .. } => {
                ErrorCategory::Envelope
            }
            Self::FieldMissing { .. } | Self::FormatError { .. } | Self::SerializationError(_) => {
                ErrorCategory::Payload
            }
            Self::StageDependencyUnmet { .. } => ErrorCategory::Pipeline,
            Self::DocumentError { .. } | Self::ExtractorError { .. } => ErrorCategory::Input,
            Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. }
            | Self::CsvError(_) => ErrorCategory::Configuration,
            Self::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Envelope | ErrorCategory::Payload | ErrorCategory::Pipeline => {
                ErrorSeverity::High
            }
            ErrorCategory::Input => ErrorSeverity::High,
            ErrorCategory::Configuration | ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::Transport { .. } => {
                "Check that the remote decision services are running and reachable, then retry"
            }
            Self::MalformedEnvelope { .. } | Self::ResponseElementMissing { .. } => {
                "Verify the remote service speaks the expected envelope format and namespace"
            }
            Self::FieldMissing { .. } | Self::FormatError { .. } | Self::SerializationError(_) => {
                "Make sure the application letter states the customer id, property price, surface area and full address"
            }
            Self::StageDependencyUnmet { .. } => {
                "Complete the application document with the missing property details"
            }
            Self::DocumentError { .. } => "Provide a readable plain-text application letter",
            Self::ExtractorError { .. } => {
                "Check the language-model API key and endpoint in the configuration"
            }
            Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => "Review the configuration file and environment",
            Self::CsvError(_) => "Check the reference data CSV files for missing columns or bad values",
            Self::IoError(_) => "Check file paths and permissions",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::Transport { endpoint, .. } => {
                format!("Could not reach the decision service at {}", endpoint)
            }
            Self::MalformedEnvelope { .. } | Self::ResponseElementMissing { .. } => {
                "The decision service returned an unreadable response".to_string()
            }
            Self::FieldMissing { field } => {
                format!("The application is missing required information: {}", field)
            }
            Self::FormatError { field, .. } => {
                format!("The application contains an invalid value for {}", field)
            }
            Self::StageDependencyUnmet { field, .. } => {
                format!("The application is missing information needed later: {}", field)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LoanError>;
