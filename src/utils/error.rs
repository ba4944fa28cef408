use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrepError {
    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Missing input table: {name}")]
    MissingTableError { name: String },

    #[error("Malformed table '{table}': {reason}")]
    MalformedTableError { table: String, reason: String },

    #[error("No stock concentration available for component '{component}'")]
    MissingStockError { component: String },

    #[error("Well {well} totals {total:.2} uL, expected {expected:.2} uL (outside tolerance)")]
    VolumeImbalanceError {
        well: String,
        total: f64,
        expected: f64,
    },

    #[error("Unknown pipette channel '{channel}'")]
    UnknownChannelError { channel: String },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid configuration value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Executor error: {message}")]
    ExecutorError { message: String },
}

/// Coarse grouping used for reporting and exit-code mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Validation,
    Config,
    Execution,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl PrepError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::CsvError(_)
            | Self::MissingTableError { .. }
            | Self::MalformedTableError { .. }
            | Self::MissingStockError { .. } => ErrorCategory::Input,
            Self::VolumeImbalanceError { .. } => ErrorCategory::Validation,
            Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::ConfigValidationError { .. }
            | Self::UnknownChannelError { .. } => ErrorCategory::Config,
            Self::ExecutorError { .. } => ErrorCategory::Execution,
            Self::IoError(_) | Self::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Validation => ErrorSeverity::Medium,
            ErrorCategory::Input | ErrorCategory::Config => ErrorSeverity::High,
            ErrorCategory::Execution | ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            Self::CsvError(_) | Self::MalformedTableError { .. } => {
                "Check the CSV headers and row shapes against the expected table formats"
                    .to_string()
            }
            Self::MissingTableError { name } => {
                format!("Provide the '{}' table or fix its path in the run configuration", name)
            }
            Self::MissingStockError { component } => format!(
                "Add a high or low stock concentration for '{}' to the stock table",
                component
            ),
            Self::VolumeImbalanceError { well, .. } => format!(
                "Review the target concentrations for well {} (they may overfill the well), or rerun with the warn policy",
                well
            ),
            Self::UnknownChannelError { .. } => {
                "Use one of the pipette channels declared in the configuration".to_string()
            }
            Self::MissingConfigError { field } | Self::ConfigValidationError { field, .. } => {
                format!("Set '{}' in the run configuration", field)
            }
            Self::InvalidConfigValueError { field, .. } => {
                format!("Correct the value of '{}' in the run configuration", field)
            }
            Self::ExecutorError { .. } => {
                "Check the executor log and rerun the protocol".to_string()
            }
            Self::IoError(_) => "Check file paths and permissions".to_string(),
            Self::SerializationError(_) => {
                "Report output could not be encoded; check the plan report data".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Input => format!("Input table problem: {}", self),
            ErrorCategory::Validation => format!("Plan validation failed: {}", self),
            ErrorCategory::Config => format!("Configuration problem: {}", self),
            ErrorCategory::Execution => format!("Protocol run failed: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, PrepError>;
