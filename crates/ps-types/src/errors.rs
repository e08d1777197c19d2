use thiserror::Error;

/// Main error type for ParamSweep configuration and orchestration.
///
/// Everything here is fatal for a search: it is raised before the first
/// evaluation runs. Per-point problems are [`EvaluationFailure`]s and never
/// surface through this type.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Invalid domain: {0}")]
    InvalidDomain(#[from] DomainError),

    #[error("Empty search space: parameter '{parameter}' contributes no values")]
    EmptySpace { parameter: String },

    #[error("Search space too large: the grid size overflows usize")]
    SpaceTooLarge,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Malformed parameters, points and refinement requests.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Parameter '{parameter}': step must be positive, got {step}")]
    NonPositiveStep { parameter: String, step: f64 },

    #[error("Parameter '{parameter}': lower bound {lower} is above upper bound {upper}")]
    InvertedBounds {
        parameter: String,
        lower: f64,
        upper: f64,
    },

    #[error("Parameter '{parameter}': bounds and step must be finite")]
    NonFiniteBound { parameter: String },

    #[error("Parameter '{parameter}': logarithmic base must be finite and greater than 1, got {base}")]
    InvalidLogBase { parameter: String, base: f64 },

    #[error("Parameter '{parameter}': logarithmic scale needs a positive lower bound, got {lower}")]
    NonPositiveLogBound { parameter: String, lower: f64 },

    #[error("Parameter name must not be empty")]
    EmptyName,

    #[error("Duplicate parameter name: {parameter}")]
    DuplicateName { parameter: String },

    #[error("Parameter '{parameter}': index {index} out of range for {size} values")]
    IndexOutOfRange {
        parameter: String,
        index: usize,
        size: usize,
    },

    #[error("Parameter '{parameter}': range holds more values than can be counted")]
    TooManyValues { parameter: String },

    #[error("Shrink factor must lie in (0, 1], got {factor}")]
    InvalidShrinkFactor { factor: f64 },

    #[error("Point has {actual} values but the space has {expected} parameters")]
    ArityMismatch { expected: usize, actual: usize },

    #[error("Point value for '{parameter}' is not part of its domain: {value}")]
    OutOfDomain { parameter: String, value: String },

    #[error("Point position {position} holds '{actual}' but the space declares '{expected}'")]
    NameMismatch {
        position: usize,
        expected: String,
        actual: String,
    },
}

/// A single point could not be evaluated.
///
/// The driver turns this into a worst-case performance and keeps sweeping.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Evaluation failed: {message}")]
pub struct EvaluationFailure {
    pub message: String,
}

impl EvaluationFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Applying a parameter value to a target configuration failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigureError {
    #[error("Unknown setting: {property}")]
    UnknownSetting { property: String },

    #[error("Setting '{property}' rejected value {value}: {reason}")]
    Rejected {
        property: String,
        value: String,
        reason: String,
    },

    #[error("Target configuration is not an object")]
    NotAnObject,
}

impl From<ConfigureError> for EvaluationFailure {
    fn from(err: ConfigureError) -> Self {
        EvaluationFailure::new(err.to_string())
    }
}

/// Result type alias for ParamSweep operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::errors::SearchError::Config(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = DomainError::InvertedBounds {
            parameter: "gamma".to_string(),
            lower: 10.0,
            upper: 1.0,
        };

        assert!(error.to_string().contains("gamma"));
        assert!(error.to_string().contains("10"));
        assert!(error.to_string().contains("above upper bound 1"));
    }

    #[test]
    fn test_error_conversion() {
        let domain_error = DomainError::EmptyName;
        let search_error: SearchError = domain_error.into();

        match search_error {
            SearchError::InvalidDomain(DomainError::EmptyName) => (),
            other => panic!("Expected InvalidDomain error, got {other:?}"),
        }
    }

    #[test]
    fn test_configure_error_becomes_evaluation_failure() {
        let failure: EvaluationFailure = ConfigureError::UnknownSetting {
            property: "depth".into(),
        }
        .into();
        assert_eq!(failure.message, "Unknown setting: depth");
    }

    #[test]
    fn test_macros() {
        let err = config_error!("parallelism must be at least {}", 1);
        assert!(matches!(err, SearchError::Config(ref m) if m.contains("at least 1")));
    }
}
