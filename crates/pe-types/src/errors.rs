use thiserror::Error;

/// Main error type for the premium erosion engine
#[derive(Error, Debug)]
pub enum PeError {
    #[error("Invalid input for {field}: {message}")]
    InvalidInput { field: String, message: String },

    #[error("Position not found: {id}")]
    NotFound { id: u64 },

    #[error("Domain precondition violated: {message}")]
    DomainPrecondition { message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PeError {
    pub fn invalid_input(field: &str, message: impl Into<String>) -> Self {
        PeError::InvalidInput {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// True for errors caused by a single rejected field value.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, PeError::InvalidInput { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PeError::NotFound { .. })
    }
}

/// Result type alias for engine operations
pub type PeResult<T> = Result<T, PeError>;

/// Macro for creating invalid-input errors
#[macro_export]
macro_rules! invalid_input {
    ($field:expr, $($arg:tt)*) => {
        $crate::PeError::InvalidInput {
            field: $field.to_string(),
            message: format!($($arg)*),
        }
    };
}

/// Macro for creating domain-precondition errors
#[macro_export]
macro_rules! precondition {
    ($($arg:tt)*) => {
        $crate::PeError::DomainPrecondition {
            message: format!($($arg)*),
        }
    };
}

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::PeError::Config(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = PeError::invalid_input("strike", "must be positive, got -5");
        assert!(error.to_string().contains("strike"));
        assert!(error.to_string().contains("-5"));

        let error = PeError::NotFound { id: 42 };
        assert_eq!(error.to_string(), "Position not found: 42");
    }

    #[test]
    fn test_error_classification() {
        assert!(PeError::invalid_input("days", "out of range").is_invalid_input());
        assert!(PeError::NotFound { id: 1 }.is_not_found());
        assert!(!PeError::Config("bad".into()).is_invalid_input());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: PeError = io.into();
        match err {
            PeError::Io(_) => (),
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_macros() {
        let err = invalid_input!("premium", "negative value {}", -1);
        assert!(err.is_invalid_input());
        assert!(err.to_string().contains("negative value -1"));

        let err = precondition!("sigma must be > 0, got {}", 0.0);
        assert!(matches!(err, PeError::DomainPrecondition { .. }));

        let err = config_error!("missing field: {}", "spot");
        assert!(matches!(err, PeError::Config(_)));
    }
}
