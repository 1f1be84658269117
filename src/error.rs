use thiserror::Error;

/// A single client-side validation failure. These block a write before it
/// reaches the backend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("unknown pillar '{0}'")]
    UnknownPillar(String),
    #[error("unknown priority '{0}'")]
    UnknownPriority(String),
    #[error("unknown action status '{0}'")]
    UnknownStatus(String),
    #[error("{field} is required")]
    Required { field: String },
    #[error("{field} must be at least {min} characters (got {actual})")]
    TooShort {
        field: String,
        min: usize,
        actual: usize,
    },
    #[error("{field}: '{value}' is not one of the allowed options")]
    InvalidChoice { field: String, value: String },
    #[error("{field}: {value} is outside {min}..={max}")]
    OutOfRange {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("{field}: minimum {min} must be below maximum {max}")]
    InvalidBounds { field: String, min: i32, max: i32 },
    #[error("{field}: expected a {expected} answer")]
    WrongAnswerType {
        field: String,
        expected: &'static str,
    },
}

/// Every violation found in one submission.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}", join_messages(.0))]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self(vec![error])
    }
}

fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{operation}: {source}")]
    Backend {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },
    #[error("malformed JSON in column {column}: {source}")]
    Decode {
        column: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("stored value rejected: {0}")]
    StoredValue(#[from] ValidationError),
    #[error("validation failed: {0}")]
    Invalid(#[from] ValidationErrors),
    #[error("{0} not found")]
    NotFound(String),
}

impl ServiceError {
    /// Wraps a transport error with the domain label shown to the user.
    pub fn backend(operation: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| Self::Backend { operation, source }
    }

    pub fn decode(column: &'static str) -> impl FnOnce(serde_json::Error) -> Self {
        move |source| Self::Decode { column, source }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_join_in_order() {
        let errors = ValidationErrors(vec![
            ValidationError::Required {
                field: "incidents".to_string(),
            },
            ValidationError::TooShort {
                field: "summary".to_string(),
                min: 10,
                actual: 3,
            },
        ]);
        assert_eq!(
            errors.to_string(),
            "incidents is required; summary must be at least 10 characters (got 3)"
        );
    }

    #[test]
    fn backend_errors_carry_operation_label() {
        let err = ServiceError::backend("failed to save meeting note")(sqlx::Error::RowNotFound);
        assert!(err.to_string().starts_with("failed to save meeting note: "));
    }
}
