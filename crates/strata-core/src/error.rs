use thiserror::Error;

/// Top-level error type for strata-core.
#[derive(Debug, Error)]
pub enum StrataError {
    #[error("Variables error: {0}")]
    Variables(#[from] VariablesError),

    #[error("Options error: {0}")]
    Options(#[from] OptionsError),

    #[error("Task error: {0}")]
    Task(#[from] TaskError),
}

/// Decision-vector layout errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VariablesError {
    #[error("Variable already registered: {0}")]
    DuplicateVariable(String),

    #[error("Variable name must not be empty")]
    EmptyVariableName,

    #[error("Variable {0} has zero size")]
    ZeroSizeVariable(String),
}

/// Solver option errors.
#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("robot_velocity_variable_name must not be empty")]
    EmptyVariableName,

    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: &'static str,
    },
}

/// Errors produced while evaluating a linear task.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TaskError {
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Jacobian rows ({rows}) do not match bound length ({bounds})")]
    RowMismatch { rows: usize, bounds: usize },

    #[error("Bounds kind does not match the task type (equality vs two-sided)")]
    BoundsKindMismatch,

    #[error("Variable not found in handler: {0}")]
    UnknownVariable(String),

    #[error("Lower bound exceeds upper bound at row {index}: {lower} > {upper}")]
    BoundOrder {
        index: usize,
        lower: f64,
        upper: f64,
    },

    #[error("Task internal state lock poisoned")]
    Poisoned,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strata_error_from_variables_error() {
        let err = VariablesError::DuplicateVariable("robot_velocity".into());
        let top: StrataError = err.into();
        assert!(matches!(top, StrataError::Variables(_)));
        assert!(top.to_string().contains("robot_velocity"));
    }

    #[test]
    fn strata_error_from_task_error() {
        let err = TaskError::DimensionMismatch {
            expected: 6,
            got: 3,
        };
        let top: StrataError = err.into();
        assert!(matches!(top, StrataError::Task(_)));
    }

    #[test]
    fn variables_error_display_messages() {
        assert_eq!(
            VariablesError::DuplicateVariable("q".into()).to_string(),
            "Variable already registered: q"
        );
        assert_eq!(
            VariablesError::EmptyVariableName.to_string(),
            "Variable name must not be empty"
        );
        assert_eq!(
            VariablesError::ZeroSizeVariable("q".into()).to_string(),
            "Variable q has zero size"
        );
    }

    #[test]
    fn task_error_display_messages() {
        assert_eq!(
            TaskError::DimensionMismatch {
                expected: 6,
                got: 3
            }
            .to_string(),
            "Dimension mismatch: expected 6, got 3"
        );
        assert_eq!(
            TaskError::BoundOrder {
                index: 2,
                lower: 1.0,
                upper: -1.0
            }
            .to_string(),
            "Lower bound exceeds upper bound at row 2: 1 > -1"
        );
        assert_eq!(
            TaskError::UnknownVariable("base".into()).to_string(),
            "Variable not found in handler: base"
        );
        assert_eq!(
            TaskError::BoundsKindMismatch.to_string(),
            "Bounds kind does not match the task type (equality vs two-sided)"
        );
    }

    #[test]
    fn options_error_display_messages() {
        assert_eq!(
            OptionsError::EmptyVariableName.to_string(),
            "robot_velocity_variable_name must not be empty"
        );
        assert_eq!(
            OptionsError::InvalidValue {
                field: "max_solver_iterations",
                message: "must be > 0"
            }
            .to_string(),
            "Invalid value for max_solver_iterations: must be > 0"
        );
    }
}
