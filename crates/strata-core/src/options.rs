use serde::{Deserialize, Serialize};

use crate::error::OptionsError;

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_max_solver_iterations() -> u32 {
    500
}

// ---------------------------------------------------------------------------
// IkOptions
// ---------------------------------------------------------------------------

/// Options accepted by the inverse-kinematics solver's initialize step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IkOptions {
    /// Name of the variable in the `VariablesHandler` describing the
    /// generalized robot velocity (base spatial velocity + joint
    /// velocities). Mandatory.
    pub robot_velocity_variable_name: String,

    /// Emit per-cycle diagnostics (default: false).
    #[serde(default)]
    pub verbosity: bool,

    /// Iteration cap handed to the QP solver (default: 500). Bounds
    /// worst-case latency of one advance cycle.
    #[serde(default = "default_max_solver_iterations")]
    pub max_solver_iterations: u32,
}

impl IkOptions {
    /// Options with defaults for everything but the velocity variable name.
    pub fn new(robot_velocity_variable_name: impl Into<String>) -> Self {
        Self {
            robot_velocity_variable_name: robot_velocity_variable_name.into(),
            verbosity: false,
            max_solver_iterations: default_max_solver_iterations(),
        }
    }

    /// Parse options from a TOML document and validate them.
    pub fn from_toml(text: &str) -> Result<Self, OptionsError> {
        let options: Self = toml::from_str(text)?;
        options.validate()?;
        Ok(options)
    }

    /// Validate option values. Returns Err on invalid values.
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.robot_velocity_variable_name.is_empty() {
            return Err(OptionsError::EmptyVariableName);
        }
        if self.max_solver_iterations == 0 {
            return Err(OptionsError::InvalidValue {
                field: "max_solver_iterations",
                message: "must be > 0",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = IkOptions::new("robot_velocity");
        assert_eq!(options.robot_velocity_variable_name, "robot_velocity");
        assert!(!options.verbosity);
        assert_eq!(options.max_solver_iterations, 500);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn from_toml_minimal() {
        let options =
            IkOptions::from_toml(r#"robot_velocity_variable_name = "robot_velocity""#).unwrap();
        assert_eq!(options, IkOptions::new("robot_velocity"));
    }

    #[test]
    fn from_toml_full() {
        let options = IkOptions::from_toml(
            r#"
            robot_velocity_variable_name = "generalized_velocity"
            verbosity = true
            max_solver_iterations = 200
            "#,
        )
        .unwrap();
        assert_eq!(
            options.robot_velocity_variable_name,
            "generalized_velocity"
        );
        assert!(options.verbosity);
        assert_eq!(options.max_solver_iterations, 200);
    }

    #[test]
    fn missing_variable_name_fails() {
        assert!(IkOptions::from_toml("verbosity = true").is_err());
    }

    #[test]
    fn empty_variable_name_fails_validation() {
        let err = IkOptions::new("").validate().unwrap_err();
        assert!(matches!(err, OptionsError::EmptyVariableName));
    }

    #[test]
    fn zero_iterations_fails_validation() {
        let mut options = IkOptions::new("robot_velocity");
        options.max_solver_iterations = 0;
        assert!(matches!(
            options.validate().unwrap_err(),
            OptionsError::InvalidValue { .. }
        ));
    }

    #[test]
    fn toml_round_trip() {
        let options = IkOptions {
            robot_velocity_variable_name: "robot_velocity".into(),
            verbosity: true,
            max_solver_iterations: 128,
        };
        let text = toml::to_string(&options).unwrap();
        let parsed = IkOptions::from_toml(&text).unwrap();
        assert_eq!(parsed, options);
    }
}
