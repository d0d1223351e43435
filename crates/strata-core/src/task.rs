//! Linear-task contract consumed by task-based solvers.
//!
//! A task is a linear map over the decision vector `x` producing either an
//! equality residual `A x = b` or a two-sided inequality residual
//! `lb <= A x <= ub`. The solver never owns task state: the dynamics side
//! updates the task between control cycles (new Jacobian, new setpoint) and
//! the solver re-evaluates it once per [`advance`] cycle.
//!
//! [`advance`]: https://docs.rs/strata-ik

use nalgebra::{DMatrix, DVector};

use crate::error::TaskError;

/// Whether a task is enforced as an equality or an inequality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskType {
    /// `A x = b`. Usable as a hard constraint or a soft cost term.
    Equality,
    /// `lb <= A x <= ub`. Only usable as a hard constraint.
    Inequality,
}

/// Right-hand side of an evaluated task.
///
/// One-sided inequalities are expressed with infinite entries on the
/// unbounded side (`f64::NEG_INFINITY` / `f64::INFINITY`); the assembler
/// simply emits no constraint row for an infinite bound.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskBounds {
    Equality(DVector<f64>),
    TwoSided {
        lower: DVector<f64>,
        upper: DVector<f64>,
    },
}

impl TaskBounds {
    /// Number of residual rows described by the bounds.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Equality(b) => b.len(),
            Self::TwoSided { lower, .. } => lower.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Evaluated task: Jacobian plus bounds, shapes validated at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskOutput {
    jacobian: DMatrix<f64>,
    bounds: TaskBounds,
}

impl TaskOutput {
    /// Build an equality output `A x = b`.
    ///
    /// Fails if `A` has a different row count than `b`.
    pub fn equality(jacobian: DMatrix<f64>, b: DVector<f64>) -> Result<Self, TaskError> {
        if jacobian.nrows() != b.len() {
            return Err(TaskError::RowMismatch {
                rows: jacobian.nrows(),
                bounds: b.len(),
            });
        }
        Ok(Self {
            jacobian,
            bounds: TaskBounds::Equality(b),
        })
    }

    /// Build a two-sided inequality output `lb <= A x <= ub`.
    ///
    /// Fails on a row-count mismatch or whenever `lb[i] > ub[i]` (NaN bounds
    /// fail this check as well).
    pub fn two_sided(
        jacobian: DMatrix<f64>,
        lower: DVector<f64>,
        upper: DVector<f64>,
    ) -> Result<Self, TaskError> {
        if lower.len() != upper.len() {
            return Err(TaskError::DimensionMismatch {
                expected: lower.len(),
                got: upper.len(),
            });
        }
        if jacobian.nrows() != lower.len() {
            return Err(TaskError::RowMismatch {
                rows: jacobian.nrows(),
                bounds: lower.len(),
            });
        }
        for i in 0..lower.len() {
            // NaN on either side fails here too
            if !(lower[i] <= upper[i]) {
                return Err(TaskError::BoundOrder {
                    index: i,
                    lower: lower[i],
                    upper: upper[i],
                });
            }
        }
        Ok(Self {
            jacobian,
            bounds: TaskBounds::TwoSided { lower, upper },
        })
    }

    #[must_use]
    pub const fn jacobian(&self) -> &DMatrix<f64> {
        &self.jacobian
    }

    #[must_use]
    pub const fn bounds(&self) -> &TaskBounds {
        &self.bounds
    }

    /// Number of residual rows.
    #[must_use]
    pub fn size(&self) -> usize {
        self.jacobian.nrows()
    }
}

/// A linear constraint or objective term over the decision vector.
///
/// Implementations are shared between the caller (who updates them) and the
/// solver (who evaluates them), so mutable setpoints live behind interior
/// mutability and `evaluate` takes `&self`.
pub trait LinearTask: Send + Sync {
    /// Declared type, fixed for the lifetime of the task.
    fn task_type(&self) -> TaskType;

    /// Declared residual dimension (number of rows of `A`).
    fn size(&self) -> usize;

    /// Produce `(A, bounds)` at the current state.
    fn evaluate(&self) -> Result<TaskOutput, TaskError>;
}
