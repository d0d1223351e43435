//! Ready-made linear tasks that need no external kinematics engine.
//!
//! Tasks built from robot Jacobians (frame pose tracking and friends) live
//! with the dynamics side; the tasks here operate directly on decision
//! vector segments and cover the common joint-space needs: tracking desired
//! joint velocities, clamping joint velocities, and wrapping an arbitrary
//! user-supplied linear map.

use std::sync::RwLock;

use nalgebra::{DMatrix, DVector};
use strata_core::{
    LinearTask, TaskBounds, TaskError, TaskOutput, TaskType, VariableSpan, VariablesHandler,
};

// ---------------------------------------------------------------------------
// LinearMapTask
// ---------------------------------------------------------------------------

/// Generic task wrapping a caller-supplied `(A, bounds)` pair.
///
/// The Jacobian is fixed; the right-hand side can be replaced between cycles
/// through [`set_bounds`](Self::set_bounds).
#[derive(Debug)]
pub struct LinearMapTask {
    task_type: TaskType,
    jacobian: DMatrix<f64>,
    bounds: RwLock<TaskBounds>,
}

impl LinearMapTask {
    /// Equality task `A x = b`.
    pub fn equality(jacobian: DMatrix<f64>, b: DVector<f64>) -> Result<Self, TaskError> {
        let output = TaskOutput::equality(jacobian, b)?;
        Ok(Self {
            task_type: TaskType::Equality,
            jacobian: output.jacobian().clone(),
            bounds: RwLock::new(output.bounds().clone()),
        })
    }

    /// Inequality task `lb <= A x <= ub`.
    pub fn inequality(
        jacobian: DMatrix<f64>,
        lower: DVector<f64>,
        upper: DVector<f64>,
    ) -> Result<Self, TaskError> {
        let output = TaskOutput::two_sided(jacobian, lower, upper)?;
        Ok(Self {
            task_type: TaskType::Inequality,
            jacobian: output.jacobian().clone(),
            bounds: RwLock::new(output.bounds().clone()),
        })
    }

    /// Replace the right-hand side. The new bounds must keep the task's
    /// type and row count.
    pub fn set_bounds(&self, bounds: TaskBounds) -> Result<(), TaskError> {
        let matches_type = matches!(
            (&bounds, self.task_type),
            (TaskBounds::Equality(_), TaskType::Equality)
                | (TaskBounds::TwoSided { .. }, TaskType::Inequality)
        );
        if !matches_type {
            return Err(TaskError::BoundsKindMismatch);
        }
        if bounds.len() != self.jacobian.nrows() {
            return Err(TaskError::RowMismatch {
                rows: self.jacobian.nrows(),
                bounds: bounds.len(),
            });
        }
        let mut guard = self.bounds.write().map_err(|_| TaskError::Poisoned)?;
        *guard = bounds;
        Ok(())
    }
}

impl LinearTask for LinearMapTask {
    fn task_type(&self) -> TaskType {
        self.task_type
    }

    fn size(&self) -> usize {
        self.jacobian.nrows()
    }

    fn evaluate(&self) -> Result<TaskOutput, TaskError> {
        let bounds = self.bounds.read().map_err(|_| TaskError::Poisoned)?;
        match &*bounds {
            TaskBounds::Equality(b) => TaskOutput::equality(self.jacobian.clone(), b.clone()),
            TaskBounds::TwoSided { lower, upper } => {
                TaskOutput::two_sided(self.jacobian.clone(), lower.clone(), upper.clone())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// JointTrackingTask
// ---------------------------------------------------------------------------

/// Equality task tracking desired velocities over one decision variable.
///
/// `A` selects the variable's rows out of the decision vector; `b` is the
/// setpoint, updated by the caller between cycles. Usable hard (pin the
/// velocity exactly) or soft (postural regularization).
#[derive(Debug)]
pub struct JointTrackingTask {
    span: VariableSpan,
    decision_dim: usize,
    setpoint: RwLock<DVector<f64>>,
}

impl JointTrackingTask {
    /// Track the variable `name` registered in `handler`. The setpoint
    /// starts at zero.
    pub fn new(handler: &VariablesHandler, name: &str) -> Result<Self, TaskError> {
        let span = handler
            .variable(name)
            .ok_or_else(|| TaskError::UnknownVariable(name.to_string()))?;
        Ok(Self {
            span,
            decision_dim: handler.total_size(),
            setpoint: RwLock::new(DVector::zeros(span.size)),
        })
    }

    /// Desired velocity for the tracked variable, effective next cycle.
    pub fn set_setpoint(&self, desired: DVector<f64>) -> Result<(), TaskError> {
        if desired.len() != self.span.size {
            return Err(TaskError::DimensionMismatch {
                expected: self.span.size,
                got: desired.len(),
            });
        }
        let mut guard = self.setpoint.write().map_err(|_| TaskError::Poisoned)?;
        *guard = desired;
        Ok(())
    }

    fn selection_jacobian(&self) -> DMatrix<f64> {
        let mut a = DMatrix::zeros(self.span.size, self.decision_dim);
        for i in 0..self.span.size {
            a[(i, self.span.offset + i)] = 1.0;
        }
        a
    }
}

impl LinearTask for JointTrackingTask {
    fn task_type(&self) -> TaskType {
        TaskType::Equality
    }

    fn size(&self) -> usize {
        self.span.size
    }

    fn evaluate(&self) -> Result<TaskOutput, TaskError> {
        let setpoint = self.setpoint.read().map_err(|_| TaskError::Poisoned)?;
        TaskOutput::equality(self.selection_jacobian(), setpoint.clone())
    }
}

// ---------------------------------------------------------------------------
// JointVelocityLimitTask
// ---------------------------------------------------------------------------

/// Inequality task clamping one decision variable between fixed bounds.
#[derive(Debug)]
pub struct JointVelocityLimitTask {
    output: TaskOutput,
}

impl JointVelocityLimitTask {
    /// Clamp the variable `name` to `lower <= v <= upper`, elementwise.
    pub fn new(
        handler: &VariablesHandler,
        name: &str,
        lower: DVector<f64>,
        upper: DVector<f64>,
    ) -> Result<Self, TaskError> {
        let span = handler
            .variable(name)
            .ok_or_else(|| TaskError::UnknownVariable(name.to_string()))?;
        if lower.len() != span.size {
            return Err(TaskError::DimensionMismatch {
                expected: span.size,
                got: lower.len(),
            });
        }

        let mut a = DMatrix::zeros(span.size, handler.total_size());
        for i in 0..span.size {
            a[(i, span.offset + i)] = 1.0;
        }
        let output = TaskOutput::two_sided(a, lower, upper)?;
        Ok(Self { output })
    }
}

impl LinearTask for JointVelocityLimitTask {
    fn task_type(&self) -> TaskType {
        TaskType::Inequality
    }

    fn size(&self) -> usize {
        self.output.size()
    }

    fn evaluate(&self) -> Result<TaskOutput, TaskError> {
        Ok(self.output.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler() -> VariablesHandler {
        let mut handler = VariablesHandler::new();
        handler.add_variable("contact_wrench", 2).unwrap();
        handler.add_variable("robot_velocity", 3).unwrap();
        handler
    }

    #[test]
    fn tracking_task_selects_variable_rows() {
        let handler = handler();
        let task = JointTrackingTask::new(&handler, "robot_velocity").unwrap();
        task.set_setpoint(DVector::from_column_slice(&[1.0, 2.0, 3.0]))
            .unwrap();

        assert_eq!(task.task_type(), TaskType::Equality);
        assert_eq!(task.size(), 3);

        let out = task.evaluate().unwrap();
        assert_eq!(out.jacobian().nrows(), 3);
        assert_eq!(out.jacobian().ncols(), 5);
        // identity block sits at the variable offset
        assert_eq!(out.jacobian()[(0, 2)], 1.0);
        assert_eq!(out.jacobian()[(2, 4)], 1.0);
        assert_eq!(out.jacobian()[(0, 0)], 0.0);
        match out.bounds() {
            TaskBounds::Equality(b) => {
                assert_eq!(b, &DVector::from_column_slice(&[1.0, 2.0, 3.0]));
            }
            TaskBounds::TwoSided { .. } => panic!("expected equality bounds"),
        }
    }

    #[test]
    fn tracking_task_unknown_variable() {
        let err = JointTrackingTask::new(&handler(), "ghost").unwrap_err();
        assert_eq!(err, TaskError::UnknownVariable("ghost".into()));
    }

    #[test]
    fn tracking_task_setpoint_dimension_checked() {
        let task = JointTrackingTask::new(&handler(), "robot_velocity").unwrap();
        let err = task
            .set_setpoint(DVector::from_column_slice(&[1.0]))
            .unwrap_err();
        assert_eq!(err, TaskError::DimensionMismatch { expected: 3, got: 1 });
    }

    #[test]
    fn limit_task_two_sided_bounds() {
        let handler = handler();
        let task = JointVelocityLimitTask::new(
            &handler,
            "robot_velocity",
            DVector::from_element(3, -2.0),
            DVector::from_element(3, 2.0),
        )
        .unwrap();

        assert_eq!(task.task_type(), TaskType::Inequality);
        let out = task.evaluate().unwrap();
        match out.bounds() {
            TaskBounds::TwoSided { lower, upper } => {
                assert_eq!(lower, &DVector::from_element(3, -2.0));
                assert_eq!(upper, &DVector::from_element(3, 2.0));
            }
            TaskBounds::Equality(_) => panic!("expected two-sided bounds"),
        }
    }

    #[test]
    fn limit_task_rejects_crossed_bounds() {
        let err = JointVelocityLimitTask::new(
            &handler(),
            "robot_velocity",
            DVector::from_element(3, 2.0),
            DVector::from_element(3, -2.0),
        )
        .unwrap_err();
        assert!(matches!(err, TaskError::BoundOrder { .. }));
    }

    #[test]
    fn linear_map_task_bounds_update() {
        let task = LinearMapTask::equality(DMatrix::identity(2, 2), DVector::zeros(2)).unwrap();
        task.set_bounds(TaskBounds::Equality(DVector::from_column_slice(&[1.0, -1.0])))
            .unwrap();

        let out = task.evaluate().unwrap();
        match out.bounds() {
            TaskBounds::Equality(b) => {
                assert_eq!(b, &DVector::from_column_slice(&[1.0, -1.0]));
            }
            TaskBounds::TwoSided { .. } => panic!("expected equality bounds"),
        }
    }

    #[test]
    fn linear_map_task_rejects_kind_change() {
        // same row count on both sides: the kind itself is the problem
        let task = LinearMapTask::equality(DMatrix::identity(2, 2), DVector::zeros(2)).unwrap();
        let err = task
            .set_bounds(TaskBounds::TwoSided {
                lower: DVector::zeros(2),
                upper: DVector::zeros(2),
            })
            .unwrap_err();
        assert_eq!(err, TaskError::BoundsKindMismatch);

        let ineq = LinearMapTask::inequality(
            DMatrix::identity(2, 2),
            DVector::from_element(2, -1.0),
            DVector::from_element(2, 1.0),
        )
        .unwrap();
        let err = ineq
            .set_bounds(TaskBounds::Equality(DVector::zeros(2)))
            .unwrap_err();
        assert_eq!(err, TaskError::BoundsKindMismatch);
    }

    #[test]
    fn linear_map_task_rejects_row_change() {
        let task = LinearMapTask::equality(DMatrix::identity(2, 2), DVector::zeros(2)).unwrap();
        let err = task
            .set_bounds(TaskBounds::Equality(DVector::zeros(3)))
            .unwrap_err();
        assert_eq!(err, TaskError::RowMismatch { rows: 2, bounds: 3 });
    }
}
