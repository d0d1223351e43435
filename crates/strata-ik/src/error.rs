use strata_core::{OptionsError, TaskError};
use thiserror::Error;

/// Errors reported by the inverse-kinematics solver.
///
/// Every public operation returns `Result<_, IkError>`; failures are local,
/// recoverable conditions the control loop inspects and acts upon (skip the
/// cycle, relax a task, log and continue). Nothing panics across the public
/// contract.
#[derive(Debug, Error)]
pub enum IkError {
    #[error("Task name already registered: {0}")]
    DuplicateTaskName(String),

    #[error("Task name must not be empty")]
    EmptyTaskName,

    #[error("Invalid priority {priority} for task {name}: only 0 (hard) and 1 (soft) are supported")]
    InvalidPriority { name: String, priority: usize },

    #[error("Inequality task {0} cannot have priority 1: inequality semantics cannot be embedded in the cost")]
    PriorityTypeMismatch(String),

    #[error("Soft task {0} requires a weight source")]
    MissingWeightSource(String),

    #[error("Weights do not apply to hard task {0}")]
    HardTaskWeight(String),

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Variables handler does not contain the required variable {0}")]
    MissingRequiredVariable(String),

    #[error("Solver has not been initialized")]
    NotInitialized,

    #[error("Solver has not been finalized")]
    NotReady,

    #[error("Solver has already been finalized")]
    AlreadyFinalized,

    #[error("Weight provider for task {0} has been dropped")]
    WeightProviderDropped(String),

    #[error("QP assembly failed: {0}")]
    Assembly(#[from] AssemblyError),

    #[error("QP solver failed: {0}")]
    SolverFailure(String),

    #[error("Invalid options: {0}")]
    Options(#[from] OptionsError),
}

/// Conditions that make the assembled QP ill-posed.
///
/// Negative or non-finite weights would make the cost non-convex or
/// undefined; rejecting them explicitly beats handing the QP solver a
/// problem it will mangle silently.
#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("Task {name} failed to evaluate: {source}")]
    TaskEvaluation {
        name: String,
        #[source]
        source: TaskError,
    },

    #[error("Task {name}: weight entry {index} is negative ({value})")]
    NegativeWeight {
        name: String,
        index: usize,
        value: f64,
    },

    #[error("Task {name}: weight entry {index} is not finite")]
    NonFiniteWeight { name: String, index: usize },

    #[error("Task {name}: weight has {got} entries, residual dimension is {expected}")]
    WeightDimMismatch {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("Task {name}: evaluated {got} rows, declared size is {expected}")]
    ResidualDimMismatch {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("Task {name}: Jacobian has {got} columns, decision vector has {expected}")]
    JacobianWidthMismatch {
        name: String,
        expected: usize,
        got: usize,
    },
}
