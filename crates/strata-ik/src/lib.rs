//! Hierarchical QP inverse kinematics for articulated robots.
//!
//! Given a set of linear kinematic tasks, computes each control cycle the
//! generalized joint-velocity command that best satisfies them under a
//! strict priority ordering: priority-0 (hard) tasks become QP constraints
//! and always dominate priority-1 (soft) tasks, which are traded off
//! against each other inside a weighted least-squares cost.
//!
//! # Architecture
//!
//! ```text
//! LinearTask (caller-owned) ──► TaskRegistry ──► QP assembly ──► Clarabel ──► State
//!                                    ▲
//!                        VariablesHandler (decision-vector layout)
//! ```
//!
//! The solver follows a strict lifecycle: [`initialize`] with
//! [`IkOptions`](strata_core::IkOptions), register tasks with [`add_task`],
//! [`finalize`] against a [`VariablesHandler`](strata_core::VariablesHandler),
//! then call [`advance`] once per control cycle and read the
//! [`State`] output.
//!
//! [`initialize`]: TaskSolver::initialize
//! [`add_task`]: TaskSolver::add_task
//! [`finalize`]: TaskSolver::finalize
//! [`advance`]: TaskSolver::advance

pub mod error;
pub mod registry;
pub mod solver;
pub mod state;
pub mod tasks;

pub use error::{AssemblyError, IkError};
pub use registry::{Priority, TaskRegistry};
pub use solver::{QpInverseKinematics, TaskSolver};
pub use state::State;
pub use tasks::{JointTrackingTask, JointVelocityLimitTask, LinearMapTask};
