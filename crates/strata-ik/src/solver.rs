//! Priority-stratified QP inverse kinematics at the velocity level.
//!
//! Uses Clarabel (pure Rust interior-point solver) to compute, once per
//! control cycle, the generalized robot velocity that best satisfies the
//! registered tasks under a strict priority ordering.
//!
//! # QP Formulation
//!
//! Decision variable: the full decision vector laid out by the
//! [`VariablesHandler`], containing the generalized robot velocity ν.
//!
//! Cost: sum over soft (priority-1) tasks j of
//! `(A_j x - b_j)^T diag(w_j) (A_j x - b_j)`, accumulated in normal-equation
//! form `P += A^T W A`, `q -= A^T W b` so memory stays proportional to the
//! variable count rather than the stacked task dimension.
//!
//! Subject to, for hard (priority-0) tasks in insertion order:
//! - Equality tasks: `A x = b` (zero cone)
//! - Inequality tasks: `lb <= A x <= ub`, emitted as `A x <= ub` and
//!   `-A x <= -lb` rows (nonnegative cone); infinite bounds emit no row.

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Instant;

use clarabel::algebra::CscMatrix;
use clarabel::solver::{
    DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus,
    SupportedConeT::{self, NonnegativeConeT, ZeroConeT},
};
use nalgebra::{DMatrix, DVector};
use tracing::{debug, warn};

use strata_core::{
    IkOptions, LinearTask, TaskBounds, TaskOutput, TaskType, VariableSpan, VariablesHandler,
    WeightProvider, WeightSource,
};

use crate::error::{AssemblyError, IkError};
use crate::registry::{Priority, TaskRegistry};
use crate::state::State;

/// Public contract shared by hierarchical task-based solvers.
///
/// Any solver variant built on the hard/soft task split (velocity-level IK,
/// torque-level control, ...) exposes this same surface, so controllers can
/// be written against the trait.
pub trait TaskSolver: fmt::Display {
    /// Register solver options. Must be called before [`finalize`](Self::finalize).
    fn initialize(&mut self, options: &IkOptions) -> Result<(), IkError>;

    /// Register a task under a unique name with priority 0 (hard) or 1
    /// (soft). Soft tasks require a weight source. Legal only before
    /// finalize.
    fn add_task(
        &mut self,
        task: Arc<dyn LinearTask>,
        name: &str,
        priority: usize,
        weight: Option<WeightSource>,
    ) -> Result<(), IkError>;

    /// Replace the weight source of an existing soft task.
    fn set_task_weight(&mut self, name: &str, weight: WeightSource) -> Result<(), IkError>;

    /// Non-owning handle to a task's weight provider, `None` if the task is
    /// unknown or weighted by a constant.
    fn task_weight_provider(&self, name: &str) -> Option<Weak<dyn WeightProvider>>;

    /// Non-owning handle to a registered task.
    fn task(&self, name: &str) -> Option<Weak<dyn LinearTask>>;

    /// Registered task names, insertion order.
    fn task_names(&self) -> Vec<String>;

    /// Lock the topology against the decision-vector layout and pre-size
    /// the QP buffers. Legal exactly once, after initialize.
    fn finalize(&mut self, handler: &VariablesHandler) -> Result<(), IkError>;

    /// Assemble and solve the QP for the current cycle.
    fn advance(&mut self) -> Result<(), IkError>;

    /// Last computed output with its validity flag.
    fn output(&self) -> &State;

    /// Whether [`output`](Self::output) holds the result of a successful
    /// solve not followed by a failed one. Pure read, never re-solves.
    fn is_output_valid(&self) -> bool;

    /// Full decision vector of the last successful solve.
    fn raw_solution(&self) -> Result<&DVector<f64>, IkError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Constructed,
    Initialized,
    Finalized,
}

/// Frozen at finalize time.
#[derive(Debug, Clone, Copy)]
struct Layout {
    velocity_span: VariableSpan,
    num_variables: usize,
}

/// Assembled QP, ready for conversion to the solver's sparse format.
struct QpProblem {
    p: DMatrix<f64>,
    q: DVector<f64>,
    a: DMatrix<f64>,
    b: DVector<f64>,
    n_eq: usize,
    n_ineq: usize,
}

/// Velocity-level inverse kinematics as a hierarchical QP.
///
/// Lifecycle: construct, [`initialize`](TaskSolver::initialize) with
/// options, [`add_task`](TaskSolver::add_task) repeatedly,
/// [`finalize`](TaskSolver::finalize) against the variables handler, then
/// one [`advance`](TaskSolver::advance) per control cycle.
pub struct QpInverseKinematics {
    phase: Phase,
    options: Option<IkOptions>,
    registry: TaskRegistry,
    layout: Option<Layout>,
    raw: DVector<f64>,
    state: State,
}

impl Default for QpInverseKinematics {
    fn default() -> Self {
        Self::new()
    }
}

impl QpInverseKinematics {
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: Phase::Constructed,
            options: None,
            registry: TaskRegistry::new(),
            layout: None,
            raw: DVector::zeros(0),
            state: State::default(),
        }
    }

    fn verbosity(&self) -> bool {
        self.options.as_ref().is_some_and(|o| o.verbosity)
    }

    /// Evaluate a task and cross-check its shape against declared sizes.
    fn checked_evaluate(
        task: &dyn LinearTask,
        name: &str,
        num_variables: usize,
    ) -> Result<TaskOutput, IkError> {
        let out = task
            .evaluate()
            .map_err(|source| AssemblyError::TaskEvaluation {
                name: name.to_string(),
                source,
            })?;
        if out.size() != task.size() {
            return Err(AssemblyError::ResidualDimMismatch {
                name: name.to_string(),
                expected: task.size(),
                got: out.size(),
            }
            .into());
        }
        if out.jacobian().ncols() != num_variables {
            return Err(AssemblyError::JacobianWidthMismatch {
                name: name.to_string(),
                expected: num_variables,
                got: out.jacobian().ncols(),
            }
            .into());
        }
        Ok(out)
    }

    /// Fold every registered task into the QP blocks for this cycle.
    fn assemble(&self, num_variables: usize) -> Result<QpProblem, IkError> {
        let n = num_variables;

        // Hard tasks first: evaluate in insertion order and count rows.
        let mut hard = Vec::new();
        for entry in self.registry.entries() {
            if entry.priority != Priority::Hard {
                continue;
            }
            let out = Self::checked_evaluate(entry.task.as_ref(), &entry.name, n)?;
            hard.push(out);
        }

        let mut n_eq = 0;
        let mut n_ineq = 0;
        for out in &hard {
            match out.bounds() {
                TaskBounds::Equality(b) => n_eq += b.len(),
                TaskBounds::TwoSided { lower, upper } => {
                    for i in 0..lower.len() {
                        if upper[i].is_finite() {
                            n_ineq += 1;
                        }
                        if lower[i].is_finite() {
                            n_ineq += 1;
                        }
                    }
                }
            }
        }

        let mut a = DMatrix::zeros(n_eq + n_ineq, n);
        let mut b = DVector::zeros(n_eq + n_ineq);
        let mut eq_row = 0;
        let mut ineq_row = n_eq;

        for out in &hard {
            let jac = out.jacobian();
            match out.bounds() {
                TaskBounds::Equality(rhs) => {
                    for i in 0..rhs.len() {
                        for c in 0..n {
                            a[(eq_row, c)] = jac[(i, c)];
                        }
                        b[eq_row] = rhs[i];
                        eq_row += 1;
                    }
                }
                TaskBounds::TwoSided { lower, upper } => {
                    for i in 0..lower.len() {
                        if upper[i].is_finite() {
                            for c in 0..n {
                                a[(ineq_row, c)] = jac[(i, c)];
                            }
                            b[ineq_row] = upper[i];
                            ineq_row += 1;
                        }
                        if lower[i].is_finite() {
                            for c in 0..n {
                                a[(ineq_row, c)] = -jac[(i, c)];
                            }
                            b[ineq_row] = -lower[i];
                            ineq_row += 1;
                        }
                    }
                }
            }
        }

        // Soft tasks: weighted least-squares accumulation.
        let mut p = DMatrix::zeros(n, n);
        let mut q = DVector::zeros(n);

        for entry in self.registry.entries() {
            if entry.priority != Priority::Soft {
                continue;
            }
            let out = Self::checked_evaluate(entry.task.as_ref(), &entry.name, n)?;
            let TaskBounds::Equality(rhs) = out.bounds() else {
                return Err(IkError::PriorityTypeMismatch(entry.name.clone()));
            };

            // registry invariant: soft entries carry a weight source
            let Some(source) = &entry.weight else {
                return Err(IkError::MissingWeightSource(entry.name.clone()));
            };
            let w = source
                .sample()
                .ok_or_else(|| IkError::WeightProviderDropped(entry.name.clone()))?;
            if w.len() != out.size() {
                return Err(AssemblyError::WeightDimMismatch {
                    name: entry.name.clone(),
                    expected: out.size(),
                    got: w.len(),
                }
                .into());
            }
            for (i, &wi) in w.iter().enumerate() {
                if !wi.is_finite() {
                    return Err(AssemblyError::NonFiniteWeight {
                        name: entry.name.clone(),
                        index: i,
                    }
                    .into());
                }
                if wi < 0.0 {
                    return Err(AssemblyError::NegativeWeight {
                        name: entry.name.clone(),
                        index: i,
                        value: wi,
                    }
                    .into());
                }
            }

            let diag = DMatrix::from_diagonal(&w);
            let at = out.jacobian().transpose();
            p += &at * &diag * out.jacobian();
            q -= &at * &diag * rhs;
        }

        Ok(QpProblem {
            p,
            q,
            a,
            b,
            n_eq,
            n_ineq,
        })
    }

    /// One full assemble + solve pass. Leaves `self` untouched; the caller
    /// publishes the returned decision vector.
    fn solve_cycle(&self) -> Result<DVector<f64>, IkError> {
        let layout = self.layout.ok_or(IkError::NotReady)?;
        let options = self.options.as_ref().ok_or(IkError::NotInitialized)?;

        let start = Instant::now();
        let qp = self.assemble(layout.num_variables)?;

        let p_csc = dmatrix_to_csc_upper_tri(&qp.p);
        let a_csc = dmatrix_to_csc(&qp.a);
        let q_slice: Vec<f64> = qp.q.iter().copied().collect();
        let b_slice: Vec<f64> = qp.b.iter().copied().collect();

        let mut cones: Vec<SupportedConeT<f64>> = Vec::with_capacity(2);
        if qp.n_eq > 0 {
            cones.push(ZeroConeT(qp.n_eq));
        }
        if qp.n_ineq > 0 {
            cones.push(NonnegativeConeT(qp.n_ineq));
        }

        let settings = DefaultSettingsBuilder::default()
            .max_iter(options.max_solver_iterations)
            .verbose(false)
            .tol_gap_abs(1e-8)
            .tol_gap_rel(1e-8)
            .tol_feas(1e-8)
            .build()
            .map_err(|e| IkError::SolverFailure(e.to_string()))?;

        let mut solver = DefaultSolver::new(&p_csc, &q_slice, &a_csc, &b_slice, &cones, settings)
            .map_err(|e| IkError::SolverFailure(e.to_string()))?;
        solver.solve();

        let status = solver.solution.status;
        if !matches!(status, SolverStatus::Solved | SolverStatus::AlmostSolved) {
            if self.verbosity() {
                warn!(?status, "qp solve failed");
            }
            return Err(IkError::SolverFailure(format!("{status:?}")));
        }

        if self.verbosity() {
            debug!(
                n = layout.num_variables,
                n_eq = qp.n_eq,
                n_ineq = qp.n_ineq,
                solve_time_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX),
                "qp solved"
            );
        }

        Ok(DVector::from_column_slice(&solver.solution.x))
    }
}

impl TaskSolver for QpInverseKinematics {
    fn initialize(&mut self, options: &IkOptions) -> Result<(), IkError> {
        if self.phase == Phase::Finalized {
            return Err(IkError::AlreadyFinalized);
        }
        options.validate()?;
        self.options = Some(options.clone());
        self.phase = Phase::Initialized;
        Ok(())
    }

    fn add_task(
        &mut self,
        task: Arc<dyn LinearTask>,
        name: &str,
        priority: usize,
        weight: Option<WeightSource>,
    ) -> Result<(), IkError> {
        match self.phase {
            Phase::Constructed => Err(IkError::NotInitialized),
            Phase::Finalized => Err(IkError::AlreadyFinalized),
            Phase::Initialized => self.registry.add(task, name, priority, weight),
        }
    }

    fn set_task_weight(&mut self, name: &str, weight: WeightSource) -> Result<(), IkError> {
        self.registry.set_weight(name, weight)
    }

    fn task_weight_provider(&self, name: &str) -> Option<Weak<dyn WeightProvider>> {
        self.registry.weight_provider(name)
    }

    fn task(&self, name: &str) -> Option<Weak<dyn LinearTask>> {
        self.registry.task(name)
    }

    fn task_names(&self) -> Vec<String> {
        self.registry.names()
    }

    fn finalize(&mut self, handler: &VariablesHandler) -> Result<(), IkError> {
        match self.phase {
            Phase::Constructed => return Err(IkError::NotInitialized),
            Phase::Finalized => return Err(IkError::AlreadyFinalized),
            Phase::Initialized => {}
        }
        // initialize() guarantees options are present in Initialized phase
        let Some(options) = &self.options else {
            return Err(IkError::NotInitialized);
        };

        let name = &options.robot_velocity_variable_name;
        let velocity_span = handler
            .variable(name)
            .ok_or_else(|| IkError::MissingRequiredVariable(name.clone()))?;

        self.layout = Some(Layout {
            velocity_span,
            num_variables: handler.total_size(),
        });
        self.raw = DVector::zeros(handler.total_size());
        self.state.reset(velocity_span.size);
        self.phase = Phase::Finalized;

        if self.verbosity() {
            debug!(
                variable = name.as_str(),
                offset = velocity_span.offset,
                size = velocity_span.size,
                num_variables = handler.total_size(),
                tasks = self.registry.len(),
                "ik finalized"
            );
        }
        Ok(())
    }

    fn advance(&mut self) -> Result<(), IkError> {
        match self.solve_cycle() {
            Ok(x) => {
                // layout is Some whenever solve_cycle succeeds
                if let Some(layout) = self.layout {
                    let span = layout.velocity_span;
                    self.state.publish(x.rows(span.offset, span.size).into_owned());
                    self.raw = x;
                }
                Ok(())
            }
            Err(e) => {
                self.state.invalidate();
                Err(e)
            }
        }
    }

    fn output(&self) -> &State {
        &self.state
    }

    fn is_output_valid(&self) -> bool {
        self.state.is_valid()
    }

    fn raw_solution(&self) -> Result<&DVector<f64>, IkError> {
        if self.phase != Phase::Finalized {
            return Err(IkError::NotReady);
        }
        Ok(&self.raw)
    }
}

impl fmt::Display for QpInverseKinematics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "QP inverse kinematics ({} tasks)", self.registry.len())?;
        for entry in self.registry.entries() {
            let kind = match entry.task.task_type() {
                TaskType::Equality => "equality",
                TaskType::Inequality => "inequality",
            };
            let priority = match entry.priority {
                Priority::Hard => 0,
                Priority::Soft => 1,
            };
            write!(
                f,
                "- {}: priority {}, {}, dim {}",
                entry.name,
                priority,
                kind,
                entry.task.size()
            )?;
            match &entry.weight {
                Some(WeightSource::Constant(_)) => writeln!(f, ", constant weight")?,
                Some(WeightSource::Provider(_)) => writeln!(f, ", weight provider")?,
                None => writeln!(f)?,
            }
        }
        match (&self.options, self.layout) {
            (Some(options), Some(layout)) => writeln!(
                f,
                "velocity variable: {} (offset {}, size {})",
                options.robot_velocity_variable_name,
                layout.velocity_span.offset,
                layout.velocity_span.size
            ),
            (Some(options), None) => writeln!(
                f,
                "velocity variable: {} (not finalized)",
                options.robot_velocity_variable_name
            ),
            _ => writeln!(f, "not initialized"),
        }
    }
}

/// Convert a nalgebra `DMatrix<f64>` to a Clarabel `CscMatrix<f64>` (full matrix).
fn dmatrix_to_csc(m: &DMatrix<f64>) -> CscMatrix<f64> {
    let (nrows, ncols) = m.shape();
    let mut colptr = vec![0usize; ncols + 1];
    let mut rowval = Vec::new();
    let mut nzval = Vec::new();

    for j in 0..ncols {
        for i in 0..nrows {
            let v = m[(i, j)];
            if v != 0.0 {
                rowval.push(i);
                nzval.push(v);
            }
        }
        colptr[j + 1] = rowval.len();
    }

    CscMatrix::new(nrows, ncols, colptr, rowval, nzval)
}

/// Convert a symmetric nalgebra `DMatrix<f64>` to upper-triangular `CscMatrix<f64>`.
fn dmatrix_to_csc_upper_tri(m: &DMatrix<f64>) -> CscMatrix<f64> {
    let (nrows, ncols) = m.shape();
    let mut colptr = vec![0usize; ncols + 1];
    let mut rowval = Vec::new();
    let mut nzval = Vec::new();

    for j in 0..ncols {
        for i in 0..=j.min(nrows.saturating_sub(1)) {
            let v = m[(i, j)];
            if v != 0.0 {
                rowval.push(i);
                nzval.push(v);
            }
        }
        colptr[j + 1] = rowval.len();
    }

    CscMatrix::new(nrows, ncols, colptr, rowval, nzval)
}
