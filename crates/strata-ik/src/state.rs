//! Solver output state with last-good semantics.

use nalgebra::{DVector, Vector6};

/// Dimension of a base spatial velocity (linear + angular).
const BASE_DIM: usize = 6;

/// Generalized velocity computed by the last solve, plus a validity flag.
///
/// Created empty and invalid; overwritten on every successful advance. When
/// an advance fails the previous value is kept unchanged and only the flag
/// is downgraded, so a control loop can fall back to the last good command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct State {
    generalized_velocity: DVector<f64>,
    valid: bool,
}

impl State {
    /// Whether the stored velocity comes from a successful solve that has
    /// not been followed by a failed one.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.valid
    }

    /// Full generalized-velocity segment (base spatial velocity followed by
    /// joint velocities for floating-base robots; joint velocities only for
    /// fixed-base setups).
    #[must_use]
    pub const fn generalized_velocity(&self) -> &DVector<f64> {
        &self.generalized_velocity
    }

    /// Base spatial velocity: the first six entries, when present.
    ///
    /// `None` for decision layouts smaller than a spatial velocity.
    #[must_use]
    pub fn base_velocity(&self) -> Option<Vector6<f64>> {
        (self.generalized_velocity.len() >= BASE_DIM)
            .then(|| self.generalized_velocity.fixed_rows::<BASE_DIM>(0).into())
    }

    /// Joint velocities: everything after the base segment, when present.
    #[must_use]
    pub fn joint_velocities(&self) -> Option<DVector<f64>> {
        (self.generalized_velocity.len() >= BASE_DIM).then(|| {
            self.generalized_velocity
                .rows(BASE_DIM, self.generalized_velocity.len() - BASE_DIM)
                .into_owned()
        })
    }

    /// Pre-size the stored vector without marking it valid.
    pub(crate) fn reset(&mut self, dim: usize) {
        self.generalized_velocity = DVector::zeros(dim);
        self.valid = false;
    }

    pub(crate) fn publish(&mut self, generalized_velocity: DVector<f64>) {
        self.generalized_velocity = generalized_velocity;
        self.valid = true;
    }

    pub(crate) fn invalidate(&mut self) {
        self.valid = false;
    }
}
