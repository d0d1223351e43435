//! Per-cycle weight sources for soft tasks.
//!
//! A soft (cost-minimized) task is scaled by a nonnegative weight vector of
//! its residual dimension. The weight is either a constant or comes from a
//! live [`WeightProvider`] sampled fresh every solve cycle, so a moving
//! weight changes a task's influence smoothly without touching the others.

use std::sync::{Arc, RwLock, Weak};

use nalgebra::DVector;

/// Live source of per-cycle weights.
pub trait WeightProvider: Send + Sync {
    /// Current weight vector. Sampled once per solve cycle.
    fn weight(&self) -> DVector<f64>;
}

/// Provider returning the same vector every cycle.
///
/// The vector can still be replaced between cycles through
/// [`set_weight`](Self::set_weight); "constant" refers to the sampling
/// model, not immutability.
#[derive(Debug)]
pub struct ConstantWeightProvider {
    weight: RwLock<DVector<f64>>,
}

impl ConstantWeightProvider {
    #[must_use]
    pub fn new(weight: DVector<f64>) -> Self {
        Self {
            weight: RwLock::new(weight),
        }
    }

    /// Replace the stored vector. Takes effect from the next cycle.
    pub fn set_weight(&self, weight: DVector<f64>) {
        if let Ok(mut w) = self.weight.write() {
            *w = weight;
        }
    }
}

impl WeightProvider for ConstantWeightProvider {
    fn weight(&self) -> DVector<f64> {
        self.weight
            .read()
            .map_or_else(|_| DVector::zeros(0), |w| (*w).clone())
    }
}

/// Weight source attached to a registered soft task.
#[derive(Clone)]
pub enum WeightSource {
    /// Fixed vector owned by the registry.
    Constant(DVector<f64>),
    /// Non-owning reference to an externally owned provider. A dropped
    /// provider turns into a solve-time failure for the task, never UB.
    Provider(Weak<dyn WeightProvider>),
}

impl WeightSource {
    /// Convenience constructor from a slice.
    #[must_use]
    pub fn constant(weight: &[f64]) -> Self {
        Self::Constant(DVector::from_column_slice(weight))
    }

    /// Non-owning handle to `provider`.
    #[must_use]
    pub fn provider(provider: &Arc<dyn WeightProvider>) -> Self {
        Self::Provider(Arc::downgrade(provider))
    }

    /// Sample the weight for this cycle.
    ///
    /// Returns `None` if the provider has been dropped.
    #[must_use]
    pub fn sample(&self) -> Option<DVector<f64>> {
        match self {
            Self::Constant(w) => Some(w.clone()),
            Self::Provider(p) => p.upgrade().map(|p| p.weight()),
        }
    }
}

impl std::fmt::Debug for WeightSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Constant(w) => write!(f, "Constant(dim {})", w.len()),
            Self::Provider(_) => write!(f, "Provider"),
        }
    }
}
