//! Decision-vector layout registry.
//!
//! A [`VariablesHandler`] maps named logical variables (e.g.
//! `"robot_velocity"`) to contiguous index ranges inside the global decision
//! vector of an optimization problem. Solvers query it once at finalize time
//! to size their buffers and to locate the segments they publish as output.

use crate::error::VariablesError;

/// Contiguous index range of one variable inside the decision vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableSpan {
    /// Index of the first element.
    pub offset: usize,
    /// Number of elements.
    pub size: usize,
}

impl VariableSpan {
    /// One-past-the-end index of the range.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.offset + self.size
    }
}

/// Ordered registry of named variables in the decision vector.
///
/// Variables are laid out back to back in registration order; the total
/// size grows with every [`add_variable`](Self::add_variable) call. Once a
/// handler has been handed to a solver's finalize step it must not be
/// mutated further (pass it by shared reference and drop it, or keep it
/// immutable by convention).
#[derive(Debug, Clone, Default)]
pub struct VariablesHandler {
    entries: Vec<(String, VariableSpan)>,
    total: usize,
}

impl VariablesHandler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a variable of `size` elements at the end of the vector.
    ///
    /// Fails if the name is empty, already registered, or `size` is zero.
    pub fn add_variable(&mut self, name: &str, size: usize) -> Result<(), VariablesError> {
        if name.is_empty() {
            return Err(VariablesError::EmptyVariableName);
        }
        if size == 0 {
            return Err(VariablesError::ZeroSizeVariable(name.to_string()));
        }
        if self.variable(name).is_some() {
            return Err(VariablesError::DuplicateVariable(name.to_string()));
        }

        let span = VariableSpan {
            offset: self.total,
            size,
        };
        self.entries.push((name.to_string(), span));
        self.total += size;
        Ok(())
    }

    /// Index range of a variable, or `None` if it was never registered.
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<VariableSpan> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, span)| *span)
    }

    /// Total length of the decision vector.
    #[must_use]
    pub const fn total_size(&self) -> usize {
        self.total
    }

    /// Number of registered variables.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Variable names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }
}
