//! Named task registry with priority stratification.
//!
//! Owns the ordered collection of registered tasks, their priority level and
//! weight source, and enforces the compatibility rules between the three:
//! inequality tasks must be hard, soft tasks must carry a usable weight.
//! Iteration order is insertion order, which fixes the row order of the
//! assembled QP and keeps the formulation reproducible across runs.

use std::sync::{Arc, Weak};

use strata_core::{LinearTask, TaskType, WeightProvider, WeightSource};

use crate::error::{AssemblyError, IkError};

/// Priority level of a registered task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    /// Priority 0: enforced as a QP constraint, never traded off.
    Hard,
    /// Priority 1: folded into the weighted least-squares cost.
    Soft,
}

impl Priority {
    fn from_level(name: &str, level: usize) -> Result<Self, IkError> {
        match level {
            0 => Ok(Self::Hard),
            1 => Ok(Self::Soft),
            _ => Err(IkError::InvalidPriority {
                name: name.to_string(),
                priority: level,
            }),
        }
    }
}

/// One registered task.
#[derive(Clone)]
pub(crate) struct TaskEntry {
    pub(crate) name: String,
    pub(crate) task: Arc<dyn LinearTask>,
    pub(crate) priority: Priority,
    pub(crate) weight: Option<WeightSource>,
}

/// Insertion-ordered collection of named tasks.
#[derive(Default)]
pub struct TaskRegistry {
    entries: Vec<TaskEntry>,
}

impl TaskRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task under a unique name.
    ///
    /// Rejected without mutating the registry when the name is empty or
    /// taken, the priority is not 0 or 1, an inequality task is given
    /// priority 1, a soft task comes without a weight source, or a constant
    /// weight has the wrong dimension.
    pub fn add(
        &mut self,
        task: Arc<dyn LinearTask>,
        name: &str,
        priority: usize,
        weight: Option<WeightSource>,
    ) -> Result<(), IkError> {
        if name.is_empty() {
            return Err(IkError::EmptyTaskName);
        }
        if self.contains(name) {
            return Err(IkError::DuplicateTaskName(name.to_string()));
        }
        let priority = Priority::from_level(name, priority)?;
        if priority == Priority::Soft && task.task_type() == TaskType::Inequality {
            return Err(IkError::PriorityTypeMismatch(name.to_string()));
        }
        if priority == Priority::Soft && weight.is_none() {
            return Err(IkError::MissingWeightSource(name.to_string()));
        }
        if let Some(WeightSource::Constant(w)) = &weight {
            if w.len() != task.size() {
                return Err(AssemblyError::WeightDimMismatch {
                    name: name.to_string(),
                    expected: task.size(),
                    got: w.len(),
                }
                .into());
            }
        }

        self.entries.push(TaskEntry {
            name: name.to_string(),
            task,
            priority,
            weight,
        });
        Ok(())
    }

    /// Replace the weight source of an existing soft task.
    ///
    /// Takes effect from the next solve cycle; past solutions are untouched.
    pub fn set_weight(&mut self, name: &str, weight: WeightSource) -> Result<(), IkError> {
        let Some(entry) = self.entries.iter_mut().find(|e| e.name == name) else {
            return Err(IkError::UnknownTask(name.to_string()));
        };
        if entry.priority == Priority::Hard {
            return Err(IkError::HardTaskWeight(name.to_string()));
        }
        if let WeightSource::Constant(w) = &weight {
            if w.len() != entry.task.size() {
                return Err(AssemblyError::WeightDimMismatch {
                    name: name.to_string(),
                    expected: entry.task.size(),
                    got: w.len(),
                }
                .into());
            }
        }
        entry.weight = Some(weight);
        Ok(())
    }

    /// Non-owning handle to a registered task, `None` if unknown.
    #[must_use]
    pub fn task(&self, name: &str) -> Option<Weak<dyn LinearTask>> {
        self.find(name).map(|e| Arc::downgrade(&e.task))
    }

    /// Non-owning handle to the weight provider of a task.
    ///
    /// `None` if the task is unknown or its weight is a constant vector.
    #[must_use]
    pub fn weight_provider(&self, name: &str) -> Option<Weak<dyn WeightProvider>> {
        match self.find(name).and_then(|e| e.weight.as_ref()) {
            Some(WeightSource::Provider(p)) => Some(p.clone()),
            _ => None,
        }
    }

    /// Registered names, insertion order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn entries(&self) -> &[TaskEntry] {
        &self.entries
    }

    fn find(&self, name: &str) -> Option<&TaskEntry> {
        self.entries.iter().find(|e| e.name == name)
    }
}
