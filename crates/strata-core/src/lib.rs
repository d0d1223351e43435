// strata-core: Variables, linear-task contract, weights, options, errors for
// strata task-based solvers.

pub mod error;
pub mod options;
pub mod task;
pub mod variables;
pub mod weight;

pub use error::{OptionsError, StrataError, TaskError, VariablesError};
pub use options::IkOptions;
pub use task::{LinearTask, TaskBounds, TaskOutput, TaskType};
pub use variables::{VariableSpan, VariablesHandler};
pub use weight::{ConstantWeightProvider, WeightProvider, WeightSource};
