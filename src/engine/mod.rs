//! Discovery and execution.
//!
//! - [`resolver`]: ordered, masked lifecycle methods per class and category
//! - [`source`]: the parameter source and setter contract
//! - [`discovery`]: candidate pool → descriptor tree
//! - [`executor`]: descriptor tree → events and an aggregate report
//! - [`invoke`]: the panic-catching wrapper around user code

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod context;
pub mod discovery;
pub mod errors;
pub mod executor;
pub mod invoke;
pub mod listener;
pub mod resolver;
pub mod source;

pub use discovery::{CandidatePool, MethodSelector, discover};
pub use errors::ConfigError;
pub use executor::StagedExecutor;
pub use invoke::{abort, assume};
pub use listener::{EventLog, ExecutionListener, NotifyPolicy, NullListener};
pub use resolver::AnnotationResolver;
pub use source::ParameterSourceValidator;
