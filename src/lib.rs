#![forbid(unsafe_code)]
//! paramtest: discovery and staged execution of parameterized test classes
//!
//! A test class declares one parameter source, one parameter setter, and any number of lifecycle methods.
//! The engine instantiates the class once, applies every parameter value in turn, and runs the test
//! methods against each value inside class, parameter, and method scopes.
//!
//! - [`model`]: the class registry, descriptor tree, and result types
//! - [`engine`]: method resolution, source validation, discovery, and the staged executor
//! - [`cli`]: the launcher for `harness = false` test targets, with console and JSON reporters
//! - [`config`]: run configuration shared by the launcher and the executor
//!
//! ## Panic Policy
//!
//! This codebase follows explicit error handling:
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` and `engine` modules
//!   enforce `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//!
//! - **User code**: Panics raised by lifecycle methods, sources, and setters are caught at the invocation
//!   boundary and turned into failed (or, for [`abort`], aborted) results. They never unwind through the engine.

extern crate self as paramtest;

pub mod cli;
pub mod config;
pub mod engine;
pub mod model;

pub use paramtest_core::LifecycleCategory;
pub use paramtest_derive::test_class;

pub use config::{OutputFormat, RunConfig};
pub use engine::{
    AnnotationResolver, CandidatePool, ConfigError, EventLog, ExecutionListener, NotifyPolicy, NullListener,
    ParameterSourceValidator, StagedExecutor, abort, assume, discover,
};
pub use model::{
    ClassDef, ClassRecord, DisplayName, ExecutionReport, ExecutionResult, Fault, IntoOutcome, IntoParameter,
    IntoParameterSequence, NodeKind, Parameter, Summary, TestClass, TestTree, UniqueId,
};

/// Everything a test file needs to declare and run classes.
pub mod prelude {
    pub use crate::engine::{CandidatePool, abort, assume};
    pub use crate::model::{ClassDef, DisplayName, Fault, Parameter, TestClass};
    pub use paramtest_derive::test_class;
}
