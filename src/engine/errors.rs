//! Configuration errors raised while building the descriptor tree.

use miette::Diagnostic;
use thiserror::Error;

/// A structural misdeclaration detected at discovery time.
///
/// Every variant except [`ConfigError::EmptySource`] aborts the discovery pass.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum ConfigError {
    #[error("{class}: {}; no parameter source is declared", paramtest_core::errors::SUPPLIER_MISSING)]
    #[diagnostic(
        code(paramtest::source::missing),
        help("declare a `#[parameter_source]` function or constant on the class or one of its ancestors")
    )]
    MissingSource { class: String },

    #[error("{class}: declares both field and method parameter sources ({field} and {method})")]
    #[diagnostic(code(paramtest::source::conflict), help("keep exactly one parameter source"))]
    ConflictingSources { class: String, field: String, method: String },

    #[error("{class}: declares {count} {kind} parameter sources ({names})")]
    #[diagnostic(code(paramtest::source::duplicate), help("keep exactly one parameter source"))]
    DuplicateSources {
        class: String,
        kind: &'static str,
        count: usize,
        names: String,
    },

    #[error("{class}: parameter source `{source_name}` returned null")]
    #[diagnostic(code(paramtest::source::null))]
    NullSource { class: String, source_name: String },

    #[error("{class}: parameter source `{source_name}` panicked: {message}")]
    #[diagnostic(code(paramtest::source::panicked))]
    SourcePanicked {
        class: String,
        source_name: String,
        message: String,
    },

    #[error("{class}: parameter #{index} from `{source_name}` is a `{found}`, but the setter takes `{expected}`")]
    #[diagnostic(
        code(paramtest::source::wrong_type),
        help("the parameter source and the parameter setter must agree on the value type")
    )]
    WrongElementType {
        class: String,
        source_name: String,
        index: usize,
        expected: &'static str,
        found: &'static str,
    },

    #[error("{class}: {}", paramtest_core::errors::SUPPLIER_EMPTY)]
    #[diagnostic(code(paramtest::source::empty), severity(Warning))]
    EmptySource { class: String },

    #[error("{class}: no parameter setter is declared")]
    #[diagnostic(code(paramtest::setter::missing), help("declare exactly one `#[parameter_setter]` method"))]
    MissingSetter { class: String },

    #[error("{class}: declares {count} parameter setters ({names})")]
    #[diagnostic(code(paramtest::setter::duplicate), help("declare exactly one `#[parameter_setter]` method"))]
    DuplicateSetters { class: String, count: usize, names: String },

    #[error("{class}: no constructor is registered")]
    #[diagnostic(
        code(paramtest::class::no_constructor),
        help("implement `Default` for the subject, pass `constructor = path`, or mark the class `base`")
    )]
    MissingConstructor { class: String },

    #[error("selected class `{class}` is not registered")]
    #[diagnostic(code(paramtest::select::unknown_class))]
    UnknownClass { class: String },

    #[error("selected method `{class}::{method}` is not an eligible test method")]
    #[diagnostic(code(paramtest::select::unknown_method))]
    UnknownMethod { class: String, method: String },
}

impl ConfigError {
    /// `true` for errors that only remove the affected class from the tree.
    pub fn is_class_local(&self) -> bool {
        matches!(self, ConfigError::EmptySource { .. })
    }

    pub fn class(&self) -> &str {
        match self {
            ConfigError::MissingSource { class }
            | ConfigError::ConflictingSources { class, .. }
            | ConfigError::DuplicateSources { class, .. }
            | ConfigError::NullSource { class, .. }
            | ConfigError::SourcePanicked { class, .. }
            | ConfigError::WrongElementType { class, .. }
            | ConfigError::EmptySource { class }
            | ConfigError::MissingSetter { class }
            | ConfigError::DuplicateSetters { class, .. }
            | ConfigError::MissingConstructor { class }
            | ConfigError::UnknownClass { class }
            | ConfigError::UnknownMethod { class, .. } => class,
        }
    }
}
