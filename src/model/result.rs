//! Execution outcomes and the aggregate report handed back by the executor.
//!
//! A node finishes with a tri-state [`ExecutionResult`]. Parents never wrap a child's failure: the first
//! failure recorded in a scope is carried upward verbatim. An abort only stands when nothing in the scope
//! failed. [`ExecutionResult::absorb`] implements both rules.

use std::fmt;
use std::time::Duration;

use super::descriptor::{NodeKind, UniqueId};

/// A fault raised by user code (a panic or a returned error), already unwrapped from the invocation wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    /// Type of the fault: `panic` for panics, the error type name for returned errors.
    pub kind: String,
    pub message: String,
    /// `file:line:column` of the panic, when it was captured.
    pub location: Option<String>,
    /// Stack frames between the panic machinery and the engine boundary, innermost first.
    pub trace: Vec<String>,
}

impl Fault {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            location: None,
            trace: Vec::new(),
        }
    }

    /// A fault raised by a panic with the given message.
    pub fn panic(message: impl Into<String>) -> Self {
        Self::new("panic", message)
    }

    /// A fault produced by the engine itself (e.g. a hook ran without a live subject).
    pub fn engine(message: impl Into<String>) -> Self {
        Self::new("engine", message)
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_trace(mut self, trace: Vec<String>) -> Self {
        self.trace = trace;
        self
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(location) = &self.location {
            write!(f, " (at {location})")?;
        }
        Ok(())
    }
}

impl std::error::Error for Fault {}

/// Conversion from the return value of a user hook into an outcome.
///
/// Implemented for `()` (always successful) and for `Result<(), E>` where `E: Display`; an `Err` becomes a
/// [`Fault`] whose kind is the error's type name.
pub trait IntoOutcome {
    fn into_outcome(self) -> Result<(), Fault>;
}

impl IntoOutcome for () {
    fn into_outcome(self) -> Result<(), Fault> {
        Ok(())
    }
}

impl<E: fmt::Display> IntoOutcome for Result<(), E> {
    fn into_outcome(self) -> Result<(), Fault> {
        self.map_err(|e| Fault::new(std::any::type_name::<E>(), e.to_string()))
    }
}

/// Tri-state outcome of a node or of a single invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExecutionResult {
    #[default]
    Successful,
    /// User code gave up on purpose (`paramtest::abort` / `paramtest::assume`).
    Aborted(Fault),
    Failed(Fault),
}

impl ExecutionResult {
    pub fn is_successful(&self) -> bool {
        matches!(self, ExecutionResult::Successful)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ExecutionResult::Failed(_))
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, ExecutionResult::Aborted(_))
    }

    /// The fault behind a non-successful result.
    pub fn fault(&self) -> Option<&Fault> {
        match self {
            ExecutionResult::Successful => None,
            ExecutionResult::Aborted(fault) | ExecutionResult::Failed(fault) => Some(fault),
        }
    }

    /// Record `next` into this scope.
    ///
    /// Failed outranks Aborted, which outranks Successful. Among outcomes of equal rank the first one wins.
    pub fn absorb(&mut self, next: &ExecutionResult) {
        if next.rank() > self.rank() {
            *self = next.clone();
        }
    }

    fn rank(&self) -> u8 {
        match self {
            ExecutionResult::Successful => 0,
            ExecutionResult::Aborted(_) => 1,
            ExecutionResult::Failed(_) => 2,
        }
    }

    /// Short status word used by the reporters.
    pub fn label(&self) -> &'static str {
        match self {
            ExecutionResult::Successful => "PASSED",
            ExecutionResult::Aborted(_) => "ABORTED",
            ExecutionResult::Failed(_) => "FAILED",
        }
    }
}

impl From<Result<(), Fault>> for ExecutionResult {
    fn from(outcome: Result<(), Fault>) -> Self {
        match outcome {
            Ok(()) => ExecutionResult::Successful,
            Err(fault) => ExecutionResult::Failed(fault),
        }
    }
}

/// Terminal state of a node in the aggregate report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeOutcome {
    Finished(ExecutionResult),
    Skipped(String),
}

impl NodeOutcome {
    pub fn result(&self) -> Option<&ExecutionResult> {
        match self {
            NodeOutcome::Finished(result) => Some(result),
            NodeOutcome::Skipped(_) => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, NodeOutcome::Skipped(_))
    }
}

/// One node of the aggregate report; mirrors the descriptor tree.
#[derive(Debug, Clone)]
pub struct NodeReport {
    pub id: UniqueId,
    pub kind: NodeKind,
    pub display_name: String,
    pub outcome: NodeOutcome,
    pub duration: Duration,
    pub children: Vec<NodeReport>,
}

impl NodeReport {
    /// Iterate this node and all of its descendants, depth-first.
    pub fn walk(&self) -> Box<dyn Iterator<Item = &NodeReport> + '_> {
        Box::new(std::iter::once(self).chain(self.children.iter().flat_map(|c| c.walk())))
    }

    /// Find the first descendant (or self) with the given display name and kind.
    pub fn find(&self, kind: NodeKind, display_name: &str) -> Option<&NodeReport> {
        self.walk().find(|n| n.kind == kind && n.display_name == display_name)
    }
}

/// Method-level counts of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub aborted: usize,
    pub skipped: usize,
    pub duration: Duration,
}

impl Summary {
    /// Count the method nodes below `root`.
    pub fn from_report(root: &NodeReport) -> Self {
        let mut summary = Summary {
            duration: root.duration,
            ..Summary::default()
        };
        for node in root.walk().filter(|n| n.kind == NodeKind::Method) {
            summary.total += 1;
            match &node.outcome {
                NodeOutcome::Skipped(_) => summary.skipped += 1,
                NodeOutcome::Finished(ExecutionResult::Successful) => summary.passed += 1,
                NodeOutcome::Finished(ExecutionResult::Aborted(_)) => summary.aborted += 1,
                NodeOutcome::Finished(ExecutionResult::Failed(_)) => summary.failed += 1,
            }
        }
        summary
    }
}

static SKIPPED_ROOT: ExecutionResult = ExecutionResult::Successful;

/// Aggregate result of one `execute` call.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub root: NodeReport,
    pub summary: Summary,
}

impl ExecutionReport {
    pub fn new(root: NodeReport) -> Self {
        let summary = Summary::from_report(&root);
        Self { root, summary }
    }

    /// The root's terminal result: the first failure recorded anywhere in the run.
    pub fn result(&self) -> &ExecutionResult {
        match &self.root.outcome {
            NodeOutcome::Finished(result) => result,
            NodeOutcome::Skipped(_) => &SKIPPED_ROOT,
        }
    }

    /// `true` when no node failed. Aborted and skipped nodes do not fail a run.
    pub fn is_success(&self) -> bool {
        !self.root.walk().any(|n| matches!(n.outcome.result(), Some(ExecutionResult::Failed(_))))
    }
}
