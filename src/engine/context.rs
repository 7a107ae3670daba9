//! Mutable state threaded through one execution.

use std::fmt;

use paramtest_core::lang::lifecycle::{self, LifecycleCategory};
use tracing::debug;

use crate::model::class::{ClassRecord, Invoker, SetterDecl, Subject};
use crate::model::descriptor::ResolvedMethod;
use crate::model::parameter::Parameter;
use crate::model::result::{ExecutionResult, Fault, NodeReport};

use super::invoke::{self, InvokeSettings};
use super::listener::Notifier;

/// How a list of hooks reacts to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookMode {
    /// Setup: the first failure ends the list.
    StopAtFirstFailure,
    /// Teardown: every hook runs; the first failure is kept.
    RunAll,
}

impl HookMode {
    /// Teardown categories run every hook; the others stop early.
    pub fn for_category(category: LifecycleCategory) -> Self {
        if lifecycle::is_teardown(category) {
            HookMode::RunAll
        } else {
            HookMode::StopAtFirstFailure
        }
    }
}

/// The listener, the live test subject, and the reports accumulated for the current class.
pub struct ExecutionContext<'l> {
    pub notifier: Notifier<'l>,
    settings: InvokeSettings,
    subject: Option<Box<Subject>>,
    results: Vec<NodeReport>,
}

impl<'l> ExecutionContext<'l> {
    pub fn new(notifier: Notifier<'l>, settings: InvokeSettings) -> Self {
        Self {
            notifier,
            settings,
            subject: None,
            results: Vec::new(),
        }
    }

    /// Enter the class step.
    pub fn begin_class(&mut self, class: &ClassRecord) {
        debug!(class = class.name(), "class step running");
        self.subject = None;
        self.results.clear();
    }

    /// Create the class's subject; a missing constructor or a panicking one fails the class scope.
    pub fn instantiate(&mut self, class: &ClassRecord) -> ExecutionResult {
        let created = invoke::guarded(&self.settings, || class.instantiate());
        if self.settings.flush_output {
            invoke::flush_output();
        }
        match created {
            Ok(Some(subject)) => {
                self.subject = Some(subject);
                ExecutionResult::Successful
            }
            Ok(None) => ExecutionResult::Failed(Fault::engine(format!("{} has no constructor", class.name()))),
            Err(caught) => caught,
        }
    }

    /// Drop the live subject.
    pub fn release_subject(&mut self) {
        self.subject = None;
    }

    /// Leave the class step, handing back the reports recorded during it.
    pub fn finish_class(&mut self) -> Vec<NodeReport> {
        self.release_subject();
        std::mem::take(&mut self.results)
    }

    pub fn record(&mut self, report: NodeReport) {
        self.results.push(report);
    }

    pub fn invoke(&mut self, invoker: &Invoker) -> ExecutionResult {
        invoke::invoke(invoker, self.subject.as_deref_mut(), &self.settings)
    }

    pub fn set_parameter(&mut self, setter: &SetterDecl, parameter: &Parameter) -> ExecutionResult {
        invoke::invoke_setter(setter, self.subject.as_deref_mut(), parameter, &self.settings)
    }

    /// Run `hooks` in order and return the scope's outcome: the first failure, else the first abort.
    ///
    /// The list's mode comes from the hooks' category; an empty list is trivially successful.
    pub fn run_hooks(&mut self, hooks: &[ResolvedMethod]) -> ExecutionResult {
        let mut scope = ExecutionResult::Successful;
        let Some(first) = hooks.first() else {
            return scope;
        };
        let mode = HookMode::for_category(first.category);
        for hook in hooks {
            let outcome = self.invoke(&hook.invoker);
            debug!(
                hook = %hook.name,
                category = lifecycle::as_str(hook.category),
                result = outcome.label(),
                "hook finished"
            );
            scope.absorb(&outcome);
            if mode == HookMode::StopAtFirstFailure && !outcome.is_successful() {
                break;
            }
        }
        scope
    }
}

impl fmt::Debug for ExecutionContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("live_subject", &self.subject.is_some())
            .field("results", &self.results.len())
            .finish()
    }
}
