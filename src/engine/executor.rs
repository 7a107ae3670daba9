//! The staged executor.
//!
//! Walks the descriptor tree depth-first and runs every lifecycle scope in order:
//!
//! ```text
//! class:      before_all* → instantiate → parameters → release → after_all*
//! parameter:  setter → before_parameter* → methods → after_parameter*
//! method:     before_each* → test → after_each*
//! ```
//!
//! Setup lists stop at their first failure, teardown lists always run to the end, and teardown runs no
//! matter what happened before it. Every node finishes with the first failure recorded in its own scope or
//! below, or with the first abort when nothing failed. A failed class setup skips the class's parameters
//! and their methods; a failed parameter setup skips that parameter's methods. Nothing raised by user code
//! escapes [`StagedExecutor::execute`].

use std::time::{Duration, Instant};

use paramtest_core::errors::{CLASS_SETUP_FAILED, PARAMETER_SETUP_FAILED};
use paramtest_core::lang::lifecycle::LifecycleCategory;
use tracing::{debug, info_span};

use crate::config::RunConfig;
use crate::model::descriptor::{ClassNode, MethodNode, NodeKind, NodeRef, ParameterNode, TestTree, UniqueId};
use crate::model::result::{ExecutionReport, ExecutionResult, NodeOutcome, NodeReport};

use super::context::ExecutionContext;
use super::invoke::InvokeSettings;
use super::listener::{ExecutionListener, Notifier, NotifyPolicy};

#[derive(Debug, Clone, Default)]
pub struct StagedExecutor {
    settings: InvokeSettings,
    policy: NotifyPolicy,
}

impl StagedExecutor {
    pub fn new(config: &RunConfig) -> Self {
        Self {
            settings: InvokeSettings::from(config),
            policy: config.notify,
        }
    }

    /// Execute `tree`, streaming events to `listener`, and return the aggregate report.
    #[tracing::instrument(skip_all, fields(classes = tree.classes.len(), methods = tree.method_count()))]
    pub fn execute(&self, tree: &TestTree, listener: &mut dyn ExecutionListener) -> ExecutionReport {
        let started = Instant::now();
        let notifier = Notifier::new(listener, self.policy, tree.classes.len());
        let mut ctx = ExecutionContext::new(notifier, self.settings);

        ctx.notifier.started(NodeRef::Root(tree));
        let mut result = ExecutionResult::Successful;
        let mut children = Vec::with_capacity(tree.classes.len());
        for class in &tree.classes {
            let report = self.execute_class(&mut ctx, class);
            absorb_report(&mut result, &report);
            children.push(report);
        }
        ctx.notifier.finished(NodeRef::Root(tree), &result);

        let root = NodeReport {
            id: tree.id.clone(),
            kind: NodeKind::Root,
            display_name: tree.display_name.clone(),
            outcome: NodeOutcome::Finished(result),
            duration: started.elapsed(),
            children,
        };
        let report = ExecutionReport::new(root);
        ctx.notifier.execution_finished(&report);
        report
    }

    fn execute_class(&self, ctx: &mut ExecutionContext<'_>, class: &ClassNode) -> NodeReport {
        let _span = info_span!("class", name = class.record.name()).entered();
        let started = Instant::now();
        ctx.notifier.started(NodeRef::Class(class));
        ctx.begin_class(&class.record);

        let mut scope = ctx.run_hooks(class.plan.hooks(LifecycleCategory::ClassSetup));
        if scope.is_successful() {
            scope = ctx.instantiate(&class.record);
        }

        if scope.is_successful() {
            for parameter in &class.parameters {
                let report = self.execute_parameter(ctx, class, parameter);
                absorb_report(&mut scope, &report);
                ctx.record(report);
            }
        } else {
            debug!(class = class.record.name(), "class setup failed; skipping parameters");
            for parameter in &class.parameters {
                ctx.notifier.skipped(NodeRef::Parameter(parameter), CLASS_SETUP_FAILED);
                for method in &parameter.methods {
                    ctx.notifier.skipped(NodeRef::Method(method), CLASS_SETUP_FAILED);
                }
                ctx.record(skipped_parameter(parameter, CLASS_SETUP_FAILED));
            }
        }

        ctx.release_subject();
        let teardown = ctx.run_hooks(class.plan.hooks(LifecycleCategory::ClassTeardown));
        scope.absorb(&teardown);

        let children = ctx.finish_class();
        ctx.notifier.finished(NodeRef::Class(class), &scope);
        finished(&class.id, NodeKind::Class, &class.display_name, scope, started, children)
    }

    fn execute_parameter(
        &self,
        ctx: &mut ExecutionContext<'_>,
        class: &ClassNode,
        parameter: &ParameterNode,
    ) -> NodeReport {
        let started = Instant::now();
        ctx.notifier.started(NodeRef::Parameter(parameter));

        let mut scope = ctx.set_parameter(&class.plan.setter, &parameter.parameter);
        if scope.is_successful() {
            scope = ctx.run_hooks(class.plan.hooks(LifecycleCategory::ParameterSetup));
        }

        let mut children = Vec::with_capacity(parameter.methods.len());
        if scope.is_successful() {
            for method in &parameter.methods {
                let report = self.execute_method(ctx, class, method);
                absorb_report(&mut scope, &report);
                children.push(report);
            }
        } else {
            debug!(parameter = %parameter.display_name, "parameter setup failed; skipping methods");
            let reason = PARAMETER_SETUP_FAILED;
            for method in &parameter.methods {
                ctx.notifier.skipped(NodeRef::Method(method), reason);
                children.push(skipped(&method.id, NodeKind::Method, &method.display_name, reason, Vec::new()));
            }
        }

        let teardown = ctx.run_hooks(class.plan.hooks(LifecycleCategory::ParameterTeardown));
        scope.absorb(&teardown);

        ctx.notifier.finished(NodeRef::Parameter(parameter), &scope);
        finished(&parameter.id, NodeKind::Parameter, &parameter.display_name, scope, started, children)
    }

    fn execute_method(&self, ctx: &mut ExecutionContext<'_>, class: &ClassNode, method: &MethodNode) -> NodeReport {
        let started = Instant::now();
        ctx.notifier.started(NodeRef::Method(method));

        let mut result = ctx.run_hooks(class.plan.hooks(LifecycleCategory::MethodSetup));
        if result.is_successful() {
            let body = ctx.invoke(&method.method.invoker);
            result.absorb(&body);
        }
        let teardown = ctx.run_hooks(class.plan.hooks(LifecycleCategory::MethodTeardown));
        result.absorb(&teardown);

        debug!(method = %method.display_name, result = result.label(), "method finished");
        ctx.notifier.finished(NodeRef::Method(method), &result);
        finished(&method.id, NodeKind::Method, &method.display_name, result, started, Vec::new())
    }
}

/// Fold a child's finished result into its parent's scope; skipped children contribute nothing.
fn absorb_report(scope: &mut ExecutionResult, child: &NodeReport) {
    if let Some(result) = child.outcome.result() {
        scope.absorb(result);
    }
}

fn finished(
    id: &UniqueId,
    kind: NodeKind,
    display_name: &str,
    result: ExecutionResult,
    started: Instant,
    children: Vec<NodeReport>,
) -> NodeReport {
    NodeReport {
        id: id.clone(),
        kind,
        display_name: display_name.to_string(),
        outcome: NodeOutcome::Finished(result),
        duration: started.elapsed(),
        children,
    }
}

fn skipped(id: &UniqueId, kind: NodeKind, display_name: &str, reason: &str, children: Vec<NodeReport>) -> NodeReport {
    NodeReport {
        id: id.clone(),
        kind,
        display_name: display_name.to_string(),
        outcome: NodeOutcome::Skipped(reason.to_string()),
        duration: Duration::ZERO,
        children,
    }
}

fn skipped_parameter(parameter: &ParameterNode, reason: &str) -> NodeReport {
    let methods = parameter
        .methods
        .iter()
        .map(|m| skipped(&m.id, NodeKind::Method, &m.display_name, reason, Vec::new()))
        .collect();
    skipped(&parameter.id, NodeKind::Parameter, &parameter.display_name, reason, methods)
}
