//! Execution listeners and the notification policy.

use crate::model::descriptor::{NodeKind, NodeRef};
use crate::model::result::{ExecutionReport, ExecutionResult};

/// Receives node events in parent-encloses-child order. The engine never reads anything back.
pub trait ExecutionListener {
    fn started(&mut self, _node: NodeRef<'_>) {}

    fn finished(&mut self, _node: NodeRef<'_>, _result: &ExecutionResult) {}

    /// A node that was never started because an enclosing setup scope failed.
    fn skipped(&mut self, _node: NodeRef<'_>, _reason: &str) {}

    /// Called once after the root finished, with the aggregate report.
    fn execution_finished(&mut self, _report: &ExecutionReport) {}
}

/// Which class nodes are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotifyPolicy {
    /// Class nodes are reported only when the tree holds more than one class.
    #[default]
    Collapsed,
    /// Every node is reported.
    Full,
}

/// Listener that ignores every event.
#[derive(Debug, Default)]
pub struct NullListener;

impl ExecutionListener for NullListener {}

/// Filters events through a [`NotifyPolicy`] before they reach the listener.
pub struct Notifier<'l> {
    listener: &'l mut dyn ExecutionListener,
    report_classes: bool,
}

impl<'l> Notifier<'l> {
    pub fn new(listener: &'l mut dyn ExecutionListener, policy: NotifyPolicy, class_count: usize) -> Self {
        Self {
            listener,
            report_classes: policy == NotifyPolicy::Full || class_count > 1,
        }
    }

    pub fn reports(&self, kind: NodeKind) -> bool {
        kind != NodeKind::Class || self.report_classes
    }

    pub fn started(&mut self, node: NodeRef<'_>) {
        if self.reports(node.kind()) {
            self.listener.started(node);
        }
    }

    pub fn finished(&mut self, node: NodeRef<'_>, result: &ExecutionResult) {
        if self.reports(node.kind()) {
            self.listener.finished(node, result);
        }
    }

    pub fn skipped(&mut self, node: NodeRef<'_>, reason: &str) {
        if self.reports(node.kind()) {
            self.listener.skipped(node, reason);
        }
    }

    pub fn execution_finished(&mut self, report: &ExecutionReport) {
        self.listener.execution_finished(report);
    }
}

/// Records every event as a line such as `finished method:t1 PASSED`.
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    pub events: Vec<String>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events that mention nodes of `kind`.
    pub fn of_kind(&self, kind: NodeKind) -> Vec<&str> {
        let needle = format!(" {kind}:");
        self.events
            .iter()
            .filter(|e| e.contains(&needle))
            .map(String::as_str)
            .collect()
    }
}

impl ExecutionListener for EventLog {
    fn started(&mut self, node: NodeRef<'_>) {
        self.events.push(format!("started {}:{}", node.kind(), node.display_name()));
    }

    fn finished(&mut self, node: NodeRef<'_>, result: &ExecutionResult) {
        self.events.push(format!(
            "finished {}:{} {}",
            node.kind(),
            node.display_name(),
            result.label()
        ));
    }

    fn skipped(&mut self, node: NodeRef<'_>, reason: &str) {
        self.events
            .push(format!("skipped {}:{} ({reason})", node.kind(), node.display_name()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::descriptor::TestTree;

    #[test]
    fn test_collapsed_hides_lone_class() {
        let mut log = EventLog::new();
        let notifier = Notifier::new(&mut log, NotifyPolicy::Collapsed, 1);
        assert!(!notifier.reports(NodeKind::Class));
        assert!(notifier.reports(NodeKind::Parameter));
        assert!(notifier.reports(NodeKind::Method));
        assert!(notifier.reports(NodeKind::Root));
    }

    #[test]
    fn test_full_and_multi_class_report_classes() {
        let mut log = EventLog::new();
        assert!(Notifier::new(&mut log, NotifyPolicy::Full, 1).reports(NodeKind::Class));
        assert!(Notifier::new(&mut log, NotifyPolicy::Collapsed, 2).reports(NodeKind::Class));
    }

    #[test]
    fn test_event_log_format() {
        let tree = TestTree::new(Vec::new(), Vec::new());
        let mut log = EventLog::new();
        log.started(NodeRef::Root(&tree));
        log.finished(NodeRef::Root(&tree), &ExecutionResult::Successful);
        assert_eq!(log.events, vec!["started engine:paramtest", "finished engine:paramtest PASSED"]);
        assert_eq!(log.of_kind(NodeKind::Root).len(), 2);
    }
}
