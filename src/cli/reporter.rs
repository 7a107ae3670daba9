//! Listeners that render a run for humans (console) or machines (JSON lines).

use std::io::{self, Write};
use std::time::Duration;

use serde_json::{Value, json};
use tracing::warn;

use crate::engine::listener::ExecutionListener;
use crate::model::descriptor::{NodeKind, NodeRef, TestTree};
use crate::model::result::{ExecutionReport, ExecutionResult, Fault, NodeOutcome, NodeReport, Summary};

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const BOLD: &str = "\x1b[1m";
const BOLD_RED: &str = "\x1b[1;31m";
const BOLD_GREEN: &str = "\x1b[1;32m";
const RESET: &str = "\x1b[0m";

/// Destination shared by both reporters.
///
/// Listener callbacks cannot return errors, so the first write error is logged and every later write is
/// dropped. The run itself is unaffected.
struct Output {
    writer: Box<dyn Write>,
    failed: bool,
}

impl Output {
    fn new(writer: Box<dyn Write>) -> Self {
        Self { writer, failed: false }
    }

    fn emit(&mut self, write: impl FnOnce(&mut dyn Write) -> io::Result<()>) {
        if self.failed {
            return;
        }
        if let Err(err) = write(&mut *self.writer).and_then(|()| self.writer.flush()) {
            warn!(error = %err, "reporter output failed; dropping the rest of the report");
            self.failed = true;
        }
    }
}

/// How the console reporter renders lines.
#[derive(Debug, Clone, Copy)]
struct Style {
    verbose: bool,
    color: bool,
}

impl Style {
    fn paint(&self, color: &str, text: &str) -> String {
        if self.color {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn status(&self, result: &ExecutionResult) -> String {
        match (result, self.verbose) {
            (ExecutionResult::Successful, true) => self.paint(GREEN, "PASSED"),
            (ExecutionResult::Successful, false) => self.paint(GREEN, "."),
            (ExecutionResult::Aborted(_), true) => self.paint(YELLOW, "ABORTED"),
            (ExecutionResult::Aborted(_), false) => self.paint(YELLOW, "a"),
            (ExecutionResult::Failed(_), true) => self.paint(RED, "FAILED"),
            (ExecutionResult::Failed(_), false) => self.paint(RED, "F"),
        }
    }

    fn print_started(&self, out: &mut dyn Write, node: NodeRef<'_>) -> io::Result<()> {
        match node {
            NodeRef::Root(tree) => {
                let banner = self.paint(BOLD, "=================== test session starts ===================");
                writeln!(out, "{banner}")?;
                writeln!(out, "collected {} item(s)\n", tree.method_count())
            }
            NodeRef::Class(class) if self.verbose => writeln!(out, "{}", class.display_name),
            NodeRef::Parameter(parameter) if self.verbose => writeln!(out, "  [{}]", parameter.display_name),
            NodeRef::Method(method) if self.verbose => write!(out, "    {} ... ", method.display_name),
            _ => Ok(()),
        }
    }

    fn print_finished(&self, out: &mut dyn Write, result: &ExecutionResult) -> io::Result<()> {
        let status = self.status(result);
        if self.verbose {
            writeln!(out, "{status}")
        } else {
            write!(out, "{status}")
        }
    }

    fn print_skipped(&self, out: &mut dyn Write, node: NodeRef<'_>, reason: &str) -> io::Result<()> {
        if self.verbose {
            let indent = if node.kind() == NodeKind::Parameter { "  " } else { "    " };
            let status = self.paint(YELLOW, &format!("SKIPPED ({reason})"));
            writeln!(out, "{indent}{} {status}", node.display_name())
        } else {
            write!(out, "{}", self.paint(YELLOW, "s"))
        }
    }

    fn print_failures(&self, out: &mut dyn Write, report: &ExecutionReport) -> io::Result<()> {
        let mut failures = Vec::new();
        collect_failures(&report.root, &mut Vec::new(), &mut failures);
        if failures.is_empty() {
            return Ok(());
        }
        let header = self.paint(BOLD_RED, "=================== FAILURES ===================");
        writeln!(out, "\n{header}")?;
        for (path, fault) in failures {
            let title = self.paint(BOLD, &format!("___________ {path} ___________"));
            writeln!(out, "\n{title}\n")?;
            writeln!(out, "    {fault}")?;
            for frame in &fault.trace {
                writeln!(out, "      at {frame}")?;
            }
        }
        Ok(())
    }

    fn print_summary(&self, out: &mut dyn Write, summary: &Summary) -> io::Result<()> {
        let mut parts = Vec::new();
        if summary.passed > 0 {
            parts.push(format!("{} passed", summary.passed));
        }
        if summary.failed > 0 {
            parts.push(format!("{} failed", summary.failed));
        }
        if summary.aborted > 0 {
            parts.push(format!("{} aborted", summary.aborted));
        }
        if summary.skipped > 0 {
            parts.push(format!("{} skipped", summary.skipped));
        }
        if parts.is_empty() {
            parts.push("no tests ran".to_string());
        }
        let color = if summary.failed > 0 { BOLD_RED } else { BOLD_GREEN };
        let line = self.paint(color, &summary_line(&parts, summary.duration));
        writeln!(out, "\n{line}")
    }
}

/// Default console reporter (pytest-style)
pub struct ConsoleReporter {
    style: Style,
    out: Output,
}

impl ConsoleReporter {
    pub fn new(verbose: bool, color: bool) -> Self {
        Self::with_writer(verbose, color, Box::new(io::stdout()))
    }

    pub fn with_writer(verbose: bool, color: bool, out: Box<dyn Write>) -> Self {
        Self {
            style: Style { verbose, color },
            out: Output::new(out),
        }
    }

    /// `true` once writing to the destination has failed.
    pub fn output_failed(&self) -> bool {
        self.out.failed
    }
}

/// `====== 3 passed, 1 failed in 0.02s ======`
pub fn summary_line(parts: &[String], duration: Duration) -> String {
    format!("====== {} in {:.2}s ======", parts.join(", "), duration.as_secs_f64())
}

/// Failures worth printing: each fault once, at the deepest node that recorded it.
fn collect_failures<'a>(node: &'a NodeReport, path: &mut Vec<&'a str>, out: &mut Vec<(String, &'a Fault)>) {
    if node.kind != NodeKind::Root {
        path.push(&node.display_name);
    }
    for child in &node.children {
        collect_failures(child, path, out);
    }
    if let NodeOutcome::Finished(ExecutionResult::Failed(fault)) = &node.outcome {
        let reported_below = node
            .children
            .iter()
            .flat_map(|c| c.walk())
            .any(|n| matches!(&n.outcome, NodeOutcome::Finished(ExecutionResult::Failed(f)) if f == fault));
        if !reported_below && node.kind != NodeKind::Root {
            out.push((path.join(" > "), fault));
        }
    }
    if node.kind != NodeKind::Root {
        path.pop();
    }
}

impl ExecutionListener for ConsoleReporter {
    fn started(&mut self, node: NodeRef<'_>) {
        let style = self.style;
        self.out.emit(|w| style.print_started(w, node));
    }

    fn finished(&mut self, node: NodeRef<'_>, result: &ExecutionResult) {
        if let NodeRef::Method(_) = node {
            let style = self.style;
            self.out.emit(|w| style.print_finished(w, result));
        }
    }

    fn skipped(&mut self, node: NodeRef<'_>, reason: &str) {
        let style = self.style;
        self.out.emit(|w| style.print_skipped(w, node, reason));
    }

    fn execution_finished(&mut self, report: &ExecutionReport) {
        let style = self.style;
        self.out.emit(|w| {
            if !style.verbose {
                writeln!(w)?;
            }
            style.print_failures(w, report)?;
            style.print_summary(w, &report.summary)
        });
    }
}

/// Writes one JSON object per event.
pub struct JsonReporter {
    out: Output,
}

impl JsonReporter {
    pub fn new() -> Self {
        Self::with_writer(Box::new(io::stdout()))
    }

    pub fn with_writer(out: Box<dyn Write>) -> Self {
        Self { out: Output::new(out) }
    }

    /// `true` once writing to the destination has failed.
    pub fn output_failed(&self) -> bool {
        self.out.failed
    }

    fn emit(&mut self, event: Value) {
        self.out.emit(|w| writeln!(w, "{event}"));
    }
}

impl Default for JsonReporter {
    fn default() -> Self {
        Self::new()
    }
}

fn node_json(event: &str, node: NodeRef<'_>) -> Value {
    json!({
        "event": event,
        "kind": node.kind().as_str(),
        "id": node.id().to_string(),
        "name": node.display_name(),
    })
}

fn fault_json(fault: &Fault) -> Value {
    json!({
        "type": fault.kind,
        "message": fault.message,
        "location": fault.location,
        "trace": fault.trace,
    })
}

impl ExecutionListener for JsonReporter {
    fn started(&mut self, node: NodeRef<'_>) {
        self.emit(node_json("started", node));
    }

    fn finished(&mut self, node: NodeRef<'_>, result: &ExecutionResult) {
        let mut event = node_json("finished", node);
        event["result"] = json!(result.label());
        if let Some(fault) = result.fault() {
            event["fault"] = fault_json(fault);
        }
        self.emit(event);
    }

    fn skipped(&mut self, node: NodeRef<'_>, reason: &str) {
        let mut event = node_json("skipped", node);
        event["reason"] = json!(reason);
        self.emit(event);
    }

    fn execution_finished(&mut self, report: &ExecutionReport) {
        let summary = &report.summary;
        self.emit(json!({
            "event": "summary",
            "total": summary.total,
            "passed": summary.passed,
            "failed": summary.failed,
            "aborted": summary.aborted,
            "skipped": summary.skipped,
            "duration_ms": summary.duration.as_millis() as u64,
        }));
    }
}

/// Render the discovered tree, one node per line, for `--list`.
pub fn render_plan(tree: &TestTree) -> String {
    let mut out = String::new();
    out.push_str(&tree.display_name);
    out.push('\n');
    for class in tree.classes() {
        out.push_str(&format!("  {}\n", class.display_name));
        for parameter in &class.parameters {
            out.push_str(&format!("    [{}]\n", parameter.display_name));
            for method in &parameter.methods {
                out.push_str(&format!("      {}\n", method.display_name));
            }
        }
    }
    for pruned in tree.pruned() {
        out.push_str(&format!("  (pruned) {}: {}\n", pruned.name, pruned.reason));
    }
    out.push_str(&format!(
        "{} class(es), {} parameter(s), {} test(s)\n",
        tree.classes().len(),
        tree.parameter_count(),
        tree.method_count()
    ));
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::model::descriptor::UniqueId;

    /// Writer that keeps what it was given.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn leaf(name: &str, outcome: NodeOutcome) -> NodeReport {
        NodeReport {
            id: UniqueId::root(),
            kind: NodeKind::Method,
            display_name: name.to_string(),
            outcome,
            duration: Duration::ZERO,
            children: Vec::new(),
        }
    }

    fn report(children: Vec<NodeReport>) -> ExecutionReport {
        let failure = children
            .iter()
            .filter_map(|c| c.outcome.result())
            .find(|r| r.is_failed())
            .cloned()
            .unwrap_or_default();
        ExecutionReport::new(NodeReport {
            id: UniqueId::root(),
            kind: NodeKind::Root,
            display_name: "paramtest".to_string(),
            outcome: NodeOutcome::Finished(failure),
            duration: Duration::from_millis(20),
            children,
        })
    }

    #[test]
    fn test_summary_line_format() {
        let parts = vec!["3 passed".to_string(), "1 failed".to_string()];
        assert_eq!(
            summary_line(&parts, Duration::from_millis(1500)),
            "====== 3 passed, 1 failed in 1.50s ======"
        );
    }

    #[test]
    fn test_console_prints_failure_section_once() {
        let sink = Captured::default();
        let mut reporter = ConsoleReporter::with_writer(false, false, Box::new(sink.clone()));
        let fault = Fault::panic("expected 2, got 3").with_trace(vec!["demo::check at src/demo.rs:4:5".into()]);
        reporter.execution_finished(&report(vec![
            leaf("t1", NodeOutcome::Finished(ExecutionResult::Successful)),
            leaf("t2", NodeOutcome::Finished(ExecutionResult::Failed(fault))),
        ]));
        let text = sink.text();
        assert!(text.contains("___________ t2 ___________"));
        assert!(text.contains("    panic: expected 2, got 3"));
        assert!(text.contains("      at demo::check at src/demo.rs:4:5"));
        assert_eq!(text.matches("expected 2, got 3").count(), 1);
        assert!(text.contains("====== 1 passed, 1 failed in 0.02s ======"));
    }

    /// Writer that refuses every write.
    struct Closed;

    impl Write for Closed {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_errors_are_recorded_not_raised() {
        let run = report(vec![leaf("t1", NodeOutcome::Finished(ExecutionResult::Successful))]);

        let mut console = ConsoleReporter::with_writer(true, false, Box::new(Closed));
        assert!(!console.output_failed());
        console.execution_finished(&run);
        assert!(console.output_failed());
        console.execution_finished(&run);
        assert!(console.output_failed());

        let mut json = JsonReporter::with_writer(Box::new(Closed));
        json.execution_finished(&run);
        assert!(json.output_failed());
    }

    #[test]
    fn test_verbose_console_lines() {
        let sink = Captured::default();
        let mut reporter = ConsoleReporter::with_writer(true, false, Box::new(sink.clone()));
        let tree = TestTree::new(Vec::new(), Vec::new());
        reporter.started(NodeRef::Root(&tree));
        reporter.execution_finished(&report(Vec::new()));
        let text = sink.text();
        assert!(text.starts_with("=================== test session starts ==================="));
        assert!(text.contains("collected 0 item(s)"));
        assert!(text.contains("no tests ran"));
        assert!(!reporter.output_failed());
    }

    #[test]
    fn test_json_summary_event() {
        let sink = Captured::default();
        let mut reporter = JsonReporter::with_writer(Box::new(sink.clone()));
        reporter.execution_finished(&report(vec![leaf(
            "t1",
            NodeOutcome::Skipped("parameter setup failed".into()),
        )]));
        let line: Value = serde_json::from_str(sink.text().trim()).unwrap();
        assert_eq!(line["event"], "summary");
        assert_eq!(line["skipped"], 1);
        assert_eq!(line["failed"], 0);
    }
}
