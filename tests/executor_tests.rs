//! Staged execution: lifecycle order, failure containment, skip propagation, and listener events.

use std::sync::{Arc, Mutex};

use paramtest::engine::listener::EventLog;
use paramtest::model::{NodeOutcome, TestTree};
use paramtest::prelude::*;
use paramtest::{ExecutionReport, ExecutionResult, NodeKind, NotifyPolicy, RunConfig, StagedExecutor, discover};

/// Shared call journal; closures registered on a class each hold a clone.
#[derive(Clone, Default)]
struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    fn note(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

#[derive(Default)]
struct Letters {
    current: String,
}

/// `["a", "b"]` × `t1`, `t2`, with every hook writing to `journal`.
fn letters(name: &str, journal: &Journal) -> ClassDef<Letters> {
    let j = journal.clone();
    let (j1, j2, j3, j4, j5, j6, j7) = (j.clone(), j.clone(), j.clone(), j.clone(), j.clone(), j.clone(), j);
    ClassDef::<Letters>::new(name)
        .constructor(Letters::default)
        .parameter_field("LETTERS", &["a", "b"])
        .parameter_setter("set", |s: &mut Letters, v: &String| s.current = v.clone())
        .before_all("open", move || j1.note("before_all"))
        .after_all("close", move || j2.note("after_all"))
        .before_parameter("prepare", move |s: &mut Letters| j3.note(format!("{}:before_parameter", s.current)))
        .after_parameter("release", move |s: &mut Letters| j4.note(format!("{}:after_parameter", s.current)))
        .before_each("arrange", move |s: &mut Letters| j5.note(format!("{}:before_each", s.current)))
        .after_each("cleanup", move |s: &mut Letters| j6.note(format!("{}:after_each", s.current)))
        .test("t1", move |s: &mut Letters| j7.note(format!("{}:t1", s.current)))
}

fn fail(message: &str) {
    panic!("{message}")
}

fn run(tree: &TestTree) -> (ExecutionReport, EventLog) {
    let mut log = EventLog::new();
    let report = StagedExecutor::new(&RunConfig::new().with_capture_backtrace(false)).execute(tree, &mut log);
    (report, log)
}

fn tree_of(record: Arc<paramtest::model::ClassRecord>) -> TestTree {
    discover(&CandidatePool::new().with_record(record)).unwrap()
}

// ============================================================================
// Ordering
// ============================================================================

#[test]
fn test_parameters_then_methods_in_tree_order() {
    let journal = Journal::default();
    let t2 = journal.clone();
    let record = letters("suite::Letters", &journal)
        .test("t2", move |s: &mut Letters| t2.note(format!("{}:t2", s.current)))
        .build();

    let (report, _) = run(&tree_of(record));
    assert!(report.is_success());
    assert_eq!(report.summary.total, 4);
    assert_eq!(report.summary.passed, 4);

    let bodies: Vec<_> = journal
        .entries()
        .into_iter()
        .filter(|e| e.ends_with(":t1") || e.ends_with(":t2"))
        .collect();
    assert_eq!(bodies, vec!["a:t1", "a:t2", "b:t1", "b:t2"]);
}

#[test]
fn test_full_lifecycle_sequence() {
    let journal = Journal::default();
    let (report, _) = run(&tree_of(letters("suite::Letters", &journal).build()));
    assert!(report.is_success());
    assert_eq!(
        journal.entries(),
        vec![
            "before_all",
            "a:before_parameter",
            "a:before_each",
            "a:t1",
            "a:after_each",
            "a:after_parameter",
            "b:before_parameter",
            "b:before_each",
            "b:t1",
            "b:after_each",
            "b:after_parameter",
            "after_all",
        ]
    );
}

#[test]
fn test_subject_is_instantiated_once_per_class() {
    static BUILT: Mutex<u32> = Mutex::new(0);

    #[derive(Default)]
    struct Counted;

    let record = ClassDef::<Counted>::new("suite::Counted")
        .constructor(|| {
            *BUILT.lock().unwrap() += 1;
            Counted
        })
        .parameter_field("VALUES", &[1u8, 2, 3])
        .parameter_setter("set", |_: &mut Counted, _: &u8| {})
        .test("t", |_: &mut Counted| {})
        .build();

    let (report, _) = run(&tree_of(record));
    assert_eq!(report.summary.total, 3);
    assert_eq!(*BUILT.lock().unwrap(), 1);
}

#[test]
fn test_explicit_order_beats_declaration_order() {
    let journal = Journal::default();
    let (a, b) = (journal.clone(), journal.clone());
    let record = ClassDef::<Letters>::new("suite::Ordered")
        .constructor(Letters::default)
        .parameter_field("ONE", &["x"])
        .parameter_setter("set", |s: &mut Letters, v: &String| s.current = v.clone())
        .before_all("a_second", move || a.note("a_second"))
        .with_order("a_second", 2)
        .before_all("b_first", move || b.note("b_first"))
        .with_order("b_first", 1)
        .test("t", |_: &mut Letters| {})
        .build();

    run(&tree_of(record));
    assert_eq!(journal.entries(), vec!["b_first", "a_second"]);
}

// ============================================================================
// Failure containment
// ============================================================================

#[test]
fn test_failed_method_setup_skips_body_but_runs_teardown() {
    let journal = Journal::default();
    let (body, teardown) = (journal.clone(), journal.clone());
    let record = ClassDef::<Letters>::new("suite::BrokenSetup")
        .constructor(Letters::default)
        .parameter_field("ONE", &["x"])
        .parameter_setter("set", |s: &mut Letters, v: &String| s.current = v.clone())
        .before_each("arrange", |_: &mut Letters| -> Result<(), String> { Err("no fixture".into()) })
        .test("t", move |_: &mut Letters| body.note("body"))
        .after_each("cleanup", move |_: &mut Letters| teardown.note("after_each"))
        .build();

    let (report, _) = run(&tree_of(record));
    assert_eq!(journal.entries(), vec!["after_each"]);
    assert!(!report.is_success());
    let method = report.root.find(NodeKind::Method, "t").unwrap();
    match &method.outcome {
        NodeOutcome::Finished(ExecutionResult::Failed(fault)) => assert!(fault.message.contains("no fixture")),
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[test]
fn test_first_failure_wins_within_a_method() {
    let record = ClassDef::<Letters>::new("suite::TwoFaults")
        .constructor(Letters::default)
        .parameter_field("ONE", &["x"])
        .parameter_setter("set", |s: &mut Letters, v: &String| s.current = v.clone())
        .test("t", |_: &mut Letters| fail("body broke"))
        .after_each("cleanup", |_: &mut Letters| fail("teardown broke"))
        .build();

    let (report, _) = run(&tree_of(record));
    let method = report.root.find(NodeKind::Method, "t").unwrap();
    let fault = method.outcome.result().and_then(ExecutionResult::fault).unwrap();
    assert!(fault.message.contains("body broke"));
}

#[test]
fn test_failed_parameter_setup_skips_methods_and_runs_teardown() {
    let journal = Journal::default();
    let (teardown, body) = (journal.clone(), journal.clone());
    let record = ClassDef::<Letters>::new("suite::BadParameter")
        .constructor(Letters::default)
        .parameter_field("LETTERS", &["a", "b"])
        .parameter_setter("set", |s: &mut Letters, v: &String| s.current = v.clone())
        .before_parameter("prepare", |s: &mut Letters| assert_ne!(s.current, "a", "cannot prepare a"))
        .after_parameter("release", move |s: &mut Letters| teardown.note(format!("{}:after_parameter", s.current)))
        .test("t1", move |s: &mut Letters| body.note(format!("{}:t1", s.current)))
        .build();

    let (report, log) = run(&tree_of(record));
    assert_eq!(journal.entries(), vec!["a:after_parameter", "b:t1", "b:after_parameter"]);

    let a = report.root.find(NodeKind::Parameter, "a").unwrap();
    assert!(matches!(a.outcome, NodeOutcome::Finished(ExecutionResult::Failed(_))));
    assert_eq!(a.children[0].outcome, NodeOutcome::Skipped("parameter setup failed".into()));
    assert_eq!(report.summary.skipped, 1);
    assert_eq!(report.summary.passed, 1);
    assert!(log.events.contains(&"skipped method:t1 (parameter setup failed)".to_string()));
}

#[test]
fn test_failure_in_one_parameter_does_not_stop_the_next() {
    let record = ClassDef::<Letters>::new("suite::OneBad")
        .constructor(Letters::default)
        .parameter_field("LETTERS", &["a", "b"])
        .parameter_setter("set", |s: &mut Letters, v: &String| s.current = v.clone())
        .test("t1", |s: &mut Letters| assert_eq!(s.current, "b"))
        .build();

    let (report, _) = run(&tree_of(record));
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.summary.passed, 1);
    assert!(report.result().is_failed());
}

#[test]
fn test_failed_class_setup_skips_parameters_but_runs_after_all() {
    let journal = Journal::default();
    let (after, body) = (journal.clone(), journal.clone());
    let record = ClassDef::<Letters>::new("suite::NoDatabase")
        .constructor(Letters::default)
        .parameter_field("LETTERS", &["a", "b"])
        .parameter_setter("set", |s: &mut Letters, v: &String| s.current = v.clone())
        .before_all("connect", || -> Result<(), String> { Err("database unreachable".into()) })
        .after_all("disconnect", move || after.note("after_all"))
        .test("t1", move |_: &mut Letters| body.note("t1"))
        .build();

    let (report, _) = run(&tree_of(record));
    assert_eq!(journal.entries(), vec!["after_all"]);
    assert_eq!(report.summary.skipped, 2);
    assert!(!report.is_success());
}

#[test]
fn test_failed_class_setup_reports_skipped_methods() {
    let record = ClassDef::<Letters>::new("suite::NoDatabase")
        .constructor(Letters::default)
        .parameter_field("LETTERS", &["a"])
        .parameter_setter("set", |s: &mut Letters, v: &String| s.current = v.clone())
        .before_all("connect", || -> Result<(), String> { Err("database unreachable".into()) })
        .test("t1", |_: &mut Letters| {})
        .build();

    let (_, log) = run(&tree_of(record));
    assert_eq!(
        log.events,
        vec![
            "started engine:paramtest",
            "skipped parameter:a (class setup failed)",
            "skipped method:t1 (class setup failed)",
            "finished engine:paramtest FAILED",
        ]
    );
}

#[test]
fn test_later_failure_outranks_earlier_abort() {
    let record = ClassDef::<Letters>::new("suite::Mixed")
        .constructor(Letters::default)
        .parameter_field("LETTERS", &["a"])
        .parameter_setter("set", |s: &mut Letters, v: &String| s.current = v.clone())
        .test("t1_abort", |_: &mut Letters| assume(false, "not on this machine"))
        .test("t2_fail", |_: &mut Letters| -> Result<(), String> { Err("wrong answer".into()) })
        .build();

    let (report, log) = run(&tree_of(record));
    assert_eq!(
        log.events,
        vec![
            "started engine:paramtest",
            "started parameter:a",
            "started method:t1_abort",
            "finished method:t1_abort ABORTED",
            "started method:t2_fail",
            "finished method:t2_fail FAILED",
            "finished parameter:a FAILED",
            "finished engine:paramtest FAILED",
        ]
    );

    let parameter = report.root.find(NodeKind::Parameter, "a").unwrap();
    let fault = parameter.outcome.result().and_then(ExecutionResult::fault).unwrap();
    assert_eq!(fault.message, "wrong answer");
    assert!(report.result().is_failed());
    assert_eq!(report.summary.aborted, 1);
    assert_eq!(report.summary.failed, 1);
}

#[test]
fn test_abort_stands_when_nothing_failed() {
    let record = ClassDef::<Letters>::new("suite::OnlyAborts")
        .constructor(Letters::default)
        .parameter_field("LETTERS", &["a"])
        .parameter_setter("set", |s: &mut Letters, v: &String| s.current = v.clone())
        .test("t1", |_: &mut Letters| assume(false, "first reason"))
        .test("t2", |_: &mut Letters| assume(false, "second reason"))
        .build();

    let (report, _) = run(&tree_of(record));
    let parameter = report.root.find(NodeKind::Parameter, "a").unwrap();
    let fault = parameter.outcome.result().and_then(ExecutionResult::fault).unwrap();
    assert!(parameter.outcome.result().unwrap().is_aborted());
    assert!(fault.message.contains("first reason"));
    assert!(report.is_success());
}

#[test]
fn test_abort_is_not_a_failure() {
    let record = ClassDef::<Letters>::new("suite::Assumptions")
        .constructor(Letters::default)
        .parameter_field("LETTERS", &["a", "b"])
        .parameter_setter("set", |s: &mut Letters, v: &String| s.current = v.clone())
        .test("only_b", |s: &mut Letters| assume(s.current == "b", "needs b"))
        .build();

    let (report, log) = run(&tree_of(record));
    assert!(report.is_success());
    assert_eq!(report.summary.aborted, 1);
    assert_eq!(report.summary.passed, 1);
    assert!(log.events.contains(&"finished method:only_b ABORTED".to_string()));
}

#[test]
fn test_setter_panic_fails_the_parameter() {
    let record = ClassDef::<Letters>::new("suite::PickySetter")
        .constructor(Letters::default)
        .parameter_field("LETTERS", &["a"])
        .parameter_setter("set", |_: &mut Letters, v: &String| fail(&format!("rejecting {v}")))
        .test("t1", |_: &mut Letters| {})
        .build();

    let (report, _) = run(&tree_of(record));
    let parameter = report.root.find(NodeKind::Parameter, "a").unwrap();
    let fault = parameter.outcome.result().and_then(ExecutionResult::fault).unwrap();
    assert!(fault.message.contains("rejecting a"));
    assert_eq!(report.summary.skipped, 1);
}

// ============================================================================
// Listener events
// ============================================================================

#[test]
fn test_single_class_is_collapsed_in_events() {
    let journal = Journal::default();
    let (_, log) = run(&tree_of(letters("suite::Letters", &journal).build()));

    assert!(log.of_kind(NodeKind::Class).is_empty());
    assert_eq!(
        log.events,
        vec![
            "started engine:paramtest",
            "started parameter:a",
            "started method:t1",
            "finished method:t1 PASSED",
            "finished parameter:a PASSED",
            "started parameter:b",
            "started method:t1",
            "finished method:t1 PASSED",
            "finished parameter:b PASSED",
            "finished engine:paramtest PASSED",
        ]
    );
}

#[test]
fn test_class_nodes_are_reported_when_there_are_siblings() {
    let journal = Journal::default();
    let pool = CandidatePool::new()
        .with_record(letters("suite::First", &journal).build())
        .with_record(letters("suite::Second", &journal).build());
    let (_, log) = run(&discover(&pool).unwrap());

    assert_eq!(
        log.of_kind(NodeKind::Class),
        vec![
            "started class:suite::First",
            "finished class:suite::First PASSED",
            "started class:suite::Second",
            "finished class:suite::Second PASSED",
        ]
    );
}

#[test]
fn test_full_policy_reports_lone_class() {
    let journal = Journal::default();
    let tree = tree_of(letters("suite::Letters", &journal).build());
    let mut log = EventLog::new();
    let config = RunConfig::new().with_notify(NotifyPolicy::Full);
    StagedExecutor::new(&config).execute(&tree, &mut log);
    assert_eq!(log.of_kind(NodeKind::Class).len(), 2);
}

#[test]
fn test_every_reported_node_starts_and_finishes_once() {
    let journal = Journal::default();
    let t2 = journal.clone();
    let record = letters("suite::Letters", &journal)
        .test("t2", move |s: &mut Letters| t2.note(format!("{}:t2", s.current)))
        .build();
    let (_, log) = run(&tree_of(record));

    let started = log.events.iter().filter(|e| e.starts_with("started ")).count();
    let finished = log.events.iter().filter(|e| e.starts_with("finished ")).count();
    // root + 2 parameters + 4 methods
    assert_eq!(started, 7);
    assert_eq!(finished, 7);
}
