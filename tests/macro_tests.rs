//! `#[test_class]` registration, run end to end.

use std::cell::RefCell;

use paramtest::engine::listener::EventLog;
use paramtest::prelude::*;
use paramtest::{NodeKind, RunConfig, StagedExecutor, discover};

thread_local! {
    static CALLS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

fn note(entry: impl Into<String>) {
    CALLS.with(|calls| calls.borrow_mut().push(entry.into()));
}

fn take_calls() -> Vec<String> {
    CALLS.with(|calls| std::mem::take(&mut *calls.borrow_mut()))
}

// ============================================================================
// Classes
// ============================================================================

#[derive(Default)]
struct Shared {
    value: u32,
}

#[test_class(base)]
impl Shared {
    #[parameter_source]
    const VALUES: &'static [u32] = &[1, 2];

    #[parameter_setter]
    fn set(&mut self, value: &u32) {
        self.value = *value;
    }

    #[before_all]
    fn open() {
        note("open");
    }

    #[before_each]
    fn mark(&mut self) {
        note(format!("{}:before_each", self.value));
    }

    #[test]
    fn inherited(&self) {
        note(format!("{}:inherited", self.value));
    }

    #[test]
    fn overridden(&self) {
        note("base version ran");
    }
}

#[derive(Default)]
struct Child {
    shared: Shared,
}

#[test_class(extends = Shared, via = shared, tag = "child")]
impl Child {
    #[test]
    fn overridden(&self) {
        note(format!("{}:overridden", self.shared.value));
    }
}

#[derive(Default)]
struct Ordered;

#[test_class(display_name = "Ordered hooks")]
impl Ordered {
    #[parameter_source]
    fn values() -> Vec<u32> {
        vec![7]
    }

    #[parameter_setter]
    fn set(&mut self, _value: &u32) {}

    #[before_each]
    #[order(2)]
    fn alpha(&mut self) {
        note("alpha");
    }

    #[before_each]
    #[order(1)]
    fn beta(&mut self) {
        note("beta");
    }

    #[test]
    #[display_name("runs after both hooks")]
    fn check(&self) -> Result<(), String> {
        note("check");
        Ok(())
    }

    #[test]
    #[disabled]
    fn not_today(&self) {
        note("disabled test ran");
    }

    #[test]
    fn no_receiver() {
        note("static test ran");
    }

    fn helper(&self) -> u32 {
        3
    }
}

#[derive(Default)]
struct Named {
    name: String,
}

#[test_class(name = "custom::Named")]
impl Named {
    #[parameter_source]
    const NAMES: &'static [&'static str] = &["x", "y"];

    #[parameter_setter]
    fn set(&mut self, name: String) {
        self.name = name;
    }

    #[test]
    fn non_empty(&self) {
        assert!(!self.name.is_empty());
    }
}

fn run(pool: CandidatePool) -> EventLog {
    let tree = discover(&pool).unwrap();
    let mut log = EventLog::new();
    StagedExecutor::new(&RunConfig::new()).execute(&tree, &mut log);
    log
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_generated_names_and_tags() {
    let shared = Shared::record();
    assert_eq!(shared.name(), "macro_tests::Shared");
    assert!(shared.is_base());
    assert!(!shared.has_constructor());

    let child = Child::record();
    assert_eq!(child.tags(), ["child".to_string()]);
    assert_eq!(child.parent().map(|p| p.record.name()), Some("macro_tests::Shared"));

    assert_eq!(Named::record().name(), "custom::Named");
    assert_eq!(Ordered::record().display_name(), "Ordered hooks");
}

#[test]
fn test_base_is_not_run_and_child_masks_by_name() {
    take_calls();
    let pool = CandidatePool::new().with_class::<Shared>().with_class::<Child>();
    let log = run(pool);

    assert_eq!(
        take_calls(),
        vec![
            "open",
            "1:before_each",
            "1:inherited",
            "1:before_each",
            "1:overridden",
            "2:before_each",
            "2:inherited",
            "2:before_each",
            "2:overridden",
        ]
    );
    assert!(log.of_kind(NodeKind::Class).is_empty());
}

#[test]
fn test_order_display_name_and_disabled() {
    take_calls();
    let log = run(CandidatePool::new().with_class::<Ordered>());

    assert_eq!(take_calls(), vec!["beta", "alpha", "check"]);
    assert_eq!(
        log.of_kind(NodeKind::Method),
        vec![
            "started method:runs after both hooks",
            "finished method:runs after both hooks PASSED",
        ]
    );
    assert_eq!(Ordered.helper(), 3);
}

#[test]
fn test_by_value_setter_receives_string_payloads() {
    let log = run(CandidatePool::new().with_class::<Named>());
    assert_eq!(
        log.of_kind(NodeKind::Parameter),
        vec![
            "started parameter:x",
            "finished parameter:x PASSED",
            "started parameter:y",
            "finished parameter:y PASSED",
        ]
    );
}
