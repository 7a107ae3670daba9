//! Discovery: turn a pool of candidate classes into a validated descriptor tree.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use paramtest_core::lang::lifecycle::LifecycleCategory;
use tracing::debug;

use crate::model::class::{ClassRecord, TestClass};
use crate::model::descriptor::{
    ClassNode, LifecyclePlan, MethodNode, NodeKind, ParameterNode, PruneReason, PrunedClass, ResolvedMethod, TestTree,
    UniqueId,
};

use super::errors::ConfigError;
use super::resolver::AnnotationResolver;
use super::source::{ParameterSourceValidator, ValidatedSource};

/// One explicitly selected test method.
#[derive(Debug, Clone)]
pub struct MethodSelector {
    pub class: Arc<ClassRecord>,
    pub method: String,
}

/// Candidate classes and explicitly selected methods, as gathered by the caller.
#[derive(Debug, Clone, Default)]
pub struct CandidatePool {
    classes: Vec<Arc<ClassRecord>>,
    selectors: Vec<MethodSelector>,
}

impl CandidatePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a class registered through [`TestClass`].
    pub fn with_class<C: TestClass>(mut self) -> Self {
        self.add_record(C::record());
        self
    }

    pub fn with_record(mut self, record: Arc<ClassRecord>) -> Self {
        self.add_record(record);
        self
    }

    pub fn add_record(&mut self, record: Arc<ClassRecord>) {
        self.classes.push(record);
    }

    /// Select a single test method of `class`.
    pub fn add_method(&mut self, class: Arc<ClassRecord>, method: impl Into<String>) {
        self.selectors.push(MethodSelector {
            class,
            method: method.into(),
        });
    }

    pub fn classes(&self) -> &[Arc<ClassRecord>] {
        &self.classes
    }

    pub fn selectors(&self) -> &[MethodSelector] {
        &self.selectors
    }

    pub fn find(&self, name: &str) -> Option<&Arc<ClassRecord>> {
        self.classes.iter().find(|c| c.name() == name)
    }

    pub fn len(&self) -> usize {
        self.classes.len() + self.selectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.selectors.is_empty()
    }

    /// Keep only the whole-class candidates matching `keep`.
    pub fn retain(&mut self, keep: impl Fn(&ClassRecord) -> bool) {
        self.classes.retain(|c| keep(c));
    }
}

/// A merged candidate: the record and, when only methods were selected, which ones.
struct Candidate {
    record: Arc<ClassRecord>,
    only: Option<BTreeSet<String>>,
}

/// Build the descriptor tree for `pool`.
///
/// Fails fast on the first class with a structural misdeclaration. Classes whose source yields nothing, or
/// that end up without test methods, are pruned and listed in [`TestTree::pruned`].
#[tracing::instrument(skip_all, fields(candidates = pool.len()))]
pub fn discover(pool: &CandidatePool) -> Result<TestTree, ConfigError> {
    let resolver = AnnotationResolver::new();
    let validator = ParameterSourceValidator::new(&resolver);
    let root = UniqueId::root();

    let mut classes = Vec::new();
    let mut pruned = Vec::new();
    for candidate in merge(pool).into_values() {
        let record = &candidate.record;
        if record.is_base() {
            debug!(class = record.name(), "skipping base class");
            continue;
        }
        if record.is_disabled() {
            debug!(class = record.name(), "skipping disabled class");
            continue;
        }
        if !record.has_constructor() {
            return Err(ConfigError::MissingConstructor {
                class: record.name().to_string(),
            });
        }

        let source = match validator.validate(record) {
            Ok(source) => source,
            Err(err) if err.is_class_local() => {
                pruned.push(PrunedClass {
                    name: record.name().to_string(),
                    reason: PruneReason::EmptySource,
                });
                continue;
            }
            Err(err) => return Err(err),
        };

        let tests = select_tests(&resolver, &candidate)?;
        if tests.is_empty() {
            debug!(class = record.name(), "pruning class without test methods");
            pruned.push(PrunedClass {
                name: record.name().to_string(),
                reason: PruneReason::NoTestMethods,
            });
            continue;
        }

        let plan = Arc::new(plan_for(&resolver, record, &source));
        let node = class_node(&root, record, plan, source, &tests);
        debug!(
            class = record.name(),
            parameters = node.parameters.len(),
            methods = tests.len(),
            "class discovered"
        );
        classes.push(node);
    }

    Ok(TestTree::new(classes, pruned))
}

/// Merge candidates keyed by qualified name; a whole-class selection wins over method selections.
fn merge(pool: &CandidatePool) -> BTreeMap<String, Candidate> {
    let mut merged: BTreeMap<String, Candidate> = BTreeMap::new();
    for record in pool.classes() {
        merged.insert(
            record.name().to_string(),
            Candidate {
                record: Arc::clone(record),
                only: None,
            },
        );
    }
    for selector in pool.selectors() {
        let entry = merged
            .entry(selector.class.name().to_string())
            .or_insert_with(|| Candidate {
                record: Arc::clone(&selector.class),
                only: Some(BTreeSet::new()),
            });
        if let Some(only) = entry.only.as_mut() {
            only.insert(selector.method.clone());
        }
    }
    merged
}

fn select_tests(resolver: &AnnotationResolver, candidate: &Candidate) -> Result<Vec<ResolvedMethod>, ConfigError> {
    let tests = resolver.resolve(&candidate.record, LifecycleCategory::Test);
    let Some(only) = &candidate.only else {
        return Ok(tests.to_vec());
    };
    if let Some(missing) = only.iter().find(|name| !tests.iter().any(|t| &t.name == *name)) {
        return Err(ConfigError::UnknownMethod {
            class: candidate.record.name().to_string(),
            method: missing.clone(),
        });
    }
    Ok(tests.iter().filter(|t| only.contains(&t.name)).cloned().collect())
}

fn plan_for(resolver: &AnnotationResolver, record: &ClassRecord, source: &ValidatedSource) -> LifecyclePlan {
    LifecyclePlan {
        class_setup: resolver.resolve(record, LifecycleCategory::ClassSetup),
        class_teardown: resolver.resolve(record, LifecycleCategory::ClassTeardown),
        parameter_setup: resolver.resolve(record, LifecycleCategory::ParameterSetup),
        parameter_teardown: resolver.resolve(record, LifecycleCategory::ParameterTeardown),
        method_setup: resolver.resolve(record, LifecycleCategory::MethodSetup),
        method_teardown: resolver.resolve(record, LifecycleCategory::MethodTeardown),
        setter: source.setter.clone(),
    }
}

fn class_node(
    root: &UniqueId,
    record: &Arc<ClassRecord>,
    plan: Arc<LifecyclePlan>,
    source: ValidatedSource,
    tests: &[ResolvedMethod],
) -> ClassNode {
    let display_name = record.display_name().to_string();
    let id = root.append(NodeKind::Class, &display_name);

    let mut parameters: Vec<ParameterNode> = source
        .parameters
        .into_iter()
        .enumerate()
        .map(|(index, parameter)| {
            let display_name = parameter.display_name(index);
            let parameter_id = id.append(NodeKind::Parameter, &display_name);
            let methods = tests
                .iter()
                .map(|test| MethodNode {
                    id: parameter_id.append(NodeKind::Method, &test.display_name),
                    display_name: test.display_name.clone(),
                    class: Arc::clone(record),
                    parameter: parameter.clone(),
                    method: test.clone(),
                })
                .collect();
            ParameterNode {
                id: parameter_id,
                display_name,
                index,
                class: Arc::clone(record),
                parameter,
                methods,
            }
        })
        .collect();
    parameters.retain(|p| !p.methods.is_empty());

    ClassNode {
        id,
        display_name,
        record: Arc::clone(record),
        plan,
        parameters,
    }
}
