//! Lifecycle method resolution.
//!
//! For a class and a [`LifecycleCategory`] the resolver walks the class and its ancestors bottom-up, keeps
//! the declarations that fit the category, drops every ancestor declaration whose name a more specific level
//! already declares, and orders what remains. Results are memoized per `(class, category)` for the lifetime
//! of the resolver, which discovery creates fresh for every pass.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use paramtest_core::lang::lifecycle::{self, LifecycleCategory};
use tracing::{debug, warn};

use crate::model::class::{ClassRecord, Level, MethodDecl, SetterDecl, SourceDecl};
use crate::model::descriptor::ResolvedMethod;

type CacheKey = (String, LifecycleCategory);

/// Memoizing resolver for lifecycle methods, sources, and setters.
#[derive(Default)]
pub struct AnnotationResolver {
    cache: Mutex<HashMap<CacheKey, Arc<[ResolvedMethod]>>>,
}

/// A source or setter that survived masking, with the class that declared it.
#[derive(Debug, Clone)]
pub struct Visible<T> {
    pub decl: T,
    pub declared_in: String,
}

impl AnnotationResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ordered, de-duplicated methods of `category` for `class`.
    ///
    /// Calling this twice for the same class and category returns the same allocation.
    pub fn resolve(&self, class: &ClassRecord, category: LifecycleCategory) -> Arc<[ResolvedMethod]> {
        let key = (class.name().to_string(), category);
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(hit) = cache.get(&key) {
            return Arc::clone(hit);
        }
        let resolved: Arc<[ResolvedMethod]> = compute(class, category).into();
        debug!(
            class = class.name(),
            category = lifecycle::as_str(category),
            count = resolved.len(),
            "resolved lifecycle methods"
        );
        cache.insert(key, Arc::clone(&resolved));
        resolved
    }

    /// Number of memoized `(class, category)` entries.
    pub fn cached_entries(&self) -> usize {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Parameter sources visible on `class` after masking, most specific first.
    pub fn sources(&self, class: &ClassRecord) -> Vec<Visible<SourceDecl>> {
        visible(class, |level| {
            level
                .record
                .sources()
                .iter()
                .map(|s| (s.name.as_str(), s.clone()))
                .collect()
        })
    }

    /// Parameter setters visible on `class` after masking, lifted onto the class's subject.
    pub fn setters(&self, class: &ClassRecord) -> Vec<Visible<SetterDecl>> {
        visible(class, |level| {
            level
                .record
                .setters()
                .iter()
                .map(|s| {
                    let decl = match &level.projection {
                        Some(projection) => s.lift(projection),
                        None => s.clone(),
                    };
                    (s.name.as_str(), decl)
                })
                .collect()
        })
    }
}

fn visible<'a, T>(class: &'a ClassRecord, declared: impl Fn(&Level<'a>) -> Vec<(&'a str, T)>) -> Vec<Visible<T>> {
    let mut masked: HashSet<&'a str> = HashSet::new();
    let mut out = Vec::new();
    for level in class.levels() {
        for (name, decl) in declared(&level) {
            if !masked.contains(name) {
                out.push(Visible {
                    decl,
                    declared_in: level.record.name().to_string(),
                });
            }
        }
        masked.extend(level.record.declared_names());
    }
    out
}

fn compute(class: &ClassRecord, category: LifecycleCategory) -> Vec<ResolvedMethod> {
    let mut masked: HashSet<&str> = HashSet::new();
    let mut per_level: Vec<Vec<ResolvedMethod>> = Vec::new();

    for level in class.levels() {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut own: Vec<&MethodDecl> = level
            .record
            .declarations()
            .iter()
            .filter(|d| d.category == category)
            .filter(|d| !masked.contains(d.name.as_str()))
            .filter(|d| seen.insert(d.name.as_str()))
            .filter(|d| is_eligible(level.record, d))
            .filter(|d| {
                if d.disabled {
                    debug!(class = level.record.name(), method = %d.name, "method disabled");
                }
                !d.disabled
            })
            .collect();
        own.sort_by(|a, b| order_key(a).cmp(&order_key(b)));

        per_level.push(own.into_iter().map(|d| lift(&level, d)).collect());
        masked.extend(level.record.declared_names());
    }

    // Setup and test categories run ancestors first; teardown mirrors that.
    if !lifecycle::is_teardown(category) {
        per_level.reverse();
    }
    per_level.into_iter().flatten().collect()
}

/// Explicit order ascending, unordered last, then by name.
fn order_key(decl: &MethodDecl) -> (bool, i32, &str) {
    (decl.order.is_none(), decl.order.unwrap_or_default(), decl.name.as_str())
}

fn is_eligible(record: &ClassRecord, decl: &MethodDecl) -> bool {
    let receiver = lifecycle::receiver(decl.category);
    let arity = lifecycle::arity(decl.category);
    let eligible = decl.invoker.receiver() == receiver && decl.arity == arity;
    if !eligible {
        warn!(
            class = record.name(),
            method = %decl.name,
            category = lifecycle::as_str(decl.category),
            expected_receiver = ?receiver,
            found_receiver = ?decl.invoker.receiver(),
            "ignoring ineligible lifecycle declaration"
        );
    }
    eligible
}

fn lift(level: &Level<'_>, decl: &MethodDecl) -> ResolvedMethod {
    let invoker = match &level.projection {
        Some(projection) => decl.invoker.lift(projection),
        None => decl.invoker.clone(),
    };
    ResolvedMethod {
        name: decl.name.clone(),
        display_name: decl.display_name.clone().unwrap_or_else(|| decl.name.clone()),
        category: decl.category,
        order: decl.order,
        declared_in: level.record.name().to_string(),
        depth: level.depth,
        invoker,
    }
}
