//! Narrowing a candidate pool before discovery.

use std::sync::Arc;

use paramtest_core::lang::lifecycle::LifecycleCategory;
use tracing::debug;

use crate::engine::discovery::CandidatePool;
use crate::engine::errors::ConfigError;
use crate::engine::resolver::AnnotationResolver;
use crate::model::class::ClassRecord;

/// Filters gathered from the command line.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Substring matched against `Class` and `Class::method`
    pub keyword: Option<String>,
    /// Keep classes carrying at least one of these tags
    pub tags: Vec<String>,
    /// Drop classes carrying any of these tags
    pub exclude_tags: Vec<String>,
    /// Explicit `Class::method` selections; when present they replace every other filter
    pub selectors: Vec<String>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.keyword.is_none() && self.tags.is_empty() && self.exclude_tags.is_empty() && self.selectors.is_empty()
    }

    pub fn apply(&self, pool: CandidatePool) -> Result<CandidatePool, ConfigError> {
        if !self.selectors.is_empty() {
            return self.select_methods(&pool);
        }

        let mut pool = pool;
        pool.retain(|class| self.tags_match(class));
        if let Some(keyword) = self.keyword.as_deref() {
            pool = filter_keyword(pool, keyword);
        }
        Ok(pool)
    }

    fn tags_match(&self, class: &ClassRecord) -> bool {
        let has = |tag: &String| class.tags().contains(tag);
        let included = self.tags.is_empty() || self.tags.iter().any(has);
        let excluded = self.exclude_tags.iter().any(has);
        if !included || excluded {
            debug!(class = class.name(), "deselected by tag");
        }
        included && !excluded
    }

    fn select_methods(&self, pool: &CandidatePool) -> Result<CandidatePool, ConfigError> {
        let mut selected = CandidatePool::new();
        for selector in &self.selectors {
            let (record, method) = split_selector(pool, selector)?;
            match method {
                Some(method) => selected.add_method(Arc::clone(record), method),
                None => selected.add_record(Arc::clone(record)),
            }
        }
        Ok(selected)
    }
}

/// Resolve `a::b::Class` or `a::b::Class::method` against the class names in `pool`.
///
/// The whole selector is tried as a class name first, then everything before its last `::`.
fn split_selector<'p, 's>(
    pool: &'p CandidatePool,
    selector: &'s str,
) -> Result<(&'p Arc<ClassRecord>, Option<&'s str>), ConfigError> {
    if let Some(record) = pool.find(selector) {
        return Ok((record, None));
    }
    if let Some((class, method)) = selector.rsplit_once("::").filter(|(_, method)| !method.is_empty()) {
        if let Some(record) = pool.find(class) {
            return Ok((record, Some(method)));
        }
    }
    Err(ConfigError::UnknownClass {
        class: selector.to_string(),
    })
}

/// Keep classes and methods whose names contain `keyword`; explicit method selectors already in the pool
/// survive only when they match too.
fn filter_keyword(pool: CandidatePool, keyword: &str) -> CandidatePool {
    let resolver = AnnotationResolver::new();
    let mut filtered = CandidatePool::new();
    for record in pool.classes() {
        if record.name().contains(keyword) || record.display_name().contains(keyword) {
            filtered.add_record(Arc::clone(record));
            continue;
        }
        for test in resolver.resolve(record, LifecycleCategory::Test).iter() {
            let qualified = format!("{}::{}", record.name(), test.name);
            if qualified.contains(keyword) || test.display_name.contains(keyword) {
                filtered.add_method(Arc::clone(record), test.name.clone());
            }
        }
    }
    for selector in pool.selectors() {
        let qualified = format!("{}::{}", selector.class.name(), selector.method);
        if qualified.contains(keyword) {
            filtered.add_method(Arc::clone(&selector.class), selector.method.clone());
        }
    }
    filtered
}
