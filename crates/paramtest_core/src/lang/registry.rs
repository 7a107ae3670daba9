//! Shareable metadata for `paramtest_core::lang` registries.
//!
//! Every vocabulary table carries the same small set of facts per item: a stable id, accepted spellings, a
//! description, and provenance. The types here are `Copy` so the registries can live in `const` tables.

/// Identify the release a vocabulary item is available since, as `(major, minor)`.
///
/// ## Examples
/// ```rust
/// use paramtest_core::lang::registry::Since;
///
/// assert_eq!(Since(0, 1).to_string(), "0.1");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Since(pub u16, pub u16);

impl std::fmt::Display for Since {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.0, self.1)
    }
}

/// Describe the lifecycle status of a vocabulary item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stability {
    Stable,
    Draft,
    Deprecated,
}

/// Shared metadata shape for “registry-first” vocabulary items.
///
/// Registries that need extra per-item data (receiver kind, target, ...) wrap this struct in their own info
/// type.
///
/// ## Notes
/// - `description` is mandatory to keep generated docs and diagnostics consistent.
#[derive(Debug, Clone, Copy)]
pub struct LangItemInfo<Id> {
    pub id: Id,
    pub canonical: &'static str,
    pub aliases: &'static [&'static str],
    pub description: &'static str,
    pub since: Since,
    pub stability: Stability,
}

impl<Id> LangItemInfo<Id> {
    /// Return `true` if `spelling` is the canonical spelling or one of the aliases.
    pub fn accepts(&self, spelling: &str) -> bool {
        self.canonical == spelling || self.aliases.contains(&spelling)
    }
}
