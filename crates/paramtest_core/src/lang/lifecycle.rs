//! Define the lifecycle categories a test class can declare methods for.
//!
//! This module is the single source of truth for the seven categories: a stable identifier
//! ([`LifecycleCategory`]) plus a const metadata table ([`CATEGORIES`]) that records the marker spelling,
//! the receiver the method must take, the scope it runs in, and whether it sets up or tears down.
//!
//! ## Notes
//! - The table is metadata only. The engine's typed registration API is what makes a wrong signature a
//!   compile error; the engine still checks declarations against [`receiver`] and [`arity`] so that
//!   hand-assembled declarations cannot slip into the wrong category.
//!
//! ## Examples
//! ```rust
//! use paramtest_core::lang::lifecycle::{self, LifecycleCategory, Receiver};
//!
//! assert_eq!(lifecycle::receiver(LifecycleCategory::ClassSetup), Receiver::Static);
//! assert_eq!(lifecycle::as_str(LifecycleCategory::Test), "test");
//! ```

use super::registry::{LangItemInfo, Since, Stability};

/// Stable identifier for every lifecycle category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LifecycleCategory {
    ClassSetup,
    ClassTeardown,
    ParameterSetup,
    ParameterTeardown,
    MethodSetup,
    Test,
    MethodTeardown,
}

/// Whether a lifecycle method is called without a subject (static) or on the live subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Receiver {
    Static,
    Instance,
}

/// The tree level a lifecycle method runs at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Class,
    Parameter,
    Method,
}

/// Position of a lifecycle method relative to the scope it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Setup,
    Body,
    Teardown,
}

/// Metadata for a lifecycle category.
///
/// ## Notes
/// - `arity` counts arguments besides the receiver. Every category takes none; the parameter setter, which
///   takes one, is a marker of its own and not a lifecycle category.
#[derive(Debug, Clone, Copy)]
pub struct LifecycleInfo {
    pub item: LangItemInfo<LifecycleCategory>,
    pub receiver: Receiver,
    pub scope: Scope,
    pub phase: Phase,
    pub arity: u8,
}

/// Registry of all lifecycle categories, in execution order.
pub const CATEGORIES: &[LifecycleInfo] = &[
    info(
        LifecycleCategory::ClassSetup,
        "before_all",
        &["before_class"],
        "Run once per class before any parameter.",
        Receiver::Static,
        Scope::Class,
        Phase::Setup,
    ),
    info(
        LifecycleCategory::ParameterSetup,
        "before_parameter",
        &[],
        "Run once per parameter value, after the value was injected.",
        Receiver::Instance,
        Scope::Parameter,
        Phase::Setup,
    ),
    info(
        LifecycleCategory::MethodSetup,
        "before_each",
        &[],
        "Run before every test method.",
        Receiver::Instance,
        Scope::Method,
        Phase::Setup,
    ),
    info(
        LifecycleCategory::Test,
        "test",
        &["test_method"],
        "Declare a test method, run once per parameter value.",
        Receiver::Instance,
        Scope::Method,
        Phase::Body,
    ),
    info(
        LifecycleCategory::MethodTeardown,
        "after_each",
        &[],
        "Run after every test method, even when setup or the body failed.",
        Receiver::Instance,
        Scope::Method,
        Phase::Teardown,
    ),
    info(
        LifecycleCategory::ParameterTeardown,
        "after_parameter",
        &[],
        "Run once per parameter value after its test methods, even when its setup failed.",
        Receiver::Instance,
        Scope::Parameter,
        Phase::Teardown,
    ),
    info(
        LifecycleCategory::ClassTeardown,
        "after_all",
        &["after_class"],
        "Run once per class after every parameter, even when class setup failed.",
        Receiver::Static,
        Scope::Class,
        Phase::Teardown,
    ),
];

/// Resolve a marker spelling to its lifecycle category.
pub fn from_str(name: &str) -> Option<LifecycleCategory> {
    CATEGORIES.iter().find(|c| c.item.accepts(name)).map(|c| c.item.id)
}

/// Return the canonical marker spelling for a category.
pub fn as_str(id: LifecycleCategory) -> &'static str {
    info_for(id).item.canonical
}

/// Return the receiver a category requires.
pub fn receiver(id: LifecycleCategory) -> Receiver {
    info_for(id).receiver
}

/// Return the scope a category runs in.
pub fn scope(id: LifecycleCategory) -> Scope {
    info_for(id).scope
}

/// Return the phase of a category.
pub fn phase(id: LifecycleCategory) -> Phase {
    info_for(id).phase
}

/// Return the number of non-receiver arguments a category requires.
pub fn arity(id: LifecycleCategory) -> u8 {
    info_for(id).arity
}

/// Return `true` for categories whose hooks must all run regardless of earlier failures.
pub fn is_teardown(id: LifecycleCategory) -> bool {
    phase(id) == Phase::Teardown
}

/// Return the metadata entry for a category.
pub fn info_for(id: LifecycleCategory) -> &'static LifecycleInfo {
    &CATEGORIES[index(id)]
}

/// Return the row of a category in [`CATEGORIES`], which is also its position in execution order.
pub const fn index(id: LifecycleCategory) -> usize {
    match id {
        LifecycleCategory::ClassSetup => 0,
        LifecycleCategory::ParameterSetup => 1,
        LifecycleCategory::MethodSetup => 2,
        LifecycleCategory::Test => 3,
        LifecycleCategory::MethodTeardown => 4,
        LifecycleCategory::ParameterTeardown => 5,
        LifecycleCategory::ClassTeardown => 6,
    }
}

const fn info(
    id: LifecycleCategory,
    canonical: &'static str,
    aliases: &'static [&'static str],
    description: &'static str,
    receiver: Receiver,
    scope: Scope,
    phase: Phase,
) -> LifecycleInfo {
    LifecycleInfo {
        item: LangItemInfo {
            id,
            canonical,
            aliases,
            description,
            since: Since(0, 1),
            stability: Stability::Stable,
        },
        receiver,
        scope,
        phase,
        arity: 0,
    }
}
