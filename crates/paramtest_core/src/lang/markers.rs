//! Declaration marker vocabulary registry.
//!
//! This module centralizes the attribute spellings recognized by `#[test_class]` so the macro and the docs
//! don't need stringly-typed comparisons. Lifecycle markers map onto [`LifecycleCategory`]; the remaining
//! markers describe the parameter plumbing and the class/method modifiers.

use super::lifecycle::{self, LifecycleCategory};
use super::registry::{LangItemInfo, Since, Stability};

/// Stable identifier for supported markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerId {
    BeforeAll,
    AfterAll,
    BeforeParameter,
    AfterParameter,
    BeforeEach,
    Test,
    AfterEach,
    ParameterSource,
    ParameterSetter,
    Order,
    DisplayName,
    Disabled,
    BaseClass,
    Tag,
}

/// Where a marker may be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerTarget {
    /// Only as an argument of `#[test_class(...)]`.
    Class,
    /// Only on an item inside the annotated `impl` block.
    Method,
    /// In both places.
    Both,
}

/// Named argument for `#[test_class(extends = Path)]`.
pub const EXTENDS_ARG: &str = "extends";

/// Named argument for `#[test_class(via = field)]`.
pub const VIA_ARG: &str = "via";

/// Named argument for `#[test_class(name = "...")]`.
pub const NAME_ARG: &str = "name";

/// Named argument for `#[test_class(constructor = path)]`.
pub const CONSTRUCTOR_ARG: &str = "constructor";

/// Metadata entry for a marker.
#[derive(Debug, Clone, Copy)]
pub struct MarkerInfo {
    pub item: LangItemInfo<MarkerId>,
    pub target: MarkerTarget,
}

/// Registry of supported markers.
pub const MARKERS: &[MarkerInfo] = &[
    lifecycle_marker(MarkerId::BeforeAll, LifecycleCategory::ClassSetup),
    lifecycle_marker(MarkerId::AfterAll, LifecycleCategory::ClassTeardown),
    lifecycle_marker(MarkerId::BeforeParameter, LifecycleCategory::ParameterSetup),
    lifecycle_marker(MarkerId::AfterParameter, LifecycleCategory::ParameterTeardown),
    lifecycle_marker(MarkerId::BeforeEach, LifecycleCategory::MethodSetup),
    lifecycle_marker(MarkerId::Test, LifecycleCategory::Test),
    lifecycle_marker(MarkerId::AfterEach, LifecycleCategory::MethodTeardown),
    info(
        MarkerId::ParameterSource,
        "parameter_source",
        &["arguments"],
        "Declare the class's single parameter source: a const slice or a zero-argument function.",
        MarkerTarget::Method,
    ),
    info(
        MarkerId::ParameterSetter,
        "parameter_setter",
        &[],
        "Declare the method that receives each parameter value.",
        MarkerTarget::Method,
    ),
    info(
        MarkerId::Order,
        "order",
        &[],
        "Explicit ordering among methods of one category on one class (ascending).",
        MarkerTarget::Method,
    ),
    info(
        MarkerId::DisplayName,
        "display_name",
        &[],
        "Override the name shown in reports.",
        MarkerTarget::Both,
    ),
    info(
        MarkerId::Disabled,
        "disabled",
        &[],
        "Exclude a class or a test method from execution.",
        MarkerTarget::Both,
    ),
    info(
        MarkerId::BaseClass,
        "base",
        &[],
        "Mark a class as inheritable only; it is never run directly.",
        MarkerTarget::Class,
    ),
    info(
        MarkerId::Tag,
        "tag",
        &[],
        "Attach a free-text classification usable by selection filters.",
        MarkerTarget::Class,
    ),
];

/// Resolve a marker name to its stable id.
pub fn from_str(name: &str) -> Option<MarkerId> {
    if let Some(info) = MARKERS.iter().find(|m| m.item.canonical == name) {
        return Some(info.item.id);
    }
    MARKERS
        .iter()
        .find(|m| {
            let aliases: &[&str] = m.item.aliases;
            aliases.contains(&name)
        })
        .map(|m| m.item.id)
}

/// Return the canonical spelling for a marker.
pub fn as_str(id: MarkerId) -> &'static str {
    match info_for(id) {
        Some(info) => info.item.canonical,
        None => "",
    }
}

/// Return where a marker may be written.
pub fn target(id: MarkerId) -> MarkerTarget {
    info_for(id).map_or(MarkerTarget::Method, |info| info.target)
}

/// Return the lifecycle category selected by a marker, if it is a lifecycle marker.
pub fn category(id: MarkerId) -> Option<LifecycleCategory> {
    match id {
        MarkerId::BeforeAll => Some(LifecycleCategory::ClassSetup),
        MarkerId::AfterAll => Some(LifecycleCategory::ClassTeardown),
        MarkerId::BeforeParameter => Some(LifecycleCategory::ParameterSetup),
        MarkerId::AfterParameter => Some(LifecycleCategory::ParameterTeardown),
        MarkerId::BeforeEach => Some(LifecycleCategory::MethodSetup),
        MarkerId::Test => Some(LifecycleCategory::Test),
        MarkerId::AfterEach => Some(LifecycleCategory::MethodTeardown),
        _ => None,
    }
}

/// Return the metadata entry for a marker.
pub fn info_for(id: MarkerId) -> Option<&'static MarkerInfo> {
    MARKERS.iter().find(|m| m.item.id == id)
}

const fn lifecycle_marker(id: MarkerId, category: LifecycleCategory) -> MarkerInfo {
    let source = lifecycle::CATEGORIES[lifecycle::index(category)].item;
    info(id, source.canonical, source.aliases, source.description, MarkerTarget::Method)
}

const fn info(
    id: MarkerId,
    canonical: &'static str,
    aliases: &'static [&'static str],
    description: &'static str,
    target: MarkerTarget,
) -> MarkerInfo {
    MarkerInfo {
        item: LangItemInfo {
            id,
            canonical,
            aliases,
            description,
            since: Since(0, 1),
            stability: Stability::Stable,
        },
        target,
    }
}
