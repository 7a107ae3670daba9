//! The descriptor tree: root → class → parameter → method.
//!
//! Nodes are built once by discovery and never mutated afterwards. Every node carries a [`UniqueId`] made
//! of its ancestors' segments plus its own, so sibling nodes may share a display name.

use std::fmt;
use std::sync::Arc;

use paramtest_core::lang::lifecycle::LifecycleCategory;
use uuid::Uuid;

use super::class::{ClassRecord, Invoker, SetterDecl};
use super::parameter::Parameter;

/// Root segment shared by every identifier.
pub const ROOT_SEGMENT: &str = "[engine:paramtest]";
pub const ROOT_DISPLAY_NAME: &str = "paramtest";

/// Level of a node in the descriptor tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Root,
    Class,
    Parameter,
    Method,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Root => "engine",
            NodeKind::Class => "class",
            NodeKind::Parameter => "parameter",
            NodeKind::Method => "method",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hierarchical node identifier: `[engine:paramtest]/[class:Name#token]/...`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UniqueId {
    segments: Vec<String>,
}

impl UniqueId {
    pub fn root() -> Self {
        Self {
            segments: vec![ROOT_SEGMENT.to_string()],
        }
    }

    /// Child identifier with a fresh random disambiguator.
    pub fn append(&self, kind: NodeKind, display_name: &str) -> Self {
        let token = Uuid::new_v4().simple().to_string();
        self.append_with_token(kind, display_name, &token)
    }

    pub fn append_with_token(&self, kind: NodeKind, display_name: &str, token: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(format!("[{kind}:{display_name}#{token}]"));
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn depth(&self) -> usize {
        self.segments.len() - 1
    }

    pub fn parent(&self) -> Option<UniqueId> {
        (self.segments.len() > 1).then(|| Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// `true` if `other` lives strictly below this identifier.
    pub fn is_ancestor_of(&self, other: &UniqueId) -> bool {
        other.segments.len() > self.segments.len() && other.segments.starts_with(&self.segments)
    }
}

impl fmt::Display for UniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

/// A lifecycle method after resolution: masked, ordered, and lifted onto the class's subject.
#[derive(Debug, Clone)]
pub struct ResolvedMethod {
    pub name: String,
    pub display_name: String,
    pub category: LifecycleCategory,
    pub order: Option<i32>,
    /// Qualified name of the class that declared it.
    pub declared_in: String,
    /// 0 for the class itself, 1 for its parent, and so on.
    pub depth: usize,
    pub invoker: Invoker,
}

/// Resolved hooks and the setter for one class, shared by all of its nodes.
#[derive(Debug, Clone)]
pub struct LifecyclePlan {
    pub class_setup: Arc<[ResolvedMethod]>,
    pub class_teardown: Arc<[ResolvedMethod]>,
    pub parameter_setup: Arc<[ResolvedMethod]>,
    pub parameter_teardown: Arc<[ResolvedMethod]>,
    pub method_setup: Arc<[ResolvedMethod]>,
    pub method_teardown: Arc<[ResolvedMethod]>,
    pub setter: SetterDecl,
}

impl LifecyclePlan {
    /// Hooks of a non-test category; tests live on the method nodes.
    pub fn hooks(&self, category: LifecycleCategory) -> &[ResolvedMethod] {
        match category {
            LifecycleCategory::ClassSetup => &self.class_setup,
            LifecycleCategory::ClassTeardown => &self.class_teardown,
            LifecycleCategory::ParameterSetup => &self.parameter_setup,
            LifecycleCategory::ParameterTeardown => &self.parameter_teardown,
            LifecycleCategory::MethodSetup => &self.method_setup,
            LifecycleCategory::MethodTeardown => &self.method_teardown,
            LifecycleCategory::Test => &[],
        }
    }
}

/// Why a candidate class did not make it into the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PruneReason {
    EmptySource,
    NoTestMethods,
}

impl fmt::Display for PruneReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PruneReason::EmptySource => f.write_str(paramtest_core::errors::SUPPLIER_EMPTY),
            PruneReason::NoTestMethods => f.write_str("no eligible test methods"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrunedClass {
    pub name: String,
    pub reason: PruneReason,
}

/// The immutable result of discovery.
#[derive(Debug, Clone)]
pub struct TestTree {
    pub id: UniqueId,
    pub display_name: String,
    pub classes: Vec<ClassNode>,
    pub pruned: Vec<PrunedClass>,
}

impl TestTree {
    pub fn new(classes: Vec<ClassNode>, pruned: Vec<PrunedClass>) -> Self {
        Self {
            id: UniqueId::root(),
            display_name: ROOT_DISPLAY_NAME.to_string(),
            classes,
            pruned,
        }
    }

    pub fn classes(&self) -> &[ClassNode] {
        &self.classes
    }

    pub fn pruned(&self) -> &[PrunedClass] {
        &self.pruned
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn class(&self, name: &str) -> Option<&ClassNode> {
        self.classes.iter().find(|c| c.record.name() == name)
    }

    pub fn parameter_count(&self) -> usize {
        self.classes.iter().map(|c| c.parameters.len()).sum()
    }

    pub fn method_count(&self) -> usize {
        self.classes
            .iter()
            .flat_map(|c| &c.parameters)
            .map(|p| p.methods.len())
            .sum()
    }
}

#[derive(Debug, Clone)]
pub struct ClassNode {
    pub id: UniqueId,
    pub display_name: String,
    pub record: Arc<ClassRecord>,
    pub plan: Arc<LifecyclePlan>,
    pub parameters: Vec<ParameterNode>,
}

#[derive(Debug, Clone)]
pub struct ParameterNode {
    pub id: UniqueId,
    pub display_name: String,
    /// Position in the supplier sequence.
    pub index: usize,
    pub class: Arc<ClassRecord>,
    pub parameter: Parameter,
    pub methods: Vec<MethodNode>,
}

#[derive(Debug, Clone)]
pub struct MethodNode {
    pub id: UniqueId,
    pub display_name: String,
    pub class: Arc<ClassRecord>,
    pub parameter: Parameter,
    pub method: ResolvedMethod,
}

/// Borrowed view of any node, handed to listeners.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Root(&'a TestTree),
    Class(&'a ClassNode),
    Parameter(&'a ParameterNode),
    Method(&'a MethodNode),
}

impl<'a> NodeRef<'a> {
    pub fn id(&self) -> &'a UniqueId {
        match *self {
            NodeRef::Root(n) => &n.id,
            NodeRef::Class(n) => &n.id,
            NodeRef::Parameter(n) => &n.id,
            NodeRef::Method(n) => &n.id,
        }
    }

    pub fn display_name(&self) -> &'a str {
        match *self {
            NodeRef::Root(n) => &n.display_name,
            NodeRef::Class(n) => &n.display_name,
            NodeRef::Parameter(n) => &n.display_name,
            NodeRef::Method(n) => &n.display_name,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            NodeRef::Root(_) => NodeKind::Root,
            NodeRef::Class(_) => NodeKind::Class,
            NodeRef::Parameter(_) => NodeKind::Parameter,
            NodeRef::Method(_) => NodeKind::Method,
        }
    }
}
