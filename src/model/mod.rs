//! Data model shared by discovery and execution.

pub mod class;
pub mod descriptor;
pub mod parameter;
pub mod result;

pub use class::{ClassDef, ClassRecord, Invoker, MethodDecl, Subject, TestClass};
pub use descriptor::{
    ClassNode, LifecyclePlan, MethodNode, NodeKind, NodeRef, ParameterNode, PrunedClass, PruneReason, ResolvedMethod,
    TestTree, UniqueId,
};
pub use parameter::{DisplayName, IntoParameter, IntoParameterSequence, Parameter};
pub use result::{ExecutionReport, ExecutionResult, Fault, IntoOutcome, NodeOutcome, NodeReport, Summary};
