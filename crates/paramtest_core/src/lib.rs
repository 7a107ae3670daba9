//! Provide the shared vocabulary of the paramtest engine: lifecycle categories, declaration markers, and the
//! user-facing messages both the engine and the `#[test_class]` macro agree on.
//!
//! This crate is intentionally small and dependency-free. It is consumed by:
//! - the engine (`paramtest`), which uses the lifecycle table to decide eligibility and ordering, and
//! - the attribute macro (`paramtest_derive`), which uses the marker table to recognize attribute spellings.
//!
//! ## Notes
//!
//! - This is a “vocabulary core” crate: **no IO**, no global state, and no engine types.
//! - Callers work with stable IDs (`LifecycleCategory`, `MarkerId`) and look spellings/metadata up in the
//!   registry tables instead of comparing strings ad hoc.

pub mod errors;
pub mod lang;

pub use lang::lifecycle::{LifecycleCategory, Phase, Receiver, Scope};
pub use lang::markers::{MarkerId, MarkerTarget};
