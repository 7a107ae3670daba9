//! paramtest vocabulary registries.
//!
//! This module is the “front door” for declaration vocabulary: lifecycle categories and the attribute markers
//! that select them.
//!
//! The design goal is to avoid stringly-typed checks scattered across the engine and the macro. Callers work
//! with **stable IDs** (e.g. `LifecycleCategory`, `MarkerId`) and look up spellings/metadata via registry
//! tables.
//!
//! ## Examples
//! ```rust
//! use paramtest_core::lang::markers::{self, MarkerId};
//!
//! assert_eq!(markers::from_str("before_each"), Some(MarkerId::BeforeEach));
//! assert_eq!(markers::as_str(MarkerId::BeforeEach), "before_each");
//! ```

pub mod lifecycle;
pub mod markers;
pub mod registry;
