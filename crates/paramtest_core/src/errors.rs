//! Shared user-facing messages used by the engine, the reporters, and the macro.
//!
//! Keeping them here means a skip reason printed by the console reporter and the one asserted in tests can
//! never drift apart.

/// Reason attached to method nodes that were not executed because their parameter's setup scope failed.
pub const PARAMETER_SETUP_FAILED: &str = "parameter setup failed";

/// Reason attached to parameter nodes that were not executed because their class's setup scope failed.
pub const CLASS_SETUP_FAILED: &str = "class setup failed";

/// Message used when a parameter source yields no values.
pub const SUPPLIER_EMPTY: &str = "supplier stream is empty";

/// Message used when a class declares no parameter source at all.
pub const SUPPLIER_MISSING: &str = "supplier missing";

/// Message used when an instance hook runs without a live test subject.
pub const NO_LIVE_SUBJECT: &str = "no live test subject";

/// Build the display name synthesized for a parameter value whose labels are all empty.
///
/// ## Examples
/// ```rust
/// assert_eq!(paramtest_core::errors::empty_display_name(3), "[3] (empty)");
/// ```
pub fn empty_display_name(index: usize) -> String {
    format!("[{index}] (empty)")
}
