//! Run configuration shared by the executor and the launcher.

use crate::engine::listener::NotifyPolicy;

/// Environment variable that disables coloured output when set to any non-empty value.
pub const NO_COLOR_ENV: &str = "NO_COLOR";
/// Environment variable that disables backtrace capture when set to `0`.
pub const BACKTRACE_ENV: &str = "PARAMTEST_BACKTRACE";

/// Output format of the launcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Coloured, human-readable lines
    #[default]
    Console,
    /// One JSON object per event
    Json,
}

/// Run configuration
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Print every node instead of one status character per method
    pub verbose: bool,
    /// Use ANSI colours in console output
    pub color: bool,
    /// Which nodes the listener hears about
    pub notify: NotifyPolicy,
    /// Capture a backtrace when user code panics
    pub capture_backtrace: bool,
    /// Maximum number of user frames kept in a failure trace
    pub trace_depth: usize,
    /// Flush stdout/stderr after every invocation
    pub flush_output: bool,
    pub format: OutputFormat,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            color: true,
            notify: NotifyPolicy::Collapsed,
            capture_backtrace: true,
            trace_depth: 12,
            flush_output: true,
            format: OutputFormat::Console,
        }
    }
}

impl RunConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults adjusted by the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults adjusted by an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if lookup(NO_COLOR_ENV).is_some_and(|v| !v.is_empty()) {
            config.color = false;
        }
        if lookup(BACKTRACE_ENV).is_some_and(|v| v.trim() == "0") {
            config.capture_backtrace = false;
        }
        config
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn with_notify(mut self, notify: NotifyPolicy) -> Self {
        self.notify = notify;
        self
    }

    pub fn with_capture_backtrace(mut self, capture: bool) -> Self {
        self.capture_backtrace = capture;
        self
    }

    pub fn with_trace_depth(mut self, depth: usize) -> Self {
        self.trace_depth = depth;
        self
    }

    pub fn with_flush_output(mut self, flush: bool) -> Self {
        self.flush_output = flush;
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    // ========================================
    // Defaults
    // ========================================

    #[test]
    fn test_default_trace_depth() {
        assert_eq!(RunConfig::default().trace_depth, 12);
    }

    #[test]
    fn test_default_notify_policy_is_collapsed() {
        assert_eq!(RunConfig::default().notify, NotifyPolicy::Collapsed);
    }

    #[test]
    fn test_default_flushes_and_captures() {
        let config = RunConfig::default();
        assert!(config.flush_output);
        assert!(config.capture_backtrace);
        assert!(config.color);
        assert_eq!(config.format, OutputFormat::Console);
    }

    // ========================================
    // Environment
    // ========================================

    #[test]
    fn test_no_color_disables_color() {
        assert!(!RunConfig::from_lookup(lookup(&[("NO_COLOR", "1")])).color);
        assert!(RunConfig::from_lookup(lookup(&[("NO_COLOR", "")])).color);
    }

    #[test]
    fn test_backtrace_zero_disables_capture() {
        assert!(!RunConfig::from_lookup(lookup(&[("PARAMTEST_BACKTRACE", "0")])).capture_backtrace);
        assert!(RunConfig::from_lookup(lookup(&[("PARAMTEST_BACKTRACE", "1")])).capture_backtrace);
    }

    // ========================================
    // Builder
    // ========================================

    #[test]
    fn test_builder_chain() {
        let config = RunConfig::new()
            .with_verbose(true)
            .with_notify(NotifyPolicy::Full)
            .with_trace_depth(3)
            .with_format(OutputFormat::Json);
        assert!(config.verbose);
        assert_eq!(config.notify, NotifyPolicy::Full);
        assert_eq!(config.trace_depth, 3);
        assert_eq!(config.format, OutputFormat::Json);
    }
}
