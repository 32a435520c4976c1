use std::time::Duration;

/// Undo stack capacity used when none is stored.
pub const DEFAULT_MAX_STACK_SIZE: usize = 100;

/// Persisted undo payloads above this size are discarded on load.
pub const SIZE_GUARD_BYTES: usize = 1024 * 1024;

/// When consecutive keystrokes merge into one typing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoalesceConfig {
    /// Longest pause between keystrokes that still extends a run.
    pub idle_timeout: Duration,
    /// Runs are closed once they reach this many characters.
    pub max_run_chars: usize,
}

impl Default for CoalesceConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(1),
            max_run_chars: 4096,
        }
    }
}

/// Limits for one document's undo engine and its persisted history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub max_stack_size: usize,
    pub coalesce: CoalesceConfig,
    pub size_guard: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_stack_size: DEFAULT_MAX_STACK_SIZE,
            coalesce: CoalesceConfig::default(),
            size_guard: SIZE_GUARD_BYTES,
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn with_max_stack_size(mut self, max_stack_size: usize) -> Self {
        self.max_stack_size = max_stack_size;
        self
    }

    #[must_use]
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.coalesce.idle_timeout = idle_timeout;
        self
    }
}
