//! Engine configuration and builder.

use super::Engine;

/// Default number of allocations between automatic collections.
pub const DEFAULT_GC_THRESHOLD: usize = 1024;

/// Default limit on nested script calls.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 1024;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Allocations since the last collection that trigger the next one
    /// at a top-level entry point. 0 disables automatic collection.
    pub gc_threshold: usize,
    /// Nested call limit; `None` leaves recursion bounded only by memory.
    pub max_call_depth: Option<usize>,
    /// Separator used to split script paths into file and directory.
    pub path_separator: char,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            gc_threshold: DEFAULT_GC_THRESHOLD,
            max_call_depth: Some(DEFAULT_MAX_CALL_DEPTH),
            path_separator: '/',
        }
    }
}

/// Builder for [`Engine`].
///
/// ```ignore
/// let engine = Engine::builder()
///     .gc_threshold(256)
///     .max_call_depth(Some(200))
///     .build();
/// ```
#[derive(Clone, Debug, Default)]
pub struct EngineBuilder {
    config: EngineConfig,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn gc_threshold(mut self, threshold: usize) -> Self {
        self.config.gc_threshold = threshold;
        self
    }

    #[must_use]
    pub fn max_call_depth(mut self, depth: Option<usize>) -> Self {
        self.config.max_call_depth = depth;
        self
    }

    #[must_use]
    pub fn path_separator(mut self, separator: char) -> Self {
        self.config.path_separator = separator;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn build(self) -> Engine {
        Engine::new(self.config)
    }
}
