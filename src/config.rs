//! VM configuration.

/// Default limit on nested calls.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 256;

/// Settings a [`SpyVm`](crate::SpyVm) is created with.
///
/// ```ignore
/// let config = VmConfig::default()
///     .with_fold_blue_calls(false)
///     .with_max_call_depth(64);
/// let vm = SpyVm::new(config)?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmConfig {
    /// Memoize operator resolutions in the registry.
    pub cache_opimpls: bool,
    /// Evaluate blue calls while compiling red functions.
    pub fold_blue_calls: bool,
    /// Calls nested deeper than this fail with a stack overflow.
    pub max_call_depth: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            cache_opimpls: true,
            fold_blue_calls: true,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

impl VmConfig {
    pub fn with_cache_opimpls(mut self, enabled: bool) -> Self {
        self.cache_opimpls = enabled;
        self
    }

    pub fn with_fold_blue_calls(mut self, enabled: bool) -> Self {
        self.fold_blue_calls = enabled;
        self
    }

    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = VmConfig::default();
        assert!(config.cache_opimpls);
        assert!(config.fold_blue_calls);
        assert_eq!(config.max_call_depth, DEFAULT_MAX_CALL_DEPTH);
    }

    #[test]
    fn setters_chain() {
        let config = VmConfig::default()
            .with_cache_opimpls(false)
            .with_max_call_depth(8);
        assert!(!config.cache_opimpls);
        assert!(config.fold_blue_calls);
        assert_eq!(config.max_call_depth, 8);
    }
}
