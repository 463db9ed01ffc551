//! Manager tuning knobs (§6 "Tuning").
//!
//! A plain struct of tunables, in the teacher's style (`EspressoConfig`):
//! no config file, no environment variables, just a `Default` impl and
//! setters reachable through the manager.

/// Tuning parameters for a [`crate::manager::Manager`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManagerConfig {
    /// Size of the main node-pool slab.
    pub main_pool_size: usize,
    /// Size of each overflow slab appended once the main slab is exhausted.
    pub overflow_pool_size: usize,
    /// GC runs (and the pool grows) when the reclaimed share would fall
    /// below `gc_ratio * main_pool_size` (§4.4.3).
    pub gc_ratio: f64,
    /// Apply cache capacity as a multiple of the live node count (§4.3).
    pub cache_ratio: f64,
    /// When set, GC and sifting are deferred to the end of the enclosing
    /// public call instead of running inline (§4.4.3, §4.4.5).
    pub auto_reorder: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        ManagerConfig {
            main_pool_size: 1024,
            overflow_pool_size: 512,
            gc_ratio: 0.1,
            cache_ratio: 1.0,
            auto_reorder: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_ratios() {
        let cfg = ManagerConfig::default();
        assert!(cfg.gc_ratio > 0.0 && cfg.gc_ratio < 1.0);
        assert!(!cfg.auto_reorder);
    }
}
