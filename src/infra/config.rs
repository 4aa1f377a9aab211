use std::time::Duration;

use crate::runtime::limits::RateLimits;
use crate::runtime::pool::PoolConfig;

/// Tunables for the execution core. Defaults are suitable for tests
/// and small deployments; env overrides for embedders.
#[derive(Debug, Clone, Default)]
pub struct CoreConfig {
    pub limits: RateLimits,
    pub pool: PoolConfig,
}

impl CoreConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(n) = env_usize("DISPATCH_PER_CALLER_CONCURRENCY") {
            cfg.limits.per_caller_concurrency = n;
        }
        if let Some(n) = env_usize("DISPATCH_GLOBAL_CONCURRENCY") {
            cfg.limits.global_concurrency = Some(n);
        }
        if let Some(v) = env_f64("DISPATCH_RATE_PER_SEC") {
            cfg.limits.rate_per_sec = v;
        }
        if let Some(v) = env_f64("DISPATCH_RATE_BURST") {
            cfg.limits.rate_burst = v;
        }
        if let Some(n) = env_usize("DISPATCH_POOL_SIZE") {
            cfg.pool.workers = n;
        }
        if let Some(ms) = env_usize("DISPATCH_POOL_ACQUIRE_WAIT_MS") {
            cfg.pool.acquire_wait = Duration::from_millis(ms as u64);
        }
        if let Some(ms) = env_usize("DISPATCH_CANCEL_GRACE_MS") {
            cfg.pool.cancel_grace = Duration::from_millis(ms as u64);
        }
        cfg
    }
}

fn env_usize(name: &str) -> Option<usize> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

fn env_f64(name: &str) -> Option<f64> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn defaults_apply_without_env() {
        std::env::remove_var("DISPATCH_POOL_SIZE");
        std::env::remove_var("DISPATCH_PER_CALLER_CONCURRENCY");
        let cfg = CoreConfig::from_env();
        assert_eq!(cfg.pool.workers, 16);
        assert_eq!(cfg.limits.per_caller_concurrency, 8);
        assert!(cfg.limits.global_concurrency.is_none());
    }

    #[test]
    #[serial]
    fn parses_env_overrides() {
        std::env::set_var("DISPATCH_POOL_SIZE", "4");
        std::env::set_var("DISPATCH_PER_CALLER_CONCURRENCY", "2");
        std::env::set_var("DISPATCH_CANCEL_GRACE_MS", "25");
        let cfg = CoreConfig::from_env();
        assert_eq!(cfg.pool.workers, 4);
        assert_eq!(cfg.limits.per_caller_concurrency, 2);
        assert_eq!(cfg.pool.cancel_grace, Duration::from_millis(25));
        std::env::remove_var("DISPATCH_POOL_SIZE");
        std::env::remove_var("DISPATCH_PER_CALLER_CONCURRENCY");
        std::env::remove_var("DISPATCH_CANCEL_GRACE_MS");
    }

    #[test]
    #[serial]
    fn ignores_unparseable_values() {
        std::env::set_var("DISPATCH_POOL_SIZE", "many");
        let cfg = CoreConfig::from_env();
        assert_eq!(cfg.pool.workers, 16);
        std::env::remove_var("DISPATCH_POOL_SIZE");
    }
}
