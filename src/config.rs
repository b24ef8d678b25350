use std::env;
use std::time::Duration;

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}

fn env_duration_millis(key: &str, default_millis: u64) -> Duration {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or_else(|| Duration::from_millis(default_millis))
}

/// Runtime configuration for the stack cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Rebuild once at liftoff instead of on the first read.
    pub warm_on_start: bool,
    /// Rebuilds slower than this are logged at warn level.
    pub slow_rebuild_threshold: Duration,
}

impl CacheConfig {
    pub fn from_env() -> Self {
        Self {
            warm_on_start: env_bool("FLASHCARDS_CACHE_WARM_ON_START", true),
            slow_rebuild_threshold: env_duration_millis("FLASHCARDS_CACHE_SLOW_REBUILD_MS", 500),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            warm_on_start: true,
            slow_rebuild_threshold: Duration::from_millis(500),
        }
    }
}
