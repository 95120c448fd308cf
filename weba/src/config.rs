//! Environment-driven settings.

/// Environment variable holding the template cache capacity.
pub const CACHE_SIZE_VAR: &str = "WEBA_LRU_CACHE_SIZE";

/// Capacity used when [`CACHE_SIZE_VAR`] is unset, zero or not a number.
pub const DEFAULT_CACHE_SIZE: usize = 256;

/// Library settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Maximum number of parsed component templates kept by the global cache.
    pub cache_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_size: DEFAULT_CACHE_SIZE,
        }
    }
}

impl Config {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`, which maps a variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let cache_size = match lookup(CACHE_SIZE_VAR) {
            None => DEFAULT_CACHE_SIZE,
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(0) => DEFAULT_CACHE_SIZE,
                Ok(size) => size,
                Err(err) => {
                    tracing::warn!(
                        variable = CACHE_SIZE_VAR,
                        value = %raw,
                        error = %err,
                        default = DEFAULT_CACHE_SIZE,
                        "ignoring unparsable cache size"
                    );
                    DEFAULT_CACHE_SIZE
                }
            },
        };
        Self { cache_size }
    }
}
