//! Service configuration from the environment.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `IBKIT_CACHE_TTL_SECS` | `300` | Lifetime of a cached levels response |
//! | `IBKIT_RATE_LIMIT` | `60` | Requests allowed per window and client |
//! | `IBKIT_RATE_WINDOW_SECS` | `60` | Rate limit window length |

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::rate_limit::{DEFAULT_RATE_LIMIT, DEFAULT_RATE_WINDOW};

pub const CACHE_TTL_ENV: &str = "IBKIT_CACHE_TTL_SECS";
pub const RATE_LIMIT_ENV: &str = "IBKIT_RATE_LIMIT";
pub const RATE_WINDOW_ENV: &str = "IBKIT_RATE_WINDOW_SECS";

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceConfig {
    pub cache_ttl: Duration,
    pub rate_limit: u32,
    pub rate_window: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            rate_limit: DEFAULT_RATE_LIMIT,
            rate_window: DEFAULT_RATE_WINDOW,
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Unset, empty or unparsable
    /// values fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let cache_ttl = parse_var::<u64, _>(&lookup, CACHE_TTL_ENV)
            .map_or(defaults.cache_ttl, Duration::from_secs);
        let rate_limit =
            parse_var::<u32, _>(&lookup, RATE_LIMIT_ENV).unwrap_or(defaults.rate_limit);
        let rate_window = parse_var::<u64, _>(&lookup, RATE_WINDOW_ENV)
            .filter(|secs| *secs > 0)
            .map_or(defaults.rate_window, Duration::from_secs);

        Self {
            cache_ttl,
            rate_limit,
            rate_window,
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = key, value = raw, "ignoring unparsable configuration value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = ServiceConfig::from_lookup(lookup(&[]));
        assert_eq!(config, ServiceConfig::default());
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.rate_limit, 60);
    }

    #[test]
    fn reads_overrides() {
        let config = ServiceConfig::from_lookup(lookup(&[
            (CACHE_TTL_ENV, "0"),
            (RATE_LIMIT_ENV, "5"),
            (RATE_WINDOW_ENV, " 10 "),
        ]));
        assert_eq!(config.cache_ttl, Duration::ZERO);
        assert_eq!(config.rate_limit, 5);
        assert_eq!(config.rate_window, Duration::from_secs(10));
    }

    #[test]
    fn ignores_garbage_and_zero_windows() {
        let config = ServiceConfig::from_lookup(lookup(&[
            (RATE_LIMIT_ENV, "lots"),
            (RATE_WINDOW_ENV, "0"),
        ]));
        assert_eq!(config.rate_limit, DEFAULT_RATE_LIMIT);
        assert_eq!(config.rate_window, DEFAULT_RATE_WINDOW);
    }
}
