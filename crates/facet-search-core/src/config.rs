//! Engine configuration
//!
//! Loaded from environment variables with per-field fallbacks. Values that do
//! not parse (or parse to zero where zero is meaningless) keep the default.

use serde::{Deserialize, Serialize};

/// Environment variable bounding the number of query characters parsed.
pub const MAX_QUERY_CHARS_ENV: &str = "FACET_SEARCH_MAX_QUERY_CHARS";
/// Default query length bound.
pub const DEFAULT_MAX_QUERY_CHARS: usize = 4096;

/// Environment variable bounding bracket nesting in the parser.
pub const MAX_GROUP_DEPTH_ENV: &str = "FACET_SEARCH_MAX_GROUP_DEPTH";
/// Default nesting bound.
pub const DEFAULT_MAX_GROUP_DEPTH: usize = 32;

/// Environment variable toggling the fingerprint-diff sync path.
pub const INCREMENTAL_SYNC_ENV: &str = "FACET_SEARCH_INCREMENTAL_SYNC";

/// Environment variable for the length of an `older_than:1m` month, in days.
pub const MONTH_DAYS_ENV: &str = "FACET_SEARCH_MONTH_DAYS";
/// Default month length.
pub const DEFAULT_MONTH_DAYS: u32 = 30;
/// Longest accepted month length.
pub const MAX_MONTH_DAYS: u32 = 31;

/// Environment variable for the length of an `older_than:1y` year, in days.
pub const YEAR_DAYS_ENV: &str = "FACET_SEARCH_YEAR_DAYS";
/// Default year length.
pub const DEFAULT_YEAR_DAYS: u32 = 365;
/// Longest accepted year length.
pub const MAX_YEAR_DAYS: u32 = 366;

/// Tunables shared by the parser, the evaluator and the engine manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Queries longer than this (in chars) are truncated before lexing.
    pub max_query_chars: usize,
    /// Brackets nested deeper than this are flattened into the enclosing scope.
    pub max_group_depth: usize,
    /// Apply fingerprint deltas on `sync` instead of rebuilding wholesale.
    pub incremental_sync: bool,
    /// Days per `m` unit in `older_than:` / `newer_than:`.
    pub month_days: u32,
    /// Days per `y` unit in `older_than:` / `newer_than:`.
    pub year_days: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_query_chars: DEFAULT_MAX_QUERY_CHARS,
            max_group_depth: DEFAULT_MAX_GROUP_DEPTH,
            incremental_sync: true,
            month_days: DEFAULT_MONTH_DAYS,
            year_days: DEFAULT_YEAR_DAYS,
        }
    }
}

impl SearchConfig {
    /// Load config from environment variables, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load config through an arbitrary key lookup (environment, dotenv map, tests).
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let positive_usize = |key: &str, default: usize| {
            lookup(key)
                .and_then(|v| v.trim().parse::<usize>().ok())
                .filter(|&v| v > 0)
                .unwrap_or(default)
        };
        let days = |key: &str, default: u32, max: u32| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u32>().ok())
                .filter(|v| (1..=max).contains(v))
                .unwrap_or(default)
        };

        Self {
            max_query_chars: positive_usize(MAX_QUERY_CHARS_ENV, defaults.max_query_chars),
            max_group_depth: positive_usize(MAX_GROUP_DEPTH_ENV, defaults.max_group_depth),
            incremental_sync: lookup(INCREMENTAL_SYNC_ENV)
                .map_or(defaults.incremental_sync, |v| {
                    parse_bool(&v, defaults.incremental_sync)
                }),
            month_days: days(MONTH_DAYS_ENV, defaults.month_days, MAX_MONTH_DAYS),
            year_days: days(YEAR_DAYS_ENV, defaults.year_days, MAX_YEAR_DAYS),
        }
    }

    /// Set the nesting bound
    #[must_use]
    pub const fn with_max_group_depth(mut self, depth: usize) -> Self {
        self.max_group_depth = depth;
        self
    }

    /// Set the query length bound
    #[must_use]
    pub const fn with_max_query_chars(mut self, chars: usize) -> Self {
        self.max_query_chars = chars;
        self
    }

    /// Enable or disable incremental sync
    #[must_use]
    pub const fn with_incremental_sync(mut self, enabled: bool) -> Self {
        self.incremental_sync = enabled;
        self
    }
}

fn parse_bool(value: &str, default: bool) -> bool {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => true,
        "0" | "false" | "f" | "no" | "n" | "off" => false,
        _ => default,
    }
}
