//! Configuration management

use std::env;

use anyhow::{Context, Result};

/// Data-access configuration loaded from environment variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Row limit for `select_many` when the caller gives none
    pub default_select_limit: usize,

    /// Maximum predicate nesting depth (`None` = unbounded)
    pub max_predicate_depth: Option<usize>,

    /// Tracing filter used when `RUST_LOG` is not set
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_select_limit: 1000,
            max_predicate_depth: None,
            log_filter: "dorm=info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables (and `.env`, if present)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let default_select_limit = match lookup("DORM_DEFAULT_SELECT_LIMIT") {
            Some(v) => v
                .parse()
                .context("Invalid DORM_DEFAULT_SELECT_LIMIT")?,
            None => defaults.default_select_limit,
        };

        // 0 or an empty value disables the depth limit
        let max_predicate_depth = match lookup("DORM_MAX_PREDICATE_DEPTH") {
            Some(v) if v.is_empty() || v == "0" => None,
            Some(v) => Some(v.parse().context("Invalid DORM_MAX_PREDICATE_DEPTH")?),
            None => defaults.max_predicate_depth,
        };

        Ok(Self {
            default_select_limit,
            max_predicate_depth,
            log_filter: lookup("DORM_LOG").unwrap_or(defaults.log_filter),
        })
    }
}
