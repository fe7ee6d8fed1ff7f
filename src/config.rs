//! Session configuration
//!
//! Everything a session needs is passed in explicitly through
//! `SessionConfig`; nothing is read from global state after construction.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::annotations::{Layer, OverlapPolicy};
use crate::persist::SaveQueueConfig;
use crate::search::SearchLimits;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionConfig {
    /// Translation the corpus must carry
    pub translation: String,
    pub default_layer_name: String,
    pub default_layer_color: String,
    pub overlap_policy: OverlapPolicy,
    pub search: SearchLimits,
    /// Maximum book suggestions returned for a prefix
    pub suggestion_limit: usize,
    pub persistence: PersistenceConfig,
    /// Corpus JSON file used by the binary
    pub corpus_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersistenceConfig {
    /// State file; no persistence when unset
    pub state_path: Option<PathBuf>,
    pub debounce_ms: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            translation: "KJV".to_string(),
            default_layer_name: "Default".to_string(),
            default_layer_color: "yellow".to_string(),
            overlap_policy: OverlapPolicy::Reject,
            search: SearchLimits::default(),
            suggestion_limit: 5,
            persistence: PersistenceConfig::default(),
            corpus_path: None,
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            state_path: None,
            debounce_ms: 250,
            max_retries: 3,
            retry_backoff_ms: 200,
        }
    }
}

impl PersistenceConfig {
    pub fn queue_config(&self) -> SaveQueueConfig {
        SaveQueueConfig {
            debounce: Duration::from_millis(self.debounce_ms),
            max_retries: self.max_retries,
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }
}

impl SessionConfig {
    /// Defaults overlaid with `VERSE_*` environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(|key| env::var(key).ok());
        config
    }

    /// Overlay values from `lookup`; unparsable values are logged and ignored
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("VERSE_TRANSLATION") {
            self.translation = v;
        }
        if let Some(v) = lookup("VERSE_DEFAULT_LAYER_NAME") {
            self.default_layer_name = v;
        }
        if let Some(v) = lookup("VERSE_DEFAULT_LAYER_COLOR") {
            self.default_layer_color = v;
        }
        if let Some(v) = lookup("VERSE_CORPUS") {
            self.corpus_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("VERSE_STATE_FILE") {
            self.persistence.state_path = Some(PathBuf::from(v));
        }

        override_parsed(&lookup, "VERSE_OVERLAP_POLICY", &mut self.overlap_policy);
        override_parsed(&lookup, "VERSE_SEARCH_MAX_QUERY_LEN", &mut self.search.max_query_len);
        override_parsed(&lookup, "VERSE_SEARCH_ALLOW_REGEX", &mut self.search.allow_regex);
        override_parsed(&lookup, "VERSE_SEARCH_MAX_PATTERN_SIZE", &mut self.search.max_pattern_size);
        override_parsed(&lookup, "VERSE_SUGGESTION_LIMIT", &mut self.suggestion_limit);
        override_parsed(&lookup, "VERSE_SAVE_DEBOUNCE_MS", &mut self.persistence.debounce_ms);
        override_parsed(&lookup, "VERSE_SAVE_MAX_RETRIES", &mut self.persistence.max_retries);
        override_parsed(&lookup, "VERSE_SAVE_RETRY_BACKOFF_MS", &mut self.persistence.retry_backoff_ms);

        if let Some(v) = lookup("VERSE_SEARCH_MAX_RESULTS") {
            match v.parse::<usize>() {
                Ok(0) => self.search.max_results = None,
                Ok(n) => self.search.max_results = Some(n),
                Err(e) => warn!(key = "VERSE_SEARCH_MAX_RESULTS", value = %v, error = %e, "Ignoring invalid value"),
            }
        }
    }

    /// The default layer this configuration describes
    pub fn default_layer(&self) -> Layer {
        Layer::default_layer(&self.default_layer_name, &self.default_layer_color)
    }
}

fn override_parsed<F, T>(lookup: &F, key: &str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(value) = lookup(key) else {
        return;
    };
    match value.trim().parse() {
        Ok(parsed) => *target = parsed,
        Err(e) => warn!(key, value = %value, error = %e, "Ignoring invalid value"),
    }
}
