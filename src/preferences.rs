//! Read-only preference lookup for mirror ranking
//!
//! Each source names its own keys and defaults; the store only answers
//! `get(key)`. The service fills its store from `PREF_*` environment
//! variables and lets request parameters override individual values.

use std::collections::HashMap;

use crate::models::{RankingPreferences, SITE_DEFAULT_GROUP};

/// Environment prefix for preference variables (`PREF_PREFERRED_QUALITY`, ...)
pub const ENV_PREFIX: &str = "PREF_";

/// Read-only key/value preference lookup
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

impl PreferenceStore for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// A store that layers per-request values over a base store
pub struct Overlay<'a> {
    values: HashMap<String, String>,
    base: &'a dyn PreferenceStore,
}

impl<'a> Overlay<'a> {
    pub fn new(base: &'a dyn PreferenceStore) -> Self {
        Self {
            values: HashMap::new(),
            base,
        }
    }

    /// Set `key` when a value was supplied and is not blank
    pub fn set(mut self, key: &str, value: Option<&str>) -> Self {
        if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
            self.values.insert(key.to_string(), value.to_string());
        }
        self
    }
}

impl PreferenceStore for Overlay<'_> {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned().or_else(|| self.base.get(key))
    }
}

/// The keys a source reads and the defaults it falls back to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreferenceKeys {
    pub quality: (&'static str, &'static str),
    pub language: (&'static str, &'static str),
    pub group: (&'static str, &'static str),
}

impl PreferenceKeys {
    /// Keys for the sub/dub site with release group weights
    pub const SUB_DUB: PreferenceKeys = PreferenceKeys {
        quality: ("preferred_quality", "1080"),
        language: ("preferred_sub", "sub"),
        group: ("preferred_group", SITE_DEFAULT_GROUP),
    };

    /// Keys for the language-region site with server rows
    pub const REGION_SERVER: PreferenceKeys = PreferenceKeys {
        quality: ("preferred_quality", "1080"),
        language: ("preferred_language", "Latino"),
        group: ("preferred_server", "DoodStream"),
    };
}

impl RankingPreferences {
    /// Read preferences for `keys`, falling back to each key's default
    pub fn load(store: &dyn PreferenceStore, keys: &PreferenceKeys) -> Self {
        let read = |(key, default): (&str, &str)| store.get(key).unwrap_or_else(|| default.to_string());
        Self {
            preferred_quality: read(keys.quality),
            preferred_language: read(keys.language),
            preferred_group: read(keys.group),
        }
    }
}

/// Build a store from `PREF_<KEY>` variables, keys lowercased
pub fn store_from_vars<I>(vars: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = (String, String)>,
{
    vars.into_iter()
        .filter_map(|(name, value)| {
            name.strip_prefix(ENV_PREFIX)
                .map(|key| (key.to_lowercase(), value))
        })
        .collect()
}
