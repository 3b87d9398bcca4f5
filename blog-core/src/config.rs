//! # Configuration
//!
//! A flat string key/value store in the style of `app.set()` /
//! `app.get()`. Values are layered: built-in defaults first, then
//! environment overrides loaded with [`BlogConfig::load_env`].
//!
//! ```rust
//! use blog_core::BlogConfig;
//! let mut cfg = BlogConfig::new();
//!
//! cfg.set("paginate.default", "10");
//! assert_eq!(cfg.get("paginate.default"), Some("10"));
//! ```
//!
//! Environment keys are stripped of their prefix, lowercased, and `__`
//! becomes `.`, so `BLOG__HTTP__PORT=8080` sets `http.port`. Keys that
//! are camelCase in the config (`uploads.maxBytes`) are matched
//! case-insensitively against existing keys.

use std::collections::HashMap;

pub const ENV_PREFIX: &str = "BLOG__";

#[derive(Debug, Default, Clone)]
pub struct BlogConfig {
    values: HashMap<String, String>,
}

impl BlogConfig {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Config pre-populated with the server defaults.
    pub fn with_defaults() -> Self {
        let mut cfg = Self::new();
        cfg.set("http.host", "127.0.0.1");
        cfg.set("http.port", "3036");
        cfg.set("paginate.default", "100");
        cfg.set("uploads.dir", "public/images");
        cfg.set("uploads.maxBytes", (5 * 1024 * 1024).to_string());
        cfg.set("uploads.maxTextBytes", (64 * 1024).to_string());
        cfg.set("auth.issuer", "blog-api");
        cfg.set("auth.audience", "blog-api");
        cfg.set("auth.expiresIn", "3600");
        cfg
    }

    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    /// Apply overrides from `vars` whose names start with `prefix`.
    pub fn load_vars<I>(&mut self, prefix: &str, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(stripped) = key.strip_prefix(prefix) else {
                continue;
            };

            let normalized = stripped.to_lowercase().replace("__", ".");
            let key = self
                .values
                .keys()
                .find(|k| k.to_lowercase() == normalized)
                .cloned()
                .unwrap_or(normalized);

            tracing::debug!(%key, "config override from environment");
            self.set(key, value);
        }
    }

    /// Apply overrides from the process environment (`BLOG__*`).
    pub fn load_env(&mut self) {
        self.load_vars(ENV_PREFIX, std::env::vars());
    }

    pub fn snapshot(&self) -> BlogConfigSnapshot {
        BlogConfigSnapshot::new(self.values.clone())
    }
}

/// Read-only copy handed to services and middleware.
#[derive(Debug, Clone, Default)]
pub struct BlogConfigSnapshot {
    map: HashMap<String, String>,
}

impl BlogConfigSnapshot {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.trim().parse::<usize>().ok())
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.trim().parse::<u64>().ok())
    }
}
