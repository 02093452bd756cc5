use crate::outline::{GestureConfig, DEFAULT_MAX_LEVEL};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

pub(crate) const DEFAULT_API_URL: &str = "http://localhost:6689";
pub(crate) const DEFAULT_DEBOUNCE_MS: i64 = 1200;
pub(crate) const DEFAULT_RETRY_MS: i64 = 2000;

/// Where committed lists live.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Display, AsRefStr, EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub(crate) enum StorageMode {
    #[default]
    Api,
    /// Browser localStorage only. Useful without a backend.
    Local,
}

/// Deployment settings, read from `window.ENV`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub(crate) struct EnvConfig {
    pub api_url: String,
    pub storage: StorageMode,
    pub max_level: usize,
    pub autosave_ms: i64,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            storage: StorageMode::default(),
            max_level: DEFAULT_MAX_LEVEL,
            autosave_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl EnvConfig {
    pub fn new() -> Self {
        let env = web_sys::window()
            .and_then(|w| w.get("ENV"))
            .filter(|env| !env.is_undefined() && env.is_object());

        let Some(env) = env else {
            return Self::default();
        };

        Self::from_lookup(|key| {
            let v = js_sys::Reflect::get(&env, &key.into()).ok()?;
            v.as_string().or_else(|| v.as_f64().map(|n| n.to_string()))
        })
    }

    /// Build from a key lookup. Both `API_URL` and the legacy `api_url` are accepted.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        let pick = |upper: &str, lower: &str| get(upper).or_else(|| get(lower));

        let api_url = pick("API_URL", "api_url")
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(d.api_url);

        let storage = pick("STORAGE", "storage")
            .and_then(|s| s.trim().parse::<StorageMode>().ok())
            .unwrap_or(d.storage);

        let max_level = pick("MAX_LEVEL", "max_level")
            .and_then(|s| s.trim().parse::<f64>().ok())
            .filter(|n| n.is_finite() && *n >= 0.0)
            .map(|n| n as usize)
            .unwrap_or(d.max_level);

        let autosave_ms = pick("AUTOSAVE_MS", "autosave_ms")
            .and_then(|s| s.trim().parse::<f64>().ok())
            .filter(|n| n.is_finite() && *n >= 0.0)
            .map(|n| n as i64)
            .unwrap_or(d.autosave_ms);

        Self {
            api_url,
            storage,
            max_level,
            autosave_ms,
        }
    }
}

/// Tunables consumed by the editor and its commit loop.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct EditorConfig {
    pub max_level: usize,
    pub debounce_ms: i64,
    pub retry_ms: i64,
    pub gesture: GestureConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_level: DEFAULT_MAX_LEVEL,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            retry_ms: DEFAULT_RETRY_MS,
            gesture: GestureConfig::default(),
        }
    }
}

impl From<&EnvConfig> for EditorConfig {
    fn from(env: &EnvConfig) -> Self {
        Self {
            max_level: env.max_level,
            debounce_ms: env.autosave_ms,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_env_defaults() {
        let env = EnvConfig::from_lookup(lookup(&[]));
        assert_eq!(env, EnvConfig::default());
        assert_eq!(env.api_url, "http://localhost:6689");
        assert_eq!(env.storage, StorageMode::Api);
        assert_eq!(env.max_level, 2);
    }

    #[test]
    fn test_env_prefers_upper_case_keys() {
        let env = EnvConfig::from_lookup(lookup(&[
            ("API_URL", "https://a.example/"),
            ("api_url", "https://b.example"),
            ("storage", "LOCAL"),
            ("MAX_LEVEL", "3"),
            ("AUTOSAVE_MS", "500"),
        ]));
        assert_eq!(env.api_url, "https://a.example");
        assert_eq!(env.storage, StorageMode::Local);
        assert_eq!(env.max_level, 3);
        assert_eq!(env.autosave_ms, 500);
    }

    #[test]
    fn test_env_ignores_garbage() {
        let env = EnvConfig::from_lookup(lookup(&[
            ("API_URL", "  "),
            ("STORAGE", "cloud"),
            ("MAX_LEVEL", "-1"),
            ("AUTOSAVE_MS", "soon"),
        ]));
        assert_eq!(env, EnvConfig::default());
    }

    #[test]
    fn test_editor_config_from_env() {
        let env = EnvConfig {
            max_level: 4,
            autosave_ms: 300,
            ..EnvConfig::default()
        };
        let cfg = EditorConfig::from(&env);
        assert_eq!(cfg.max_level, 4);
        assert_eq!(cfg.debounce_ms, 300);
        assert_eq!(cfg.retry_ms, DEFAULT_RETRY_MS);
    }
}
