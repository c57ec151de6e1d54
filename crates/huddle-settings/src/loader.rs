//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`HuddleSettings::default()`]
//! 2. If `~/.huddle/settings.json` exists, deep-merge user values over defaults
//! 3. Apply environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::HuddleSettings;

/// Resolve the path to the settings file (`~/.huddle/settings.json`).
#[must_use]
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".huddle").join("settings.json")
}

/// Load settings from the default path with env var overrides.
///
/// # Errors
///
/// Fails when the settings file exists but cannot be read or parsed.
pub fn load_settings() -> Result<HuddleSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
///
/// # Errors
///
/// Fails when the file exists but cannot be read or parsed.
pub fn load_settings_from_path(path: &Path) -> Result<HuddleSettings> {
    let defaults = serde_json::to_value(HuddleSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: HuddleSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
#[must_use]
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded settings.
///
/// Invalid values are ignored with a warning, falling back to the
/// file/default layer.
pub fn apply_env_overrides(settings: &mut HuddleSettings) {
    if let Some(v) = read_env_string("HUDDLE_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read_env_u16("HUDDLE_PORT", 1, 65535) {
        settings.server.port = v;
    }
    if let Some(v) = read_env_string("HUDDLE_API_KEY") {
        settings.llm.api_key = Some(v);
    }
    if let Some(v) = read_env_string("HUDDLE_BASE_URL") {
        settings.llm.base_url = v;
    }
    if let Some(v) = read_env_string("HUDDLE_MODEL") {
        settings.llm.primary_model = v;
    }
    if let Some(v) = read_env_string("HUDDLE_FALLBACK_MODEL") {
        settings.llm.fallback_model = v;
    }
    if let Some(v) = read_env_string("HUDDLE_VALIDATOR_MODEL") {
        settings.llm.validator_model = v;
    }
    if let Some(v) = read_env_i64("HUDDLE_SEASON", 1920, 3000) {
        settings.current_season = v;
    }
    if let Some(v) = read_env_u64("HUDDLE_EXECUTION_TIMEOUT_SECS", 1, 600) {
        settings.pipeline.execution_timeout_secs = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a `u16` within a range.
#[must_use]
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
#[must_use]
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as an `i64` within a range.
#[must_use]
pub fn parse_i64_range(val: &str, min: i64, max: i64) -> Option<i64> {
    let n: i64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_u16(name: &str, min: u16, max: u16) -> Option<u16> {
    let val = std::env::var(name).ok()?;
    let result = parse_u16_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u16 env var, ignoring");
    }
    result
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    let val = std::env::var(name).ok()?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
    }
    result
}

fn read_env_i64(name: &str, min: i64, max: i64) -> Option<i64> {
    let val = std::env::var(name).ok()?;
    let result = parse_i64_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid i64 env var, ignoring");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write as _;

    #[test]
    fn deep_merge_merges_objects_recursively() {
        let target = json!({"llm": {"primary_model": "a", "base_url": "x"}});
        let source = json!({"llm": {"primary_model": "b"}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["llm"]["primary_model"], "b");
        assert_eq!(merged["llm"]["base_url"], "x");
    }

    #[test]
    fn deep_merge_skips_nulls() {
        let target = json!({"llm": {"api_key": "secret"}});
        let source = json!({"llm": {"api_key": null}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["llm"]["api_key"], "secret");
    }

    #[test]
    fn deep_merge_replaces_arrays_and_primitives() {
        let target = json!({"a": [1, 2], "b": 1});
        let source = json!({"a": [3], "b": 2});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], json!([3]));
        assert_eq!(merged["b"], 2);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings_from_path(&dir.path().join("nope.json")).unwrap();
        assert_eq!(settings, HuddleSettings::default());
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{"server": {{"port": 9000}}, "pipeline": {{"max_attempts_primary": 1}}}}"#
        )
        .unwrap();

        let settings = load_settings_from_path(&path).unwrap();
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.pipeline.max_attempts_primary, 1);
        // Untouched keys keep their defaults.
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.pipeline.max_attempts_fallback, 2);
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(load_settings_from_path(&path).is_err());
    }

    #[test]
    fn range_parsers_reject_out_of_range() {
        assert_eq!(parse_u16_range("8787", 1, 65535), Some(8787));
        assert_eq!(parse_u16_range("0", 1, 65535), None);
        assert_eq!(parse_u16_range("nope", 1, 65535), None);
        assert_eq!(parse_i64_range("2025", 1920, 3000), Some(2025));
        assert_eq!(parse_i64_range("1900", 1920, 3000), None);
        assert_eq!(parse_u64_range("30", 1, 600), Some(30));
    }
}
