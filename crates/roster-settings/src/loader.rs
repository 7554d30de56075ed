//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`RosterSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over defaults
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
use crate::types::RosterSettings;

/// Env var naming an alternate settings file.
pub const SETTINGS_PATH_ENV: &str = "ROSTER_SETTINGS";

/// Resolve the settings file path (`$ROSTER_SETTINGS`, else `./roster.json`).
pub fn settings_path() -> PathBuf {
    std::env::var(SETTINGS_PATH_ENV)
        .ok()
        .filter(|v| !v.is_empty())
        .map_or_else(|| PathBuf::from("roster.json"), PathBuf::from)
}

/// Load settings from the default path with process env overrides.
pub fn load_settings() -> Result<RosterSettings> {
    load_settings_with(&settings_path(), &|name| std::env::var(name).ok())
}

/// Load settings from `path`, reading overrides through `env`.
///
/// A missing file yields defaults; a malformed file is an error.
pub fn load_settings_with(
    path: &Path,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<RosterSettings> {
    let defaults = serde_json::to_value(RosterSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: RosterSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings, env);
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
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
/// `TABLE_NAME` and `WEBSOCKET_ADDRESS` are accepted for the two required
/// values; the `ROSTER_*` spelling wins when both are set. Invalid numeric or
/// boolean values are ignored with a warning.
pub fn apply_env_overrides(settings: &mut RosterSettings, env: &dyn Fn(&str) -> Option<String>) {
    let env = Env(env);

    // ── Required deployment values ──────────────────────────────────
    if let Some(v) = env.string("ROSTER_REGISTRY").or_else(|| env.string("TABLE_NAME")) {
        settings.registry.location = Some(v);
    }
    if let Some(v) = env
        .string("ROSTER_GATEWAY_ENDPOINT")
        .or_else(|| env.string("WEBSOCKET_ADDRESS"))
    {
        settings.gateway.endpoint = Some(v);
    }

    // ── Registry ────────────────────────────────────────────────────
    if let Some(v) = env.usize("ROSTER_SCAN_PAGE_SIZE", 1, 10_000) {
        settings.registry.scan_page_size = v;
    }
    if let Some(v) = env.u32("ROSTER_REGISTRY_MAX_ATTEMPTS", 1, 20) {
        settings.registry.retry.max_attempts = v;
    }

    // ── Gateway ─────────────────────────────────────────────────────
    if let Some(v) = env.usize("ROSTER_FANOUT_CONCURRENCY", 1, 1_024) {
        settings.gateway.fanout_concurrency = v;
    }
    if let Some(v) = env.u32("ROSTER_PUSH_MAX_ATTEMPTS", 1, 20) {
        settings.gateway.retry.max_attempts = v;
    }
    if let Some(v) = env.u64("ROSTER_PUSH_TIMEOUT_MS", 100, 120_000) {
        settings.gateway.request_timeout_ms = v;
    }
    if let Some(v) = env.bool("ROSTER_PRUNE_STALE") {
        settings.gateway.prune_stale = v;
    }

    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = env.string("ROSTER_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = env.u16("ROSTER_PORT", 0, 65535) {
        settings.server.port = v;
    }
    if let Some(v) = env.u64("ROSTER_HANDLER_TIMEOUT_MS", 100, 900_000) {
        settings.server.handler_timeout_ms = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = env.string("ROSTER_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.bool("ROSTER_LOG_JSON") {
        settings.logging.json = v;
    }
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as an integer within an inclusive range.
pub fn parse_range<T>(val: &str, min: T, max: T) -> Option<T>
where
    T: std::str::FromStr + PartialOrd,
{
    let n: T = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env readers ─────────────────────────────────────────────────────────────

struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    fn string(&self, name: &str) -> Option<String> {
        (self.0)(name).filter(|v| !v.trim().is_empty())
    }

    fn bool(&self, name: &str) -> Option<bool> {
        let val = self.string(name)?;
        let result = parse_bool(&val);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid boolean env var, ignoring");
        }
        result
    }

    fn number<T>(&self, name: &str, min: T, max: T) -> Option<T>
    where
        T: std::str::FromStr + PartialOrd,
    {
        let val = self.string(name)?;
        let result = parse_range(&val, min, max);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid numeric env var, ignoring");
        }
        result
    }

    fn u16(&self, name: &str, min: u16, max: u16) -> Option<u16> {
        self.number(name, min, max)
    }

    fn u32(&self, name: &str, min: u32, max: u32) -> Option<u32> {
        self.number(name, min, max)
    }

    fn u64(&self, name: &str, min: u64, max: u64) -> Option<u64> {
        self.number(name, min, max)
    }

    fn usize(&self, name: &str, min: usize, max: usize) -> Option<usize> {
        self.number(name, min, max)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
