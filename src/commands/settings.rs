use crate::models::config::{EngineConfig, SharedConfig};
use crate::models::metric::{Metric, Rating};
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

const SETTINGS_SCHEMA_VERSION: i64 = 2;
const RATING_METRICS: [&str; 4] = ["security", "reliability", "maintainability", "complexity"];

pub fn get_settings(workspace_path: &str) -> Result<Value, String> {
    load_settings_from_disk(workspace_path)
}

/// Persist a partial update and publish the result to `config`.
/// Computations already holding a snapshot keep the old values.
pub fn save_settings(workspace_path: &str, settings: Value, config: &SharedConfig) -> Result<Value, String> {
    let saved = save_settings_to_disk(workspace_path, settings)?;
    config.replace(config_from_settings(&saved)?);
    Ok(saved)
}

pub fn load_effective_config(workspace_path: &str) -> Result<EngineConfig, String> {
    let settings = load_settings_from_disk(workspace_path)?;
    config_from_settings(&settings)
}

fn config_from_settings(settings: &Value) -> Result<EngineConfig, String> {
    serde_json::from_value(settings.clone()).map_err(|e| format!("Invalid settings: {e}"))
}

pub fn load_settings_from_disk(workspace_path: &str) -> Result<Value, String> {
    let path = settings_path(workspace_path);
    ensure_okrlens_dir(workspace_path)?;

    let original = if path.exists() {
        let raw = fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read settings.json: {e}"))?;
        serde_json::from_str::<Value>(&raw).unwrap_or_else(|e| {
            log::warn!("settings.json is not valid JSON ({e}); falling back to defaults");
            json!({})
        })
    } else {
        json!({})
    };

    let migrated = migrate_settings(original.clone());
    if migrated != original || !path.exists() {
        write_settings_file(&path, &migrated)?;
    }

    Ok(migrated)
}

pub fn save_settings_to_disk(workspace_path: &str, settings: Value) -> Result<Value, String> {
    let path = settings_path(workspace_path);
    ensure_okrlens_dir(workspace_path)?;

    let mut merged = load_settings_from_disk(workspace_path).unwrap_or_else(|_| default_settings());
    merge_settings(&mut merged, &settings);

    let migrated = migrate_settings(merged);
    write_settings_file(&path, &migrated)?;
    Ok(migrated)
}

fn settings_path(workspace_path: &str) -> PathBuf {
    Path::new(workspace_path).join(".okrlens").join("settings.json")
}

fn ensure_okrlens_dir(workspace_path: &str) -> Result<(), String> {
    let dir = Path::new(workspace_path).join(".okrlens");
    fs::create_dir_all(&dir).map_err(|e| format!("Failed to create .okrlens directory: {e}"))
}

fn write_settings_file(path: &Path, settings: &Value) -> Result<(), String> {
    let raw = serde_json::to_string_pretty(settings)
        .map_err(|e| format!("Failed to serialize settings: {e}"))?;
    fs::write(path, raw).map_err(|e| format!("Failed to write settings.json: {e}"))
}

fn migrate_settings(input: Value) -> Value {
    let defaults = default_settings();
    let mut out = match input {
        Value::Object(map) => Value::Object(map),
        _ => Value::Object(Map::new()),
    };

    deep_merge_defaults(&mut out, &defaults);

    let version = out
        .get("schema_version")
        .and_then(Value::as_i64)
        .unwrap_or(0);

    if version < 1 {
        migrate_comma_separated_grades(&mut out);
    }

    if version < 2 {
        // V2 introduces the dashboard metric list and the team exclusion list.
        ensure_key(&mut out, "displayed_metrics", defaults["displayed_metrics"].clone());
        ensure_key(&mut out, "excluded_teams", defaults["excluded_teams"].clone());
    }

    if version < SETTINGS_SCHEMA_VERSION {
        log::info!("Migrated settings from schema {version} to {SETTINGS_SCHEMA_VERSION}");
    }

    sanitize_settings(&mut out);
    if let Some(obj) = out.as_object_mut() {
        obj.insert("schema_version".to_string(), json!(SETTINGS_SCHEMA_VERSION));
    }

    out
}

fn default_settings() -> Value {
    // No schema_version here: a file without one must still run every migration.
    serde_json::to_value(EngineConfig::default()).unwrap_or_else(|_| json!({}))
}

fn deep_merge_defaults(target: &mut Value, defaults: &Value) {
    let (Some(target_obj), Some(default_obj)) = (target.as_object_mut(), defaults.as_object()) else {
        return;
    };

    for (key, default_value) in default_obj {
        match target_obj.get_mut(key) {
            Some(existing) => {
                if existing.is_object() && default_value.is_object() {
                    deep_merge_defaults(existing, default_value);
                }
            }
            None => {
                target_obj.insert(key.clone(), default_value.clone());
            }
        }
    }
}

fn ensure_key(target: &mut Value, key: &str, value: Value) {
    if let Some(obj) = target.as_object_mut() {
        obj.entry(key.to_string()).or_insert(value);
    }
}

fn merge_settings(target: &mut Value, incoming: &Value) {
    match (target, incoming) {
        (Value::Object(target_obj), Value::Object(incoming_obj)) => {
            for (key, value) in incoming_obj {
                if let Some(existing) = target_obj.get_mut(key) {
                    merge_settings(existing, value);
                } else {
                    target_obj.insert(key.clone(), value.clone());
                }
            }
        }
        (target_slot, incoming_value) => {
            *target_slot = incoming_value.clone();
        }
    }
}

/// Schema 0 stored grade sets as `"A,B,C"` and numbers as strings.
fn migrate_comma_separated_grades(settings: &mut Value) {
    let Some(thresholds) = settings.get_mut("thresholds").and_then(Value::as_object_mut) else {
        return;
    };

    for key in RATING_METRICS {
        if let Some(Value::String(raw)) = thresholds.get(key) {
            let grades: Vec<Value> = raw
                .split(',')
                .map(str::trim)
                .filter(|grade| !grade.is_empty())
                .map(|grade| json!(grade))
                .collect();
            thresholds.insert(key.to_string(), Value::Array(grades));
        }
    }

    if let Some(Value::String(raw)) = thresholds.get("coverage_min") {
        if let Ok(parsed) = raw.trim().parse::<f64>() {
            thresholds.insert("coverage_min".to_string(), json!(parsed));
        }
    }
}

fn sanitize_settings(settings: &mut Value) {
    let Some(obj) = settings.as_object_mut() else {
        return;
    };

    let mut thresholds = take_object(obj, "thresholds");
    for key in RATING_METRICS {
        sanitize_grades(&mut thresholds, key);
    }
    let coverage_min = thresholds
        .get("coverage_min")
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite() && *v >= 0.0)
        .unwrap_or(0.0);
    thresholds.insert("coverage_min".to_string(), json!(coverage_min));
    obj.insert("thresholds".to_string(), Value::Object(thresholds));

    let mut scope = take_object(obj, "scope");
    let mut flags = take_object(&mut scope, "use_selected_only");
    for metric in Metric::ALL {
        ensure_bool(&mut flags, metric.key(), metric == Metric::Coverage);
    }
    let mut selected = take_object(&mut scope, "selected");
    sanitize_selections(&mut selected);
    scope.insert("use_selected_only".to_string(), Value::Object(flags));
    scope.insert("selected".to_string(), Value::Object(selected));
    obj.insert("scope".to_string(), Value::Object(scope));

    let mut na_policy = take_object(obj, "na_policy");
    for metric in Metric::ALL {
        ensure_bool(&mut na_policy, metric.key(), false);
    }
    obj.insert("na_policy".to_string(), Value::Object(na_policy));

    let mut goals = take_object(obj, "goals");
    for metric in Metric::ALL {
        let default = if metric == Metric::Coverage { 50.0 } else { 90.0 };
        clamp_f64(&mut goals, metric.key(), 0.0, 100.0, default);
    }
    obj.insert("goals".to_string(), Value::Object(goals));

    sanitize_displayed_metrics(obj);
    sanitize_excluded_teams(obj);
}

/// Remove the object at `key`; anything that is not an object becomes `{}`.
fn take_object(map: &mut Map<String, Value>, key: &str) -> Map<String, Value> {
    match map.remove(key) {
        Some(Value::Object(inner)) => inner,
        _ => Map::new(),
    }
}

fn sanitize_grades(map: &mut Map<String, Value>, key: &str) {
    let grades: BTreeSet<Rating> = match map.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .filter_map(Rating::parse_lenient)
            .collect(),
        _ => Rating::ALL.into_iter().collect(),
    };
    let grades: Vec<&str> = grades.into_iter().map(Rating::as_str).collect();
    map.insert(key.to_string(), json!(grades));
}

fn sanitize_selections(map: &mut Map<String, Value>) {
    for value in map.values_mut() {
        let mut seen = BTreeSet::new();
        let projects: Vec<String> = value
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::trim)
                    .filter(|project| !project.is_empty() && seen.insert(project.to_string()))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        *value = json!(projects);
    }
}

fn sanitize_displayed_metrics(map: &mut Map<String, Value>) {
    let metrics: Vec<&str> = match map.get("displayed_metrics") {
        Some(Value::Array(items)) => {
            let mut seen = BTreeSet::new();
            items
                .iter()
                .filter_map(Value::as_str)
                .filter_map(|name| name.parse::<Metric>().ok())
                .filter(|metric| seen.insert(*metric))
                .map(Metric::key)
                .collect()
        }
        _ => crate::models::config::default_displayed_metrics()
            .into_iter()
            .map(Metric::key)
            .collect(),
    };
    map.insert("displayed_metrics".to_string(), json!(metrics));
}

fn sanitize_excluded_teams(map: &mut Map<String, Value>) {
    let teams: Vec<String> = match map.get("excluded_teams") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|team| !team.is_empty())
            .map(str::to_string)
            .collect(),
        _ => crate::models::config::default_excluded_teams(),
    };
    map.insert("excluded_teams".to_string(), json!(teams));
}

fn clamp_f64(map: &mut Map<String, Value>, key: &str, min: f64, max: f64, default: f64) {
    let raw = map
        .get(key)
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite())
        .unwrap_or(default);
    map.insert(key.to_string(), json!(raw.clamp(min, max)));
}

fn ensure_bool(map: &mut Map<String, Value>, key: &str, default: bool) {
    let value = map.get(key).and_then(Value::as_bool).unwrap_or(default);
    map.insert(key.to_string(), json!(value));
}
