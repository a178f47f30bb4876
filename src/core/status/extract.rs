//! Status Field Extraction
//!
//! Maps the raw status document onto a `StatusRecord` one field at a time.
//! Each accessor yields a value or `None`; a missing or mistyped field only
//! falls back to that field's default and never fails the record.
//!
//! Supported shapes:
//! - `{"version": {"name": "1.20.1", "protocol": 763}}`
//! - `{"players": {"max": 20, "online": 1, "sample": [{"name", "id"}]}}`
//! - `{"description": "plain"}` or `{"description": {"text": ".."}}`
//! - `{"favicon": "data:image/png;base64,..."}`
//! - `{"forgeData": {..}}` / `{"modinfo": {..}}` for Forge servers

use crate::core::status::debug_logger::get_debug_logger;
use crate::core::status::types::{ModLoader, SamplePlayer, StatusRecord, UNKNOWN_VERSION};
use serde_json::{Map, Value};

/// Top-level keys that identify a Forge server
const FORGE_KEYS: [&str; 2] = ["forgeData", "modinfo"];

/// Build an online record from a parsed status document
pub fn extract_status(document: &Value, now_epoch_ms: i64) -> StatusRecord {
    StatusRecord {
        online: true,
        version_name: version_name(document).unwrap_or_else(|| UNKNOWN_VERSION.to_string()),
        protocol_version: protocol_version(document).unwrap_or(0),
        favicon: favicon(document).unwrap_or_default(),
        max_players: players_field(document, "max").unwrap_or(0),
        online_players: players_field(document, "online").unwrap_or(0),
        sample_players: sample_players(document),
        description: description(document),
        mod_loader: mod_loader(document),
        latency_ms: 0,
        last_checked_epoch_ms: now_epoch_ms,
    }
}

fn lookup<'a>(document: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(document, |value, key| value.as_object()?.get(*key))
}

fn i32_at(document: &Value, path: &[&str]) -> Option<i32> {
    lookup(document, path)?
        .as_i64()
        .and_then(|value| i32::try_from(value).ok())
}

fn version_name(document: &Value) -> Option<String> {
    lookup(document, &["version", "name"]).and_then(primitive_text)
}

fn protocol_version(document: &Value) -> Option<i32> {
    i32_at(document, &["version", "protocol"])
}

fn favicon(document: &Value) -> Option<String> {
    document.get("favicon")?.as_str().map(str::to_string)
}

fn players_field(document: &Value, key: &str) -> Option<i32> {
    i32_at(document, &["players", key])
}

/// Sample entries are parsed independently; a bad entry is dropped and logged
fn sample_players(document: &Value) -> Vec<SamplePlayer> {
    let Some(entries) = lookup(document, &["players", "sample"]).and_then(Value::as_array) else {
        return Vec::new();
    };

    entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let player = entry.as_object().and_then(sample_player);
            if player.is_none() {
                get_debug_logger().sample_entry_dropped(index, json_kind(entry));
            }
            player
        })
        .collect()
}

/// A missing `name`/`id` becomes `""`; one that is not a primitive rejects the entry
fn sample_player(player: &Map<String, Value>) -> Option<SamplePlayer> {
    let text = |key: &str| match player.get(key) {
        None => Some(String::new()),
        Some(value) => primitive_text(value),
    };
    Some(SamplePlayer {
        name: text("name")?,
        id: text("id")?,
    })
}

/// MOTD text
///
/// Strings are taken verbatim. Objects contribute their `text` field only; an
/// object without `text` falls back to its compact JSON form.
fn description(document: &Value) -> String {
    match document.get("description") {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Object(component)) => component
            .get("text")
            .and_then(primitive_text)
            .unwrap_or_else(|| Value::Object(component.clone()).to_string()),
        _ => String::new(),
    }
}

fn mod_loader(document: &Value) -> Option<ModLoader> {
    let object = document.as_object()?;
    FORGE_KEYS
        .iter()
        .any(|key| object.contains_key(*key))
        .then_some(ModLoader::Forge)
}

/// Textual content of a JSON primitive; arrays, objects and null yield None
fn primitive_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
