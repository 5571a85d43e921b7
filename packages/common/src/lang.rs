//! Language-map helpers.
//!
//! Translated fields are JSON objects keyed by ISO 639-1 code, with `und`
//! as the synthetic fallback for untranslated labels.

use serde_json::{Map, Value};

/// Key used for labels without a known language.
pub const UND: &str = "und";

/// Preference order when collapsing a language map to one string.
const PREFERRED: [&str; 4] = ["en", "fi", "sv", UND];

/// Pick a single translation out of a language map.
///
/// Plain strings pass through; for maps, preferred languages are tried in
/// order before falling back to any present value.
pub fn single_translation(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => {
            for lang in PREFERRED {
                if let Some(Value::String(s)) = map.get(lang) {
                    return Some(s.clone());
                }
            }
            map.values().find_map(|v| v.as_str().map(str::to_string))
        }
        _ => None,
    }
}

/// Wrap a plain string into an `und`-keyed language map.
pub fn und_map(value: &str) -> Value {
    let mut map = Map::new();
    map.insert(UND.to_string(), Value::String(value.to_string()));
    Value::Object(map)
}

/// True if the value is a language map containing only the `und` fallback.
pub fn is_und_only(value: &Value) -> bool {
    match value.as_object() {
        Some(map) => map.len() == 1 && map.contains_key(UND),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_single_translation_prefers_english() {
        let map = json!({"fi": "otsikko", "en": "title"});
        assert_eq!(single_translation(&map).as_deref(), Some("title"));
        assert_eq!(single_translation(&json!({"fi": "otsikko"})).as_deref(), Some("otsikko"));
        assert_eq!(single_translation(&json!("plain")).as_deref(), Some("plain"));
        assert_eq!(single_translation(&json!(null)), None);
    }

    #[test]
    fn test_und_map_round_trip() {
        let v = und_map("catalog");
        assert!(is_und_only(&v));
        assert_eq!(single_translation(&v).as_deref(), Some("catalog"));
        assert!(!is_und_only(&json!({"en": "x", "und": "y"})));
    }
}
