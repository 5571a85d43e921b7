//! Helpers for working with loosely-typed legacy JSON documents.

use serde_json::{Map, Value};

/// View a value as a JSON object, treating anything else as absent.
pub fn as_object(value: &Value) -> Option<&Map<String, Value>> {
    value.as_object()
}

/// Coerce a value into a list of items.
///
/// Legacy documents are inconsistent about single values vs lists
/// (e.g. `publisher` is an object while `creator` is a list), so `null`
/// and missing values become an empty list and a lone object or scalar
/// becomes a one-element list.
pub fn coerce_list(value: Option<&Value>) -> Vec<&Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(other) => vec![other],
    }
}

/// Fetch a string field from an object-like value.
pub fn get_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

/// True for values that carry no information: `null`, `""`, `{}`, `[]`.
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Recursively drop empty values from a JSON tree.
///
/// Returns `None` when the whole value collapses to nothing. Scalars are
/// kept as-is; objects and arrays are rebuilt without empty members.
pub fn omit_empty(value: &Value) -> Option<Value> {
    match value {
        Value::Object(map) => {
            let pruned: Map<String, Value> = map
                .iter()
                .filter_map(|(k, v)| omit_empty(v).map(|v| (k.clone(), v)))
                .collect();
            if pruned.is_empty() {
                None
            } else {
                Some(Value::Object(pruned))
            }
        }
        Value::Array(items) => {
            let pruned: Vec<Value> = items.iter().filter_map(omit_empty).collect();
            if pruned.is_empty() {
                None
            } else {
                Some(Value::Array(pruned))
            }
        }
        other if is_empty(other) => None,
        other => Some(other.clone()),
    }
}

/// Append a key to a dotted path: `join_path("a.b", "c")` -> `"a.b.c"`.
pub fn join_path(base: &str, key: &str) -> String {
    if base.is_empty() {
        key.to_string()
    } else {
        format!("{base}.{key}")
    }
}

/// Append a list index to a dotted path: `index_path("a", 2)` -> `"a[2]"`.
pub fn index_path(base: &str, index: usize) -> String {
    format!("{base}[{index}]")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_coerce_list_wraps_single_object() {
        let v = json!({"name": "x"});
        assert_eq!(coerce_list(Some(&v)).len(), 1);
        assert!(coerce_list(Some(&Value::Null)).is_empty());
        assert!(coerce_list(None).is_empty());

        let arr = json!([1, 2, 3]);
        assert_eq!(coerce_list(Some(&arr)).len(), 3);
    }

    #[test]
    fn test_omit_empty_prunes_recursively() {
        let v = json!({
            "keep": "value",
            "drop_null": null,
            "drop_empty": {"inner": null},
            "list": [null, "x", {}],
        });
        let pruned = omit_empty(&v).unwrap();
        assert_eq!(pruned, json!({"keep": "value", "list": ["x"]}));
    }

    #[test]
    fn test_omit_empty_collapses_to_none() {
        assert!(omit_empty(&json!({"a": {"b": []}})).is_none());
        assert!(omit_empty(&json!("")).is_none());
        // false and 0 are meaningful values, not empty
        assert_eq!(omit_empty(&json!(false)), Some(json!(false)));
        assert_eq!(omit_empty(&json!(0)), Some(json!(0)));
    }

    #[test]
    fn test_path_helpers() {
        assert_eq!(join_path("", "title"), "title");
        assert_eq!(join_path("research_dataset", "title"), "research_dataset.title");
        assert_eq!(index_path("research_dataset.creator", 0), "research_dataset.creator[0]");
    }
}
