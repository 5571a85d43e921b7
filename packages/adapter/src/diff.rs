//! Structural diff between a legacy document and its round-tripped
//! reconstruction.
//!
//! The diff is advisory: it never blocks a save and never fails. Known
//! benign noise is filtered before the report is finalized: translation
//! keys present on one side only, the synthetic `und` label fallback, and
//! a configurable list of bookkeeping paths.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use common::dates::truncate_to_day;
use common::json::{index_path, join_path, omit_empty};
use common::lang::UND;

#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// Index-stripped paths excluded from the report.
    pub ignored_paths: Vec<String>,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            ignored_paths: [
                // touched by every save
                "date_modified",
                // bare flags; the companion date fields carry the signal
                "removed",
                "deprecated",
                // canonical vocabulary data replaces the supplied copy
                "research_dataset.access_rights.license.identifier",
                "research_dataset.access_rights.license.title",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangedValue {
    pub old: Value,
    pub new: Value,
}

/// Path-keyed comparison result. Empty means the round trip was faithful
/// up to the filtered noise.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiffReport {
    pub added: BTreeMap<String, Value>,
    pub removed: BTreeMap<String, Value>,
    pub changed: BTreeMap<String, ChangedValue>,
}

impl DiffReport {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| json!({}))
    }

}

/// Compare a legacy document against its reconstruction.
pub fn diff(original: &Value, reconstructed: &Value, options: &DiffOptions) -> DiffReport {
    let original = normalize(original);
    let reconstructed = normalize(reconstructed);
    let mut report = DiffReport::default();
    walk(
        "",
        original.as_ref(),
        reconstructed.as_ref(),
        options,
        &mut report,
    );
    report
}

/// Normalization before comparison: empty values pruned, strings trimmed,
/// timestamps reduced to day granularity.
fn normalize(value: &Value) -> Option<Value> {
    let pruned = omit_empty(value)?;
    Some(normalize_strings(pruned))
}

fn normalize_strings(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(truncate_to_day(s.trim())),
        Value::Array(items) => {
            Value::Array(items.into_iter().map(normalize_strings).collect())
        }
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, normalize_strings(v)))
                .collect(),
        ),
        other => other,
    }
}

fn strip_indices(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut in_index = false;
    for c in path.chars() {
        match c {
            '[' => in_index = true,
            ']' => in_index = false,
            _ if !in_index => out.push(c),
            _ => {}
        }
    }
    out
}

/// A map whose keys all look like language codes.
fn is_language_map(map: &serde_json::Map<String, Value>) -> bool {
    !map.is_empty()
        && map.keys().all(|k| {
            (2..=3).contains(&k.len()) && k.chars().all(|c| c.is_ascii_lowercase())
        })
        && map.values().all(Value::is_string)
}

fn walk(path: &str, a: Option<&Value>, b: Option<&Value>, options: &DiffOptions, report: &mut DiffReport) {
    if options.ignored_paths.contains(&strip_indices(path)) {
        return;
    }
    match (a, b) {
        (None, None) => {}
        (Some(a), None) => {
            report.removed.insert(path.to_string(), a.clone());
        }
        (None, Some(b)) => {
            report.added.insert(path.to_string(), b.clone());
        }
        (Some(a), Some(b)) => match (a, b) {
            (Value::Object(ma), Value::Object(mb)) => {
                if is_language_map(ma) && is_language_map(mb) {
                    // translation keys on one side only are noise, as is
                    // the synthetic `und` fallback
                    for key in ma.keys().filter(|k| *k != UND && mb.contains_key(*k)) {
                        walk(
                            &join_path(path, key),
                            ma.get(key),
                            mb.get(key),
                            options,
                            report,
                        );
                    }
                    return;
                }
                for key in ma.keys() {
                    walk(&join_path(path, key), ma.get(key), mb.get(key), options, report);
                }
                for key in mb.keys().filter(|k| !ma.contains_key(*k)) {
                    walk(&join_path(path, key), None, mb.get(key), options, report);
                }
            }
            (Value::Array(la), Value::Array(lb)) => {
                for i in 0..la.len().max(lb.len()) {
                    walk(&index_path(path, i), la.get(i), lb.get(i), options, report);
                }
            }
            // strict comparison: "1" and 1 count as a change
            _ if a == b => {}
            _ => {
                report.changed.insert(
                    path.to_string(),
                    ChangedValue {
                        old: a.clone(),
                        new: b.clone(),
                    },
                );
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn run(a: Value, b: Value) -> DiffReport {
        diff(&a, &b, &DiffOptions::default())
    }

    #[test]
    fn test_identical_documents_produce_empty_diff() {
        let doc = json!({"a": 1, "b": {"c": ["x", "y"]}});
        assert!(run(doc.clone(), doc).is_empty());
    }

    #[test]
    fn test_extra_translations_and_und_are_noise() {
        let original = json!({"title": {"en": "Data", "und": "Data"}});
        let reconstructed = json!({"title": {"en": "Data", "fi": "Aineisto"}});
        assert!(run(original, reconstructed).is_empty());
    }

    #[test]
    fn test_shared_translation_mismatch_is_reported() {
        let original = json!({"title": {"en": "Data"}});
        let reconstructed = json!({"title": {"en": "Different"}});
        let report = run(original, reconstructed);
        assert_eq!(report.changed.len(), 1);
        assert!(report.changed.contains_key("title.en"));
    }

    #[test]
    fn test_string_and_number_count_as_changed() {
        let report = run(json!({"n": "1"}), json!({"n": 1}));
        assert_eq!(report.changed.len(), 1);
    }

    #[test]
    fn test_timestamps_compared_at_day_granularity() {
        let original = json!({"date_created": "2019-09-25T16:34:00+03:00"});
        let reconstructed = json!({"date_created": "2019-09-25T13:34:00+00:00"});
        assert!(run(original, reconstructed).is_empty());
    }

    #[test]
    fn test_empty_values_are_not_differences() {
        let original = json!({"a": 1, "b": null, "c": [], "d": {}});
        let reconstructed = json!({"a": 1});
        assert!(run(original, reconstructed).is_empty());
    }

    #[test]
    fn test_ignored_paths_skip_list_indices() {
        let original = json!({
            "research_dataset": {"access_rights": {"license": [
                {"identifier": "http://a", "license": "http://example.com/l"}
            ]}}
        });
        let reconstructed = json!({
            "research_dataset": {"access_rights": {"license": [
                {"identifier": "http://b", "license": "http://example.com/l"}
            ]}}
        });
        assert!(run(original, reconstructed).is_empty());
    }

    #[test]
    fn test_additions_and_removals_keyed_by_path() {
        let report = run(json!({"gone": "x"}), json!({"new": "y"}));
        assert_eq!(report.removed.get("gone"), Some(&json!("x")));
        assert_eq!(report.added.get("new"), Some(&json!("y")));
    }
}
