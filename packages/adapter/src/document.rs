//! Typed access to the legacy (V1/V2) dataset document.
//!
//! Legacy documents are a single deeply nested JSON blob with
//! loosely-typed sub-objects. This module wraps the blob and parses the
//! sub-objects into typed fragments; actor unions are discriminated on
//! the `@type` field rather than duck-typed.

use serde_json::Value;
use uuid::Uuid;

use common::json::{coerce_list, get_str, index_path, join_path};

use crate::error::ConversionError;
use crate::graph::Role;

/// Scalar field renames between the legacy document and the normalized
/// dataset. Governs both mapping directions and must stay symmetric.
pub const SCALAR_RENAMES: &[(&str, &str)] = &[
    ("identifier", "id"),
    ("date_created", "created"),
    ("research_dataset.title", "title"),
    ("research_dataset.description", "description"),
    ("research_dataset.preferred_identifier", "persistent_identifier"),
    ("research_dataset.keyword", "keyword"),
    ("research_dataset.issued", "issued"),
    (
        "research_dataset.bibliographic_citation",
        "bibliographic_citation",
    ),
];

/// Wrapper around one legacy dataset JSON document.
#[derive(Debug, Clone)]
pub struct LegacyDocument {
    root: Value,
}

impl LegacyDocument {
    pub fn new(root: Value) -> Result<Self, ConversionError> {
        if !root.is_object() {
            return Err(ConversionError::malformed("", "document must be an object"));
        }
        let doc = Self { root };
        doc.identifier()?;
        Ok(doc)
    }

    /// Legacy database primary key, reused as the normalized dataset id.
    pub fn identifier(&self) -> Result<Uuid, ConversionError> {
        let raw = get_str(&self.root, "identifier")
            .ok_or_else(|| ConversionError::mapping("identifier", "value is required"))?;
        Uuid::parse_str(raw)
            .map_err(|_| ConversionError::mapping("identifier", "value is not a valid UUID"))
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.root.get(key).filter(|v| !v.is_null())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        get_str(&self.root, key)
    }

    /// The nested `research_dataset` object; absent becomes empty.
    pub fn research_dataset(&self) -> &Value {
        static EMPTY: Value = Value::Null;
        self.root.get("research_dataset").unwrap_or(&EMPTY)
    }

    pub fn rd_get(&self, key: &str) -> Option<&Value> {
        self.research_dataset().get(key).filter(|v| !v.is_null())
    }

    pub fn rd_str(&self, key: &str) -> Option<&str> {
        self.rd_get(key).and_then(Value::as_str)
    }

    /// Entries of one actor role bucket, with their dotted paths.
    ///
    /// `publisher` is a single object in the legacy schema; the other
    /// buckets are lists. Both shapes are normalized to a list here.
    pub fn role_bucket(&self, role: Role) -> Vec<(String, &Value)> {
        let key = role.legacy_key();
        let base = join_path("research_dataset", key);
        match self.rd_get(key) {
            Some(value @ Value::Object(_)) => vec![(base, value)],
            value => coerce_list(value)
                .into_iter()
                .enumerate()
                .map(|(i, v)| (index_path(&base, i), v))
                .collect(),
        }
    }

    /// List-valued research_dataset entries with their dotted paths.
    pub fn rd_list(&self, key: &str) -> Vec<(String, &Value)> {
        let base = join_path("research_dataset", key);
        coerce_list(self.rd_get(key))
            .into_iter()
            .enumerate()
            .map(|(i, v)| (index_path(&base, i), v))
            .collect()
    }
}

/// True for strings that look like an HTTP(S) URL.
pub fn is_valid_url(value: &str) -> bool {
    (value.starts_with("http://") || value.starts_with("https://"))
        && !value.contains(char::is_whitespace)
        && value.len() > 8
}

pub fn is_valid_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    }
}

/// Clean up a URL-ish identifier. Returns the cleaned value and whether
/// anything was changed.
pub fn fix_url(value: &str) -> (String, bool) {
    let trimmed = value.trim();
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return (trimmed.to_string(), false);
    }
    // Spaces inside otherwise valid URLs are common in old records
    let fixed = trimmed.replace(' ', "%20");
    let changed = fixed != value;
    (fixed, changed)
}

#[derive(Debug, Clone, PartialEq)]
pub struct HomepageFragment {
    pub url: String,
    pub title: Option<Value>,
}

impl HomepageFragment {
    /// Parse a legacy homepage object; invalid URLs yield `None`.
    pub fn parse(value: Option<&Value>) -> Option<Self> {
        let value = value?;
        let url = get_str(value, "identifier")?;
        if !is_valid_url(url) {
            return None;
        }
        Some(Self {
            url: url.to_string(),
            title: value.get("title").filter(|v| !v.is_null()).cloned(),
        })
    }
}

/// A reference-data concept reference: `identifier` + optional label.
#[derive(Debug, Clone, PartialEq)]
pub struct ConceptFragment {
    pub identifier: Option<String>,
    pub pref_label: Option<Value>,
    pub in_scheme: Option<String>,
    pub definition: Option<Value>,
}

impl ConceptFragment {
    pub fn parse(value: &Value, path: &str) -> Result<Self, ConversionError> {
        Self::parse_with_label_key(value, path, "pref_label")
    }

    /// Language concepts carry their label under `title` instead of
    /// `pref_label`.
    pub fn parse_with_label_key(
        value: &Value,
        path: &str,
        label_key: &str,
    ) -> Result<Self, ConversionError> {
        if !value.is_object() {
            return Err(ConversionError::malformed(path, "expected an object"));
        }
        Ok(Self {
            identifier: get_str(value, "identifier").map(str::to_string),
            pref_label: value.get(label_key).filter(|v| !v.is_null()).cloned(),
            in_scheme: get_str(value, "in_scheme").map(str::to_string),
            definition: value.get("definition").filter(|v| !v.is_null()).cloned(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrganizationFragment {
    pub id: Option<Uuid>,
    /// Language map under the legacy `name` key.
    pub name: Option<Value>,
    pub identifier: Option<String>,
    pub email: Option<String>,
    pub homepage: Option<HomepageFragment>,
    pub parent: Option<Box<OrganizationFragment>>,
}

impl OrganizationFragment {
    pub fn parse(value: &Value, path: &str) -> Result<Self, ConversionError> {
        if !value.is_object() {
            return Err(ConversionError::malformed(path, "expected an object"));
        }
        let parent = match value.get("is_part_of").filter(|v| !v.is_null()) {
            Some(parent) => Some(Box::new(Self::parse(
                parent,
                &join_path(path, "is_part_of"),
            )?)),
            None => None,
        };
        Ok(Self {
            id: get_str(value, "id").and_then(|s| Uuid::parse_str(s).ok()),
            name: value.get("name").filter(|v| !v.is_null()).cloned(),
            identifier: get_str(value, "identifier").map(str::to_string),
            email: get_str(value, "email").map(str::to_string),
            homepage: HomepageFragment::parse(value.get("homepage")),
            parent,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PersonFragment {
    pub id: Option<Uuid>,
    pub name: String,
    pub email: Option<String>,
    pub external_identifier: Option<String>,
    pub homepage: Option<HomepageFragment>,
    pub member_of: Option<OrganizationFragment>,
}

/// An actor union, discriminated on the legacy `@type` field.
#[derive(Debug, Clone, PartialEq)]
pub enum ActorFragment {
    Person(PersonFragment),
    Organization(OrganizationFragment),
}

impl ActorFragment {
    pub fn parse(value: &Value, path: &str) -> Result<Self, ConversionError> {
        if !value.is_object() {
            return Err(ConversionError::malformed(path, "expected an object"));
        }
        match get_str(value, "@type") {
            Some("Person") => {
                let name = get_str(value, "name")
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| {
                        ConversionError::mapping(join_path(path, "name"), "value is required")
                    })?;
                let member_of = match value.get("member_of").filter(|v| !v.is_null()) {
                    Some(org) => Some(OrganizationFragment::parse(
                        org,
                        &join_path(path, "member_of"),
                    )?),
                    None => None,
                };
                Ok(Self::Person(PersonFragment {
                    id: get_str(value, "id").and_then(|s| Uuid::parse_str(s).ok()),
                    name: name.to_string(),
                    email: get_str(value, "email").map(str::to_string),
                    external_identifier: get_str(value, "identifier").map(str::to_string),
                    homepage: HomepageFragment::parse(value.get("homepage")),
                    member_of,
                }))
            }
            Some("Organization") => Ok(Self::Organization(OrganizationFragment::parse(
                value, path,
            )?)),
            other => Err(ConversionError::mapping(
                path,
                format!("unknown or missing actor @type value: {other:?}"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LicenseFragment {
    pub identifier: Option<String>,
    pub title: Option<Value>,
    pub description: Option<Value>,
    /// The legacy `license` key holds a free-form URL.
    pub custom_url: Option<String>,
}

impl LicenseFragment {
    pub fn parse(value: &Value, path: &str) -> Result<Self, ConversionError> {
        if !value.is_object() {
            return Err(ConversionError::malformed(path, "expected an object"));
        }
        Ok(Self {
            identifier: get_str(value, "identifier").map(str::to_string),
            title: value.get("title").filter(|v| !v.is_null()).cloned(),
            description: value.get("description").filter(|v| !v.is_null()).cloned(),
            custom_url: get_str(value, "license").map(str::to_string),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemporalFragment {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub temporal_coverage: Option<String>,
}

impl TemporalFragment {
    pub fn parse(value: &Value, path: &str) -> Result<Self, ConversionError> {
        if !value.is_object() {
            return Err(ConversionError::malformed(path, "expected an object"));
        }
        Ok(Self {
            start_date: get_str(value, "start_date").map(str::to_string),
            end_date: get_str(value, "end_date").map(str::to_string),
            temporal_coverage: get_str(value, "temporal_coverage").map(str::to_string),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpatialFragment {
    pub geographic_name: Option<String>,
    pub full_address: Option<String>,
    pub altitude: Option<String>,
    pub as_wkt: Vec<String>,
    pub place_uri: Option<ConceptFragment>,
}

impl SpatialFragment {
    pub fn parse(value: &Value, path: &str) -> Result<Self, ConversionError> {
        if !value.is_object() {
            return Err(ConversionError::malformed(path, "expected an object"));
        }
        let place_uri = match value.get("place_uri").filter(|v| !v.is_null()) {
            Some(p) => Some(ConceptFragment::parse(p, &join_path(path, "place_uri"))?),
            None => None,
        };
        Ok(Self {
            geographic_name: get_str(value, "geographic_name").map(str::to_string),
            full_address: get_str(value, "full_address").map(str::to_string),
            altitude: get_str(value, "alt").map(str::to_string),
            as_wkt: coerce_list(value.get("as_wkt"))
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            place_uri,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableFragment {
    pub pref_label: Option<Value>,
    pub description: Option<Value>,
    pub representation: Option<String>,
    pub concept: Option<ConceptFragment>,
    pub universe: Option<ConceptFragment>,
}

impl VariableFragment {
    pub fn parse(value: &Value, path: &str) -> Result<Self, ConversionError> {
        if !value.is_object() {
            return Err(ConversionError::malformed(path, "expected an object"));
        }
        let concept = match value.get("concept").filter(|v| !v.is_null()) {
            Some(c) => Some(ConceptFragment::parse(c, &join_path(path, "concept"))?),
            None => None,
        };
        let universe = match value.get("universe").filter(|v| !v.is_null()) {
            Some(u) => Some(ConceptFragment::parse(u, &join_path(path, "universe"))?),
            None => None,
        };
        Ok(Self {
            pref_label: value.get("pref_label").filter(|v| !v.is_null()).cloned(),
            description: value.get("description").filter(|v| !v.is_null()).cloned(),
            representation: get_str(value, "representation").map(str::to_string),
            concept,
            universe,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProvenanceFragment {
    pub title: Option<Value>,
    pub description: Option<Value>,
    pub outcome_description: Option<Value>,
    pub event_outcome: Option<ConceptFragment>,
    pub lifecycle_event: Option<ConceptFragment>,
    pub preservation_event: Option<ConceptFragment>,
    pub temporal: Option<TemporalFragment>,
    pub spatial: Option<SpatialFragment>,
    pub variables: Vec<(String, VariableFragment)>,
    pub was_associated_with: Vec<(String, ActorFragment)>,
}

impl ProvenanceFragment {
    pub fn parse(value: &Value, path: &str) -> Result<Self, ConversionError> {
        if !value.is_object() {
            return Err(ConversionError::malformed(path, "expected an object"));
        }
        let concept = |key: &str| -> Result<Option<ConceptFragment>, ConversionError> {
            match value.get(key).filter(|v| !v.is_null()) {
                Some(c) => Ok(Some(ConceptFragment::parse(c, &join_path(path, key))?)),
                None => Ok(None),
            }
        };
        let temporal = match value.get("temporal").filter(|v| !v.is_null()) {
            Some(t) => Some(TemporalFragment::parse(t, &join_path(path, "temporal"))?),
            None => None,
        };
        let spatial = match value.get("spatial").filter(|v| !v.is_null()) {
            Some(s) => Some(SpatialFragment::parse(s, &join_path(path, "spatial"))?),
            None => None,
        };

        let mut variables = Vec::new();
        let var_base = join_path(path, "variable");
        for (i, var) in coerce_list(value.get("variable")).into_iter().enumerate() {
            let var_path = index_path(&var_base, i);
            variables.push((var_path.clone(), VariableFragment::parse(var, &var_path)?));
        }

        let mut was_associated_with = Vec::new();
        let actor_base = join_path(path, "was_associated_with");
        for (i, actor) in coerce_list(value.get("was_associated_with"))
            .into_iter()
            .enumerate()
        {
            let actor_path = index_path(&actor_base, i);
            was_associated_with.push((actor_path.clone(), ActorFragment::parse(actor, &actor_path)?));
        }

        Ok(Self {
            title: value.get("title").filter(|v| !v.is_null()).cloned(),
            description: value.get("description").filter(|v| !v.is_null()).cloned(),
            outcome_description: value
                .get("outcome_description")
                .filter(|v| !v.is_null())
                .cloned(),
            event_outcome: concept("event_outcome")?,
            lifecycle_event: concept("lifecycle_event")?,
            preservation_event: concept("preservation_event")?,
            temporal,
            spatial,
            variables,
            was_associated_with,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_actor_fragment_discriminates_on_type() {
        let person = json!({"@type": "Person", "name": "Jane Doe", "email": "jane@example.com"});
        match ActorFragment::parse(&person, "research_dataset.creator[0]").unwrap() {
            ActorFragment::Person(p) => {
                assert_eq!(p.name, "Jane Doe");
                assert_eq!(p.email.as_deref(), Some("jane@example.com"));
            }
            other => panic!("expected person, got {other:?}"),
        }

        let org = json!({"@type": "Organization", "name": {"en": "CSC"}});
        assert!(matches!(
            ActorFragment::parse(&org, "p").unwrap(),
            ActorFragment::Organization(_)
        ));
    }

    #[test]
    fn test_actor_fragment_rejects_unknown_type() {
        let bad = json!({"@type": "Robot", "name": "x"});
        let err = ActorFragment::parse(&bad, "research_dataset.creator[1]").unwrap_err();
        match err {
            ConversionError::Mapping { path, .. } => {
                assert_eq!(path, "research_dataset.creator[1]");
            }
            other => panic!("expected mapping error, got {other:?}"),
        }
    }

    #[test]
    fn test_person_without_name_is_mapping_error() {
        let bad = json!({"@type": "Person"});
        assert!(matches!(
            ActorFragment::parse(&bad, "p").unwrap_err(),
            ConversionError::Mapping { .. }
        ));
    }

    #[test]
    fn test_publisher_bucket_accepts_single_object() {
        let doc = LegacyDocument::new(json!({
            "identifier": "c955e904-e3dd-4d7e-99f1-3fed446f96d1",
            "research_dataset": {
                "publisher": {"@type": "Person", "name": "A"},
                "creator": [{"@type": "Person", "name": "B"}],
            }
        }))
        .unwrap();

        let publishers = doc.role_bucket(Role::Publisher);
        assert_eq!(publishers.len(), 1);
        assert_eq!(publishers[0].0, "research_dataset.publisher");

        let creators = doc.role_bucket(Role::Creator);
        assert_eq!(creators[0].0, "research_dataset.creator[0]");
    }

    #[test]
    fn test_document_requires_uuid_identifier() {
        assert!(LegacyDocument::new(json!({"identifier": "not-a-uuid"})).is_err());
        assert!(LegacyDocument::new(json!([])).is_err());
    }

    #[test]
    fn test_fix_url() {
        let (url, fixed) = fix_url("https://example.com/a b");
        assert_eq!(url, "https://example.com/a%20b");
        assert!(fixed);

        let (url, fixed) = fix_url("not a url");
        assert_eq!(url, "not a url");
        assert!(!fixed);
    }

    #[test]
    fn test_organization_parent_chain_parses() {
        let org = json!({
            "@type": "Organization",
            "name": {"en": "Department"},
            "is_part_of": {"name": {"en": "University"}},
        });
        let parsed = OrganizationFragment::parse(&org, "o").unwrap();
        assert!(parsed.parent.is_some());
    }
}
